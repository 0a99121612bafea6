//! One method per server operation.

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use weldr_api_models::{
    ApiResponse, ComposeRequest, ComposeStartResponse, ComposeTypesResponse, ProjectsResponse,
};

use crate::decode::{ApiOutcome, decode_json, rejected_download, save_attachment};
use crate::error::{ClientError, ClientResult};
use crate::transport::{RequestBody, Transport};

/// Archive artifacts the server can return for a finished compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeArtifact {
    /// Build metadata tarball.
    Metadata,
    /// Build log tarball.
    Logs,
    /// Metadata, logs and image in one tarball.
    Results,
    /// The output image itself.
    Image,
}

impl ComposeArtifact {
    /// Route segment under `/api/v1/compose/`.
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Logs => "logs",
            Self::Results => "results",
            Self::Image => "image",
        }
    }
}

/// Optional paging for project listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    /// Index of the first project to return.
    pub offset: Option<u64>,
    /// Maximum number of projects to return.
    pub limit: Option<u64>,
}

/// Typed client for the weldr API.
#[derive(Debug, Clone)]
pub struct WeldrClient {
    transport: Transport,
}

impl WeldrClient {
    /// Build a client on top of a transport.
    #[must_use]
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Queue a compose; `POST /api/v1/compose`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status or decode failures.
    pub async fn start_compose(
        &self,
        request: &ComposeRequest,
    ) -> ClientResult<ApiOutcome<ComposeStartResponse>> {
        let url = self.transport.route_url(&["compose"], &[])?;
        let body = RequestBody::json(url.path(), request)?;
        self.fetch_json(Method::POST, url, body).await
    }

    /// Output types the server can build; `GET /api/v1/compose/types`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status or decode failures.
    pub async fn compose_types(
        &self,
        distro: Option<&str>,
    ) -> ClientResult<ApiOutcome<ComposeTypesResponse>> {
        let query: Vec<(&str, String)> = distro
            .map(|distro| vec![("distro", distro.to_string())])
            .unwrap_or_default();
        let url = self.transport.route_url(&["compose", "types"], &query)?;
        self.fetch_json(Method::GET, url, RequestBody::Empty).await
    }

    /// All projects; `GET /api/v1/projects/list[/{distro}]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport, status or decode failures.
    pub async fn list_projects(
        &self,
        distro: Option<&str>,
        paging: Paging,
    ) -> ClientResult<ApiOutcome<ProjectsResponse>> {
        let mut query = Vec::new();
        if let Some(offset) = paging.offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(limit) = paging.limit {
            query.push(("limit", limit.to_string()));
        }
        let url = self
            .transport
            .route_url(&with_distro(&["projects", "list"], distro), &query)?;
        self.fetch_projects(url).await
    }

    /// Details for named projects; `GET /api/v1/projects/info/{names}[/{distro}]`.
    ///
    /// Unknown names are dropped as long as one name resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty name list, or a
    /// [`ClientError`] on transport, status or decode failures.
    pub async fn projects_info(
        &self,
        names: &[String],
        distro: Option<&str>,
    ) -> ClientResult<ApiOutcome<ProjectsResponse>> {
        let url = self.names_route("info", names, distro)?;
        self.fetch_projects(url).await
    }

    /// Dependency closure of named projects;
    /// `GET /api/v1/projects/depsolve/{names}[/{distro}]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty name list, or a
    /// [`ClientError`] on transport, status or decode failures.
    pub async fn depsolve_projects(
        &self,
        names: &[String],
        distro: Option<&str>,
    ) -> ClientResult<ApiOutcome<ProjectsResponse>> {
        let url = self.names_route("depsolve", names, distro)?;
        self.fetch_projects(url).await
    }

    /// Download the metadata archive of a compose into `dir`.
    ///
    /// # Errors
    ///
    /// See [`WeldrClient::download_artifact`].
    pub async fn compose_metadata(&self, id: &str, dir: &Path) -> ClientResult<PathBuf> {
        self.download_artifact(ComposeArtifact::Metadata, id, dir).await
    }

    /// Download a compose artifact into `dir`;
    /// `GET /api/v1/compose/{artifact}/{id}`.
    ///
    /// The file is named from the response's `Content-Disposition` header
    /// and replaces any existing file of that name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] or [`ClientError::UnexpectedStatus`]
    /// for non-2xx responses, [`ClientError::MissingFilename`] without a
    /// usable header, and [`ClientError::Io`] when the file cannot be saved.
    pub async fn download_artifact(
        &self,
        artifact: ComposeArtifact,
        id: &str,
        dir: &Path,
    ) -> ClientResult<PathBuf> {
        let url = self
            .transport
            .route_url(&["compose", artifact.route(), id], &[])?;
        let response = self
            .transport
            .send(Method::GET, url, RequestBody::Empty)
            .await?;
        if !response.status().is_success() {
            return Err(rejected_download(response).await);
        }
        save_attachment(response, dir).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
    ) -> ClientResult<ApiOutcome<T>> {
        let response = self.transport.send(method, url, body).await?;
        let route = response.route().to_string();
        let status = response.status();
        let bytes = response.bytes().await?;
        decode_json(&route, status, &bytes)
    }

    /// Resolved projects win over the failure flag: a 2xx body listing any
    /// project is a success even when it also carries `status: false`.
    async fn fetch_projects(&self, url: Url) -> ClientResult<ApiOutcome<ProjectsResponse>> {
        let response = self
            .transport
            .send(Method::GET, url, RequestBody::Empty)
            .await?;
        let route = response.route().to_string();
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success()
            && let Ok(resolved) = serde_json::from_slice::<ProjectsResponse>(&bytes)
            && !resolved.projects.is_empty()
        {
            return Ok(projects_outcome(&route, resolved));
        }

        Ok(match decode_json::<ProjectsResponse>(&route, status, &bytes)? {
            ApiOutcome::Success(resolved) => projects_outcome(&route, resolved),
            ApiOutcome::PartialFailure(failure) => ApiOutcome::PartialFailure(failure),
        })
    }

    fn names_route(&self, verb: &str, names: &[String], distro: Option<&str>) -> ClientResult<Url> {
        if names.is_empty() {
            return Err(ClientError::InvalidRequest {
                reason: "at least one project name is required",
            });
        }
        let joined = names.join(",");
        self.transport
            .route_url(&with_distro(&["projects", verb, joined.as_str()], distro), &[])
    }
}

fn with_distro<'a>(segments: &[&'a str], distro: Option<&'a str>) -> Vec<&'a str> {
    let mut segments = segments.to_vec();
    if let Some(distro) = distro {
        segments.push(distro);
    }
    segments
}

/// Keep the resolved subset; fail only when nothing resolved.
fn projects_outcome(route: &str, response: ProjectsResponse) -> ApiOutcome<ProjectsResponse> {
    if response.projects.is_empty() && !response.errors.is_empty() {
        return ApiOutcome::PartialFailure(ApiResponse::failed(response.errors));
    }
    for error in &response.errors {
        debug!(route, id = %error.id, msg = %error.msg, "ignoring unresolved project");
    }
    ApiOutcome::Success(response)
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::{Value, json};
    use weldr_api_models::OstreeOptions;

    use crate::profile::UploadProfile;

    const BUILD_ID: &str = "876b2946-16cd-4f38-bace-0cdd0093d112";
    const COMPOSE_ID: &str = "b27c5a7b-d1f6-4c8c-8526-6d6de464f1c7";

    fn client_for(server: &MockServer) -> Result<WeldrClient> {
        let base = server
            .base_url()
            .parse()
            .map_err(|_| anyhow!("valid URL"))?;
        Ok(WeldrClient::new(Transport::new(Client::new(), base)))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn start_compose_posts_exact_body() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/compose")
                .header("content-type", "application/json")
                .body(r#"{"blueprint_name":"http-server","compose_type":"qcow2","branch":"master","size":998}"#);
            then.status(200)
                .json_body(json!({"build_id": BUILD_ID, "status": true}));
        });

        let client = client_for(&server)?;
        let outcome = client
            .start_compose(&ComposeRequest::new("http-server", "qcow2", 998))
            .await?;

        mock.assert();
        let started = outcome.success().ok_or_else(|| anyhow!("expected success"))?;
        assert_eq!(started.build_id, BUILD_ID);
        Ok(())
    }

    #[tokio::test]
    async fn start_compose_embeds_ostree_and_upload() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/compose").body(
                r#"{"blueprint_name":"http-server","compose_type":"qcow2","branch":"master","size":0,"ostree":{"ref":"refid","parent":"parentid","url":""},"upload":{"provider":"aws","image_name":"httpimage","settings":{"aws_bucket":"AWS Bucket","aws_region":"AWS Region"}}}"#,
            );
            then.status(200)
                .json_body(json!({"build_id": BUILD_ID, "status": true}));
        });

        let profile: UploadProfile = toml::from_str(
            "provider = \"aws\"\n[settings]\naws_bucket = \"AWS Bucket\"\naws_region = \"AWS Region\"\n",
        )?;
        let request = ComposeRequest::new("http-server", "qcow2", 0)
            .with_ostree(OstreeOptions {
                reference: "refid".into(),
                parent: "parentid".into(),
                url: String::new(),
            })
            .with_upload(profile.into_upload("httpimage"));

        let outcome = client_for(&server)?.start_compose(&request).await?;
        mock.assert();
        assert!(outcome.partial_failure().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn start_compose_reports_unknown_blueprint_as_partial_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/compose");
            then.status(400).json_body(json!({
                "status": false,
                "errors": [{"id": "UnknownBlueprint", "msg": "Unknown blueprint name: nope"}]
            }));
        });

        let outcome = client_for(&server)?
            .start_compose(&ComposeRequest::new("nope", "qcow2", 0))
            .await?;
        let failure = outcome
            .partial_failure()
            .ok_or_else(|| anyhow!("expected partial failure"))?;
        assert_eq!(failure.error_text(), "Unknown blueprint name: nope");
        Ok(())
    }

    #[tokio::test]
    async fn server_error_without_document_is_hard_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/compose");
            then.status(502).body("bad gateway");
        });

        let err = client_for(&server)?
            .start_compose(&ComposeRequest::new("bp", "qcow2", 0))
            .await
            .expect_err("hard error");
        assert!(matches!(err, ClientError::UnexpectedStatus { ref body, .. } if body == "bad gateway"));
        Ok(())
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() -> Result<()> {
        let base: Url = "http://127.0.0.1:9".parse()?;
        let client = WeldrClient::new(Transport::new(Client::new(), base));
        let err = client
            .compose_types(None)
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, ClientError::Transport { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn compose_types_passes_distro_query() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/compose/types")
                .query_param("distro", "fedora-41");
            then.status(200).json_body(json!({
                "types": [{"name": "ami", "enabled": true}, {"name": "vhd", "enabled": false}]
            }));
        });

        let types = client_for(&server)?
            .compose_types(Some("fedora-41"))
            .await?
            .success()
            .ok_or_else(|| anyhow!("expected success"))?;
        mock.assert();
        assert_eq!(types.types.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn list_projects_uses_distro_segment_and_paging() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/projects/list/centos-9")
                .query_param("offset", "0")
                .query_param("limit", "2");
            then.status(200).json_body(json!({
                "projects": [{"name": "bash"}, {"name": "tmux"}],
                "offset": 0,
                "limit": 2,
                "total": 9000
            }));
        });

        let listing = client_for(&server)?
            .list_projects(
                Some("centos-9"),
                Paging {
                    offset: Some(0),
                    limit: Some(2),
                },
            )
            .await?
            .success()
            .ok_or_else(|| anyhow!("expected success"))?;
        mock.assert();
        assert_eq!(listing.projects.len(), 2);
        assert_eq!(listing.total, Some(9000));
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_keeps_known_subset() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/projects/info/bash,filesystem,bart");
            then.status(200).json_body(json!({
                "projects": [{"name": "bash"}, {"name": "filesystem"}]
            }));
        });

        let outcome = client_for(&server)?
            .projects_info(&names(&["bash", "filesystem", "bart"]), None)
            .await?;
        mock.assert();
        assert!(outcome.partial_failure().is_none());
        let info = outcome.success().ok_or_else(|| anyhow!("expected success"))?;
        assert_eq!(info.projects.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_ignores_errors_listed_beside_results() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/info/bash,bart/fedora-41");
            then.status(200).json_body(json!({
                "projects": [{"name": "bash"}],
                "errors": [{"id": "UnknownProject", "msg": "bart not found"}]
            }));
        });

        let info = client_for(&server)?
            .projects_info(&names(&["bash", "bart"]), Some("fedora-41"))
            .await?
            .success()
            .ok_or_else(|| anyhow!("expected success"))?;
        assert_eq!(info.projects, vec![json!({"name": "bash"})]);
        assert_eq!(info.errors.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_keeps_subset_when_status_is_false() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/info/bash,bart");
            then.status(200).json_body(json!({
                "status": false,
                "projects": [{"name": "bash"}],
                "errors": [{"id": "UnknownProject", "msg": "bart not found"}]
            }));
        });

        let outcome = client_for(&server)?
            .projects_info(&names(&["bash", "bart"]), None)
            .await?;
        assert!(outcome.partial_failure().is_none());
        let info = outcome.success().ok_or_else(|| anyhow!("expected success"))?;
        assert_eq!(info.projects, vec![json!({"name": "bash"})]);
        assert_eq!(info.errors[0].msg, "bart not found");
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_all_unknown_with_success_status_is_partial_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/info/bart");
            then.status(200).json_body(json!({
                "status": false,
                "projects": [],
                "errors": [{"id": "UnknownProject", "msg": "bart not found"}]
            }));
        });

        let outcome = client_for(&server)?
            .projects_info(&names(&["bart"]), None)
            .await?;
        let failure = outcome
            .partial_failure()
            .ok_or_else(|| anyhow!("expected partial failure"))?;
        assert_eq!(failure.error_text(), "bart not found");
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_all_unknown_is_partial_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/info/bart");
            then.status(400).json_body(json!({
                "status": false,
                "errors": [{"id": "UnknownProject", "msg": "No packages have been found."}]
            }));
        });

        let outcome = client_for(&server)?
            .projects_info(&names(&["bart"]), None)
            .await?;
        let failure = outcome
            .partial_failure()
            .ok_or_else(|| anyhow!("expected partial failure"))?;
        assert!(!failure.status);
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].id, "UnknownProject");
        assert_eq!(failure.errors[0].msg, "No packages have been found.");
        assert!(outcome.success().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn projects_info_requires_names() -> Result<()> {
        let server = MockServer::start_async().await;
        let err = client_for(&server)?
            .projects_info(&[], None)
            .await
            .expect_err("no names");
        assert!(matches!(err, ClientError::InvalidRequest { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn depsolve_returns_dependency_documents() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/depsolve/bash");
            then.status(200).json_body(json!({
                "projects": [
                    {"name": "bash", "epoch": 0, "version": "5.2", "release": "1.fc41", "arch": "x86_64"},
                    {"name": "filesystem", "epoch": 0, "version": "3.18", "release": "2.fc41", "arch": "x86_64"}
                ]
            }));
        });

        let deps = client_for(&server)?
            .depsolve_projects(&names(&["bash"]), None)
            .await?
            .success()
            .ok_or_else(|| anyhow!("expected success"))?;
        let found: Vec<&str> = deps
            .projects
            .iter()
            .filter_map(|dep| dep.get("name").and_then(Value::as_str))
            .collect();
        assert!(found.contains(&"bash"));
        assert!(found.contains(&"filesystem"));
        Ok(())
    }

    #[tokio::test]
    async fn metadata_download_writes_named_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let path = format!("/api/v1/compose/metadata/{COMPOSE_ID}");
        let mock = server.mock(move |when, then| {
            when.method(GET).path(path.as_str());
            then.status(200)
                .header(
                    "Content-Disposition",
                    format!("attachment; filename={COMPOSE_ID}-metadata.tar"),
                )
                .header("Content-Type", "application/x-tar")
                .body("tar bytes");
        });

        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(format!("{COMPOSE_ID}-metadata.tar")), "stale")?;
        let saved = client_for(&server)?
            .compose_metadata(COMPOSE_ID, dir.path())
            .await?;

        mock.assert_hits(1);
        assert_eq!(saved, dir.path().join(format!("{COMPOSE_ID}-metadata.tar")));
        assert_eq!(std::fs::read_to_string(&saved)?, "tar bytes");
        Ok(())
    }

    #[tokio::test]
    async fn download_without_disposition_is_hard_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(format!("/api/v1/compose/logs/{COMPOSE_ID}"));
            then.status(200).body("tar bytes");
        });

        let dir = tempfile::tempdir()?;
        let err = client_for(&server)?
            .download_artifact(ComposeArtifact::Logs, COMPOSE_ID, dir.path())
            .await
            .expect_err("header required");
        assert!(matches!(err, ClientError::MissingFilename { .. }));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn download_of_unknown_compose_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(format!("/api/v1/compose/metadata/{COMPOSE_ID}"));
            then.status(400).json_body(json!({
                "status": false,
                "errors": [{"id": "UnknownUUID", "msg": format!("{COMPOSE_ID} is not a valid build uuid")}]
            }));
        });

        let dir = tempfile::tempdir()?;
        let err = client_for(&server)?
            .compose_metadata(COMPOSE_ID, dir.path())
            .await
            .expect_err("unknown compose");
        assert!(
            matches!(err, ClientError::Rejected { ref message, .. } if message.contains("not a valid build uuid"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn truncated_download_removes_partial_file() -> Result<()> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await?;
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      Content-Type: application/x-tar\r\n\
                      Content-Disposition: attachment; filename=partial-metadata.tar\r\n\
                      Content-Length: 100\r\n\r\n\
                      0123456789",
                )
                .await?;
            socket.flush().await?;
            Ok::<_, std::io::Error>(())
        });

        let base: Url = format!("http://{addr}").parse()?;
        let client = WeldrClient::new(Transport::new(Client::new(), base));
        let dir = tempfile::tempdir()?;
        let err = client
            .compose_metadata(COMPOSE_ID, dir.path())
            .await
            .expect_err("body ends before Content-Length");

        server.await??;
        assert!(matches!(err, ClientError::Transport { .. }));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn download_into_missing_directory_is_io_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(format!("/api/v1/compose/image/{COMPOSE_ID}"));
            then.status(200)
                .header("Content-Disposition", "attachment; filename=disk.qcow2")
                .body("image");
        });

        let dir = tempfile::tempdir()?;
        let err = client_for(&server)?
            .download_artifact(ComposeArtifact::Image, COMPOSE_ID, &dir.path().join("gone"))
            .await
            .expect_err("directory does not exist");
        assert!(matches!(err, ClientError::Io { operation: "create", .. }));
        Ok(())
    }
}
