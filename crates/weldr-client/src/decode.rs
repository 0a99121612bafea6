//! Response decoding: JSON payloads, partial failures and attachments.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use weldr_api_models::ApiResponse;

use crate::error::{ClientError, ClientResult};
use crate::transport::RawResponse;

/// Decoded result of a request the server accepted at the transport level.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    /// The server returned the expected payload.
    Success(T),
    /// The server processed the request but reported per-item failures.
    PartialFailure(ApiResponse),
}

impl<T> ApiOutcome<T> {
    /// The success payload, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::PartialFailure(_) => None,
        }
    }

    /// The partial-failure document, if any.
    pub const fn partial_failure(&self) -> Option<&ApiResponse> {
        match self {
            Self::Success(_) => None,
            Self::PartialFailure(response) => Some(response),
        }
    }
}

/// Decode a JSON body into `T` or a partial-failure document.
///
/// A 2xx body carrying `{"status": false, ...}` is a partial failure as well.
/// A non-2xx body that is not a failed [`ApiResponse`] is a hard error.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when a 2xx body does not match `T` and
/// [`ClientError::UnexpectedStatus`] for undecodable error statuses.
pub fn decode_json<T: DeserializeOwned>(
    route: &str,
    status: StatusCode,
    body: &[u8],
) -> ClientResult<ApiOutcome<T>> {
    if let Some(failure) = failed_response(body) {
        debug!(route, %status, errors = failure.errors.len(), "server reported failure");
        return Ok(ApiOutcome::PartialFailure(failure));
    }

    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            route: route.to_string(),
            status,
            body: String::from_utf8_lossy(body).trim().to_string(),
        });
    }

    serde_json::from_slice::<T>(body)
        .map(ApiOutcome::Success)
        .map_err(|source| ClientError::Decode {
            route: route.to_string(),
            source,
        })
}

fn failed_response(body: &[u8]) -> Option<ApiResponse> {
    serde_json::from_slice::<ApiResponse>(body)
        .ok()
        .filter(ApiResponse::is_failure)
}

/// Turn a non-2xx download response into a hard error.
///
/// The server's messages are kept when the body is an [`ApiResponse`].
pub(crate) async fn rejected_download(response: RawResponse) -> ClientError {
    let route = response.route().to_string();
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return err,
    };
    match failed_response(&body) {
        Some(failure) => ClientError::Rejected {
            route,
            status,
            message: failure.error_text(),
        },
        None => ClientError::UnexpectedStatus {
            route,
            status,
            body: String::from_utf8_lossy(&body).trim().to_string(),
        },
    }
}

/// Extract the filename from an `attachment; filename=<name>` header.
///
/// Quotes are stripped and only the final path component is kept, so the
/// result always names a file directly inside the target directory.
#[must_use]
pub fn attachment_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let raw = value.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| value.trim().trim_matches('"'))
    })?;

    let name = Path::new(raw).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Stream an attachment response into `dir`, overwriting any existing file.
///
/// The partially written file is removed when streaming fails.
///
/// # Errors
///
/// Returns [`ClientError::MissingFilename`] when the header is absent,
/// [`ClientError::Io`] on filesystem failures and
/// [`ClientError::Transport`] if the body stream breaks.
pub async fn save_attachment(response: RawResponse, dir: &Path) -> ClientResult<PathBuf> {
    let route = response.route().to_string();
    let filename = attachment_filename(response.headers())
        .ok_or_else(|| ClientError::MissingFilename {
            route: route.clone(),
        })?;
    let path = dir.join(filename);

    let mut file = File::create(&path)
        .await
        .map_err(|source| ClientError::Io {
            operation: "create",
            path: path.clone(),
            source,
        })?;

    if let Err(err) = stream_body(response, &mut file, &route, &path).await {
        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %cleanup, "failed to remove partial download");
        }
        return Err(err);
    }

    debug!(path = %path.display(), "attachment saved");
    Ok(path)
}

async fn stream_body(
    response: RawResponse,
    file: &mut File,
    route: &str,
    path: &Path,
) -> ClientResult<()> {
    let io_error = |operation: &'static str| {
        move |source: std::io::Error| ClientError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    };

    let mut stream = response.into_inner().bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| ClientError::Transport {
            route: route.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_error("write"))?;
    }
    file.flush().await.map_err(io_error("flush"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use weldr_api_models::ComposeStartResponse;

    fn headers_with(disposition: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_str(disposition).expect("header value"),
        );
        headers
    }

    #[test]
    fn decode_success_payload() {
        let body = br#"{"build_id": "876b2946-16cd-4f38-bace-0cdd0093d112", "status": true}"#;
        let outcome =
            decode_json::<ComposeStartResponse>("/api/v1/compose", StatusCode::OK, body)
                .expect("decode");
        let started = outcome.success().expect("success");
        assert_eq!(started.build_id, "876b2946-16cd-4f38-bace-0cdd0093d112");
    }

    #[test]
    fn decode_error_status_with_api_response_is_partial_failure() {
        let body = json!({
            "status": false,
            "errors": [{"id": "UnknownBlueprint", "msg": "Unknown blueprint name: nope"}]
        })
        .to_string();
        let outcome = decode_json::<ComposeStartResponse>(
            "/api/v1/compose",
            StatusCode::BAD_REQUEST,
            body.as_bytes(),
        )
        .expect("partial failure is not a hard error");
        let failure = outcome.partial_failure().expect("partial failure");
        assert!(!failure.status);
        assert_eq!(failure.errors[0].id, "UnknownBlueprint");
    }

    #[test]
    fn decode_success_status_with_failed_document_is_partial_failure() {
        let body = json!({"status": false, "errors": [{"id": "X", "msg": "m"}]}).to_string();
        let outcome =
            decode_json::<ComposeStartResponse>("/api/v1/compose", StatusCode::OK, body.as_bytes())
                .expect("decode");
        assert!(outcome.partial_failure().is_some());
    }

    #[test]
    fn decode_malformed_success_body_is_hard_error() {
        let err = decode_json::<ComposeStartResponse>("/api/v1/compose", StatusCode::OK, b"{oops")
            .expect_err("malformed JSON");
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn decode_type_mismatch_is_hard_error() {
        let err = decode_json::<ComposeStartResponse>(
            "/api/v1/compose",
            StatusCode::OK,
            br#"{"build_id": 7}"#,
        )
        .expect_err("type mismatch");
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn decode_undecodable_error_status_is_hard_error() {
        let err = decode_json::<ComposeStartResponse>(
            "/api/v1/compose",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"<html>oops</html>\n",
        )
        .expect_err("hard error");
        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: StatusCode::INTERNAL_SERVER_ERROR, ref body, .. }
                if body == "<html>oops</html>"
        ));
    }

    #[test]
    fn attachment_filename_parses_plain_and_quoted_values() {
        assert_eq!(
            attachment_filename(&headers_with(
                "attachment; filename=b27c5a7b-d1f6-4c8c-8526-6d6de464f1c7-metadata.tar"
            ))
            .as_deref(),
            Some("b27c5a7b-d1f6-4c8c-8526-6d6de464f1c7-metadata.tar")
        );
        assert_eq!(
            attachment_filename(&headers_with("attachment; FileName=\"logs.tar\"")).as_deref(),
            Some("logs.tar")
        );
    }

    #[test]
    fn attachment_filename_strips_directories() {
        assert_eq!(
            attachment_filename(&headers_with("attachment; filename=../../etc/passwd")).as_deref(),
            Some("passwd")
        );
        assert_eq!(
            attachment_filename(&headers_with("attachment; filename=..")),
            None
        );
    }

    #[test]
    fn attachment_filename_requires_header() {
        assert_eq!(attachment_filename(&HeaderMap::new()), None);
        assert_eq!(attachment_filename(&headers_with("attachment")), None);
    }
}
