#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]
//! Wire DTOs for the weldr image-build API.
//!
//! The CLI and the client library share these types so request bodies and
//! response decoding agree on one contract. Field order on the request types
//! is the order the server documents, and the serializers rely on it.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Branch every compose request is built from.
pub const DEFAULT_BRANCH: &str = "master";

/// Partial-failure document returned by the server for multi-item requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse {
    /// `false` when at least one sub-item failed.
    pub status: bool,
    /// Per-item failures, in the order the server reported them.
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// One per-item failure inside an [`ApiResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    /// Machine-readable error kind such as `UnknownProject`.
    pub id: String,
    /// Human-readable message.
    pub msg: String,
}

impl ApiResponse {
    /// Build a failed response carrying the given errors.
    #[must_use]
    pub const fn failed(errors: Vec<ApiError>) -> Self {
        Self {
            status: false,
            errors,
        }
    }

    /// True when `status` is false or any error is listed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.status || !self.errors.is_empty()
    }

    /// All error messages, in server order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.msg.as_str()).collect()
    }

    /// Error messages joined with newlines, as shown to the user.
    #[must_use]
    pub fn error_text(&self) -> String {
        self.messages().join("\n")
    }
}

/// Body of `POST /api/v1/compose`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeRequest {
    /// Blueprint to build.
    pub blueprint_name: String,
    /// Output image type, e.g. `qcow2`.
    pub compose_type: String,
    /// Always [`DEFAULT_BRANCH`].
    pub branch: String,
    /// Image size in MiB; `0` lets the server pick.
    pub size: u64,
    /// Ostree parameters, present only for ostree composes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ostree: Option<OstreeOptions>,
    /// Upload target, present only when an upload profile was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadSection>,
}

impl ComposeRequest {
    /// Plain compose request without ostree or upload sections.
    #[must_use]
    pub fn new(blueprint_name: impl Into<String>, compose_type: impl Into<String>, size: u64) -> Self {
        Self {
            blueprint_name: blueprint_name.into(),
            compose_type: compose_type.into(),
            branch: DEFAULT_BRANCH.to_string(),
            size,
            ostree: None,
            upload: None,
        }
    }

    /// Attach the ostree section.
    #[must_use]
    pub fn with_ostree(mut self, ostree: OstreeOptions) -> Self {
        self.ostree = Some(ostree);
        self
    }

    /// Attach the upload section.
    #[must_use]
    pub fn with_upload(mut self, upload: UploadSection) -> Self {
        self.upload = Some(upload);
        self
    }
}

/// Ostree parameters of a compose.
///
/// All three fields are serialized even when empty; the server expects the
/// complete object once ostree mode is selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OstreeOptions {
    /// Ref to commit to.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Parent commit id.
    pub parent: String,
    /// URL of the repository to pull the parent from.
    pub url: String,
}

/// Upload target embedded in a compose request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSection {
    /// Upload provider name, e.g. `aws`.
    pub provider: String,
    /// Name of the image at the provider.
    pub image_name: String,
    /// Provider-specific settings, passed through untouched.
    pub settings: Map<String, Value>,
}

/// Response to a successful compose start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeStartResponse {
    /// UUID of the queued compose.
    pub build_id: String,
    /// Server status flag.
    #[serde(default)]
    pub status: bool,
}

/// Response of `GET /api/v1/compose/types`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeTypesResponse {
    /// Known output types.
    #[serde(default)]
    pub types: Vec<ComposeType>,
}

/// One output type supported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeType {
    /// Type name, e.g. `qcow2`.
    pub name: String,
    /// Whether the server can currently build it.
    pub enabled: bool,
}

/// Response of the `projects/*` endpoints.
///
/// Project documents are kept as raw JSON; the client only looks at `name`
/// and a handful of display fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectsResponse {
    /// Resolved projects or dependencies.
    #[serde(default)]
    pub projects: Vec<Value>,
    /// Paging offset, when the endpoint pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Paging limit, when the endpoint pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Total number of projects available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Items the server could not resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiError>,
}
