//! Error types for the weldr client.
//!
//! Every variant is a hard failure. Per-item failures reported by the server
//! are not errors; they travel as [`crate::ApiOutcome::PartialFailure`].

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Hard failures raised while talking to the API server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL cannot carry a path.
    #[error("base URL '{url}' cannot be used for API routes")]
    InvalidBaseUrl {
        /// Offending base URL.
        url: String,
    },
    /// The caller supplied arguments no request can be built from.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the arguments.
        reason: &'static str,
    },
    /// Connection, TLS, timeout or body read failure.
    #[error("request to {route} failed")]
    Transport {
        /// Route that was being requested.
        route: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
    /// A response body did not match the expected shape.
    #[error("failed to decode response from {route}")]
    Decode {
        /// Route whose response failed to decode.
        route: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Non-2xx status without a partial-failure document.
    #[error("{route} returned {status}{}", format_body(.body))]
    UnexpectedStatus {
        /// Route that failed.
        route: String,
        /// Status the server answered with.
        status: StatusCode,
        /// Trimmed response body, possibly empty.
        body: String,
    },
    /// Non-2xx status on an endpoint where a partial failure is fatal.
    #[error("{route} returned {status}: {message}")]
    Rejected {
        /// Route that failed.
        route: String,
        /// Status the server answered with.
        status: StatusCode,
        /// Server error messages joined with newlines.
        message: String,
    },
    /// An archive response carried no usable `Content-Disposition` filename.
    #[error("response from {route} has no attachment filename")]
    MissingFilename {
        /// Route that produced the response.
        route: String,
    },
    /// The upload profile could not be read.
    #[error("failed to read upload profile {}", .path.display())]
    ProfileRead {
        /// Profile path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The upload profile is not valid TOML or lacks required keys.
    #[error("failed to parse upload profile {}", .path.display())]
    ProfileParse {
        /// Profile path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// The upload profile parsed but its contents are unusable.
    #[error("invalid upload profile {}: {reason}", .path.display())]
    ProfileInvalid {
        /// Profile path.
        path: PathBuf,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Local filesystem failure while saving a download.
    #[error("failed to {operation} {}", .path.display())]
    Io {
        /// Operation that failed (`create`, `write`, ...).
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}
