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
#![allow(clippy::redundant_pub_crate, clippy::module_name_repetitions)]
//! HTTP client for the weldr image-build API.
//!
//! Layout:
//! - `transport`: one request per call, URL building under `/api/v1`.
//! - `decode`: JSON payloads, partial-failure documents and attachments.
//! - `client`: typed operations (`compose`, `projects`).
//! - `profile`: upload profiles embedded in compose requests.

mod client;
mod decode;
mod error;
mod profile;
mod transport;

pub use client::{ComposeArtifact, Paging, WeldrClient};
pub use decode::{ApiOutcome, attachment_filename, decode_json, save_attachment};
pub use error::{ClientError, ClientResult};
pub use profile::UploadProfile;
pub use transport::{API_PREFIX, RawResponse, RequestBody, Transport};
