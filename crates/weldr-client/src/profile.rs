//! Upload profiles: TOML files naming a provider and its settings.
//!
//! ```toml
//! provider = "aws"
//!
//! [settings]
//! aws_bucket = "images"
//! aws_region = "us-east-1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use weldr_api_models::UploadSection;

use crate::error::{ClientError, ClientResult};

/// Parsed upload profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadProfile {
    /// Provider name; required.
    pub provider: String,
    /// Provider settings, embedded verbatim in the compose request.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl UploadProfile {
    /// Read and parse a profile file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ProfileRead`] if the file cannot be read,
    /// [`ClientError::ProfileParse`] for invalid TOML or a missing
    /// `provider`, and [`ClientError::ProfileInvalid`] for an empty provider.
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ClientError::ProfileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path.to_path_buf(), &text)
    }

    fn parse(path: PathBuf, text: &str) -> ClientResult<Self> {
        let profile: Self = match toml::from_str(text) {
            Ok(profile) => profile,
            Err(source) => return Err(ClientError::ProfileParse { path, source }),
        };
        if profile.provider.trim().is_empty() {
            return Err(ClientError::ProfileInvalid {
                path,
                reason: "provider must not be empty",
            });
        }
        Ok(profile)
    }

    /// Build the compose request's upload section for `image_name`.
    #[must_use]
    pub fn into_upload(self, image_name: impl Into<String>) -> UploadSection {
        UploadSection {
            provider: self.provider,
            image_name: image_name.into(),
            settings: self.settings,
        }
    }
}
