//! Shared client construction, error types and outcome handling for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;
use weldr_api_models::ApiResponse;
use weldr_client::{ApiOutcome, ClientError, Transport, WeldrClient};

use crate::cli::Cli;
use crate::output::OutputFormat;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type separating the three failure tiers.
#[derive(Debug)]
pub(crate) enum CliError {
    /// Bad arguments; detected before any request is sent.
    Validation(String),
    /// The server processed the request but reported per-item failures.
    PartialFailure(ApiResponse),
    /// Transport, protocol or filesystem failure.
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::PartialFailure(_) => 1,
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::PartialFailure(response) => response.error_text(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::InvalidRequest { reason } => Self::validation(reason),
            other => Self::failure(other),
        }
    }
}

/// Dependencies constructed from CLI options and environment fallbacks.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
}

impl CliDependencies {
    /// Construct the HTTP client shared by every request of this process.
    pub(crate) fn from_cli(cli: &Cli, request_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(request_id).map_err(|_| {
            CliError::failure(anyhow!("request identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(secs) = cli.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self { client })
    }
}

/// Application context passed to command handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub(crate) client: WeldrClient,
    pub(crate) output: OutputFormat,
    pub(crate) download_dir: PathBuf,
}

impl AppContext {
    pub(crate) fn new(
        deps: &CliDependencies,
        base_url: Url,
        output: OutputFormat,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            client: WeldrClient::new(Transport::new(deps.client.clone(), base_url)),
            output,
            download_dir,
        }
    }
}

/// Parse the server URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Unwrap a success payload or surface the server's per-item failures.
///
/// In JSON mode the failure document is echoed on stdout before the error
/// is returned.
pub(crate) fn expect_success<T>(outcome: ApiOutcome<T>, output: OutputFormat) -> CliResult<T> {
    match outcome {
        ApiOutcome::Success(value) => Ok(value),
        ApiOutcome::PartialFailure(response) => {
            if output == OutputFormat::Json {
                crate::output::print_json(&response)?;
            }
            Err(CliError::PartialFailure(response))
        }
    }
}
