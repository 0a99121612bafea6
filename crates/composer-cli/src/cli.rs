//! Argument parsing and command dispatch.

use std::env;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use url::Url;
use uuid::Uuid;
use weldr_client::ComposeArtifact;
use weldr_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};

use crate::client::{AppContext, CliDependencies, CliError, CliResult, parse_url};
use crate::commands::compose::{
    handle_compose_download, handle_compose_start, handle_compose_start_ostree,
    handle_compose_types,
};
use crate::commands::projects::{handle_projects_depsolve, handle_projects_info, handle_projects_list};
use crate::output::OutputFormat;

const DEFAULT_API_URL: &str = "http://localhost:4000";

/// Parses CLI arguments, executes the requested command and reports
/// failures on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("error: {err:#}");
        return CliError::failure(err).exit_code();
    }

    let request_id = Uuid::new_v4().to_string();
    let result = match CliDependencies::from_cli(&cli, &request_id) {
        Ok(deps) => dispatch(cli, &deps).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            tracing::debug!(command = command_name, request_id = %request_id, "command finished");
            0
        }
        Err(err) => {
            tracing::debug!(command = command_name, request_id = %request_id, "command failed");
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let download_dir = env::current_dir().map_err(|err| {
        CliError::failure(anyhow!("failed to resolve the working directory: {err}"))
    })?;
    let ctx = AppContext::new(
        deps,
        cli.api_url,
        OutputFormat::from_json_flag(cli.json),
        download_dir,
    );

    match cli.command {
        Command::Compose(compose) => match compose {
            ComposeCommand::Start(args) => handle_compose_start(&ctx, args).await,
            ComposeCommand::StartOstree(args) => handle_compose_start_ostree(&ctx, args).await,
            ComposeCommand::Types(args) => handle_compose_types(&ctx, args).await,
            ComposeCommand::Metadata(args) => {
                handle_compose_download(&ctx, ComposeArtifact::Metadata, args).await
            }
            ComposeCommand::Logs(args) => {
                handle_compose_download(&ctx, ComposeArtifact::Logs, args).await
            }
            ComposeCommand::Results(args) => {
                handle_compose_download(&ctx, ComposeArtifact::Results, args).await
            }
            ComposeCommand::Image(args) => {
                handle_compose_download(&ctx, ComposeArtifact::Image, args).await
            }
        },
        Command::Projects(projects) => match projects {
            ProjectsCommand::List(args) => handle_projects_list(&ctx, args).await,
            ProjectsCommand::Info(args) => handle_projects_info(&ctx, args).await,
            ProjectsCommand::Depsolve(args) => handle_projects_depsolve(&ctx, args).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "composer-cli",
    about = "Command-line client for the image-build API server"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "COMPOSER_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL,
        help = "Base URL of the API server"
    )]
    pub(crate) api_url: Url,
    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Print the server's JSON payloads instead of text"
    )]
    pub(crate) json: bool,
    #[arg(
        long,
        global = true,
        env = "COMPOSER_HTTP_TIMEOUT_SECS",
        help = "Request timeout in seconds (no timeout when unset)"
    )]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        env = "COMPOSER_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log filter; RUST_LOG takes precedence"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        default_value = "pretty",
        help = "Log output format: pretty or json"
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    LogFormat::from_name(input).ok_or_else(|| format!("unknown log format '{input}'"))
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start composes and fetch their artifacts.
    #[command(subcommand)]
    Compose(ComposeCommand),
    /// Query the package projects available to the server.
    #[command(subcommand)]
    Projects(ProjectsCommand),
}

#[derive(Subcommand)]
pub(crate) enum ComposeCommand {
    /// Start a compose using the selected blueprint and output type.
    Start(ComposeStartArgs),
    /// Start an ostree compose using the selected blueprint and output type.
    StartOstree(ComposeStartOstreeArgs),
    /// List the output types the server can build.
    Types(ComposeTypesArgs),
    /// Download the metadata tarball of a compose.
    Metadata(ComposeDownloadArgs),
    /// Download the log tarball of a compose.
    Logs(ComposeDownloadArgs),
    /// Download metadata, logs and image of a compose as one tarball.
    Results(ComposeDownloadArgs),
    /// Download the output image of a compose.
    Image(ComposeDownloadArgs),
}

#[derive(Subcommand)]
pub(crate) enum ProjectsCommand {
    /// List all available projects.
    List(ProjectsListArgs),
    /// Show details about named projects.
    Info(ProjectsNamesArgs),
    /// Resolve the dependencies of named projects.
    Depsolve(ProjectsNamesArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ComposeStartArgs {
    /// BLUEPRINT TYPE [IMAGE-NAME PROFILE.TOML]
    #[arg(value_name = "ARGS")]
    pub(crate) args: Vec<String>,
    /// Size of the image in MiB; 0 uses the server default.
    #[arg(long, default_value_t = 0)]
    pub(crate) size: u64,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ComposeStartOstreeArgs {
    #[command(flatten)]
    pub(crate) start: ComposeStartArgs,
    /// Ostree reference to build; required.
    #[arg(long = "ref")]
    pub(crate) reference: Option<String>,
    /// Parent commit of the reference.
    #[arg(long)]
    pub(crate) parent: Option<String>,
    /// URL of the repository holding the parent commit.
    #[arg(long)]
    pub(crate) url: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ComposeTypesArgs {
    /// Distribution to query instead of the server default.
    #[arg(long)]
    pub(crate) distro: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ComposeDownloadArgs {
    /// Compose identifier.
    #[arg(value_name = "COMPOSE-ID")]
    pub(crate) id: Uuid,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ProjectsListArgs {
    /// Distribution to query instead of the server default.
    #[arg(long)]
    pub(crate) distro: Option<String>,
    /// Index of the first project to list.
    #[arg(long)]
    pub(crate) offset: Option<u64>,
    /// Maximum number of projects to list.
    #[arg(long)]
    pub(crate) limit: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ProjectsNamesArgs {
    /// Project names.
    #[arg(value_name = "PROJECT", required = true)]
    pub(crate) names: Vec<String>,
    /// Distribution to query instead of the server default.
    #[arg(long)]
    pub(crate) distro: Option<String>,
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Compose(compose) => match compose {
            ComposeCommand::Start(_) => "compose_start",
            ComposeCommand::StartOstree(_) => "compose_start_ostree",
            ComposeCommand::Types(_) => "compose_types",
            ComposeCommand::Metadata(_) => "compose_metadata",
            ComposeCommand::Logs(_) => "compose_logs",
            ComposeCommand::Results(_) => "compose_results",
            ComposeCommand::Image(_) => "compose_image",
        },
        Command::Projects(projects) => match projects {
            ProjectsCommand::List(_) => "projects_list",
            ProjectsCommand::Info(_) => "projects_info",
            ProjectsCommand::Depsolve(_) => "projects_depsolve",
        },
    }
}
