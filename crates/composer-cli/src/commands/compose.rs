use std::path::Path;

use weldr_api_models::{ComposeRequest, OstreeOptions};
use weldr_client::{ComposeArtifact, UploadProfile};

use crate::cli::{ComposeDownloadArgs, ComposeStartArgs, ComposeStartOstreeArgs, ComposeTypesArgs};
use crate::client::{AppContext, CliError, CliResult, expect_success};
use crate::output::{compose_queued, compose_type_lines, render};

pub(crate) async fn handle_compose_start(ctx: &AppContext, args: ComposeStartArgs) -> CliResult<()> {
    let request = build_compose_request(&args)?;
    submit_compose(ctx, &request).await
}

pub(crate) async fn handle_compose_start_ostree(
    ctx: &AppContext,
    args: ComposeStartOstreeArgs,
) -> CliResult<()> {
    let reference = args
        .reference
        .ok_or_else(|| CliError::validation("--ref is required"))?;
    let ostree = OstreeOptions {
        reference,
        parent: args.parent.unwrap_or_default(),
        url: args.url.unwrap_or_default(),
    };
    let request = build_compose_request(&args.start)?.with_ostree(ostree);
    submit_compose(ctx, &request).await
}

pub(crate) async fn handle_compose_types(ctx: &AppContext, args: ComposeTypesArgs) -> CliResult<()> {
    let outcome = ctx.client.compose_types(args.distro.as_deref()).await?;
    let types = expect_success(outcome, ctx.output)?;
    render(&types, || compose_type_lines(&types), ctx.output)
}

/// Save a compose artifact into the download directory; prints nothing.
pub(crate) async fn handle_compose_download(
    ctx: &AppContext,
    artifact: ComposeArtifact,
    args: ComposeDownloadArgs,
) -> CliResult<()> {
    let id = args.id.to_string();
    ctx.client
        .download_artifact(artifact, &id, &ctx.download_dir)
        .await?;
    Ok(())
}

async fn submit_compose(ctx: &AppContext, request: &ComposeRequest) -> CliResult<()> {
    let outcome = ctx.client.start_compose(request).await?;
    let started = expect_success(outcome, ctx.output)?;
    render(
        &started,
        || vec![compose_queued(&started.build_id)],
        ctx.output,
    )
}

/// `BLUEPRINT TYPE` or `BLUEPRINT TYPE IMAGE-NAME PROFILE.TOML`.
fn build_compose_request(args: &ComposeStartArgs) -> CliResult<ComposeRequest> {
    match args.args.as_slice() {
        [blueprint, compose_type] => Ok(ComposeRequest::new(blueprint, compose_type, args.size)),
        [blueprint, compose_type, image_name, profile] => {
            let upload = UploadProfile::from_file(Path::new(profile))?.into_upload(image_name);
            Ok(ComposeRequest::new(blueprint, compose_type, args.size).with_upload(upload))
        }
        _ => Err(CliError::validation("Invalid number of arguments")),
    }
}
