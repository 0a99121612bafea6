use weldr_client::Paging;

use crate::cli::{ProjectsListArgs, ProjectsNamesArgs};
use crate::client::{AppContext, CliResult, expect_success};
use crate::output::{dependency_lines, project_info_lines, project_name_lines, render};

pub(crate) async fn handle_projects_list(ctx: &AppContext, args: ProjectsListArgs) -> CliResult<()> {
    let paging = Paging {
        offset: args.offset,
        limit: args.limit,
    };
    let outcome = ctx
        .client
        .list_projects(args.distro.as_deref(), paging)
        .await?;
    let listing = expect_success(outcome, ctx.output)?;
    render(
        &listing,
        || project_name_lines(&listing.projects),
        ctx.output,
    )
}

pub(crate) async fn handle_projects_info(ctx: &AppContext, args: ProjectsNamesArgs) -> CliResult<()> {
    let outcome = ctx
        .client
        .projects_info(&args.names, args.distro.as_deref())
        .await?;
    let info = expect_success(outcome, ctx.output)?;
    render(&info, || project_info_lines(&info.projects), ctx.output)
}

pub(crate) async fn handle_projects_depsolve(
    ctx: &AppContext,
    args: ProjectsNamesArgs,
) -> CliResult<()> {
    let outcome = ctx
        .client
        .depsolve_projects(&args.names, args.distro.as_deref())
        .await?;
    let dependencies = expect_success(outcome, ctx.output)?;
    render(
        &dependencies,
        || dependency_lines(&dependencies.projects),
        ctx.output,
    )
}
