use gma_dashboard::Screen;

use crate::cli::ProfileSetArgs;
use crate::client::{AppContext, CliResult, classify_dashboard};
use crate::output::render_profile;

pub(crate) async fn handle_show(ctx: &mut AppContext) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::Profile);
    let profile = ctx
        .dashboard
        .session()
        .refresh_profile()
        .await
        .map_err(|err| classify_dashboard(&err))?;
    render_profile(profile.as_ref(), ctx.format)
}

pub(crate) async fn handle_set(ctx: &mut AppContext, args: ProfileSetArgs) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::Profile);
    let profile = ctx
        .dashboard
        .session()
        .update_profile(Some(args.name))
        .await
        .map_err(|err| classify_dashboard(&err))?;
    render_profile(Some(&profile), ctx.format)
}
