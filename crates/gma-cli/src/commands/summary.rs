use anyhow::anyhow;
use gma_dashboard::{Screen, dashboard_totals, status_counts};

use crate::client::{AppContext, CliError, CliResult, FULL_LISTING, classify_dashboard};
use crate::output::render_summary;

/// Landing-screen totals: tests run, outcome buckets and video counts.
pub(crate) async fn handle_summary(ctx: &mut AppContext) -> CliResult<()> {
    ctx.connect().await?;
    ctx.dashboard.router_mut().navigate(Screen::Dashboard);
    let history = ctx.dashboard.history().await;
    if let Some(notice) = history.notice {
        return Err(CliError::failure(anyhow!(notice.message())));
    }
    let totals = dashboard_totals(&history.tests);
    ctx.dashboard
        .refresh_videos(FULL_LISTING)
        .await
        .map_err(|err| classify_dashboard(&err))?;
    let counts = status_counts(ctx.dashboard.selection().videos());
    render_summary(&totals, &counts, ctx.format)
}
