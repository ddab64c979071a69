use crate::cli::SignInArgs;
use crate::client::{AppContext, CliError, CliResult, classify_dashboard, resolve_password};
use crate::output::render_identity;

pub(crate) async fn handle_sign_in(ctx: &AppContext, args: SignInArgs) -> CliResult<()> {
    let session = ctx.dashboard.session();
    let signed_in = match (args.provider, args.provider_token) {
        (Some(provider), Some(token)) => session.sign_in_with_provider(&provider, &token).await,
        (Some(_), None) => {
            return Err(CliError::validation(
                "provider token is required (pass --provider-token or set GMA_PROVIDER_TOKEN)",
            ));
        }
        (None, _) => {
            let email = ctx.require_email()?;
            let password = resolve_password(ctx.credentials.password.as_deref())?;
            session.sign_in(email, &password).await
        }
    };
    let identity = signed_in.map_err(|err| classify_dashboard(&err))?;
    // Profile sync may have rotated the refresh credential since sign-in returned.
    let current = session.identity().unwrap_or(identity);
    render_identity(&current, session.profile().as_ref(), ctx.format)
}

pub(crate) async fn handle_sign_up(ctx: &AppContext) -> CliResult<()> {
    let session = ctx.dashboard.session();
    let email = ctx.require_email()?;
    let password = resolve_password(ctx.credentials.password.as_deref())?;
    let identity = session
        .sign_up(email, &password)
        .await
        .map_err(|err| classify_dashboard(&err))?;
    let current = session.identity().unwrap_or(identity);
    render_identity(&current, session.profile().as_ref(), ctx.format)
}
