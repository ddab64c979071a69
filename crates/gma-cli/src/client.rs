//! Shared context, session establishment and error types for the CLI.

use std::env;
use std::fmt::{self, Display, Formatter};
use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::anyhow;
use gma_client::{ApiClient, ClientError, FirebaseIdentity, Page};
use gma_config::DashboardConfig;
use gma_dashboard::{Dashboard, DashboardError, Notice, VideoSelection};
use tracing::debug;
use url::Url;

use crate::cli::{GlobalArgs, OutputFormat};

/// Listing window used when a command needs to resolve ids against the
/// caller's videos.
pub(crate) const FULL_LISTING: Page = Page {
    skip: 0,
    limit: 1000,
};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
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
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
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

/// Map a dashboard error onto the CLI taxonomy using its user-facing notice.
///
/// Local problems and rejected credentials are the caller's to fix (exit 2);
/// everything else is an operational failure (exit 3).
pub(crate) fn classify_dashboard(err: &DashboardError) -> CliError {
    let message = Notice::from_error(err).message();
    if err.is_local() || matches!(err, DashboardError::SignInFailed { .. }) {
        CliError::validation(message)
    } else {
        CliError::failure(anyhow!(message))
    }
}

/// Map a direct client error for `operation` the same way.
pub(crate) fn classify_client(operation: &'static str, err: ClientError) -> CliError {
    classify_dashboard(&DashboardError::network(operation, err))
}

/// Load configuration, letting command-line values shadow the environment.
pub(crate) fn load_config(args: &GlobalArgs) -> CliResult<DashboardConfig> {
    let api_url = args.api_url.as_ref().map(Url::to_string);
    let timeout = args.timeout.map(|secs| secs.to_string());
    let api_key = args.api_key.clone();
    DashboardConfig::from_lookup(|name| match name {
        "GMA_API_URL" => api_url.clone(),
        "GMA_HTTP_TIMEOUT_SECS" => timeout.clone(),
        "GMA_IDENTITY_API_KEY" => api_key.clone(),
        other => env::var(other).ok(),
    })
    .map_err(|err| CliError::validation(format!("invalid configuration: {err}")))
}

/// Credentials supplied on the command line or through the environment.
#[derive(Clone, Default)]
pub(crate) struct Credentials {
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) refresh_token: Option<String>,
}

impl Credentials {
    pub(crate) fn from_args(args: &GlobalArgs) -> Self {
        let non_blank = |value: &Option<String>| {
            value
                .as_ref()
                .filter(|value| !value.trim().is_empty())
                .cloned()
        };
        Self {
            email: non_blank(&args.email),
            password: args.password.clone(),
            refresh_token: non_blank(&args.refresh_token),
        }
    }
}

/// Everything a command handler needs.
pub(crate) struct AppContext {
    pub(crate) api: ApiClient,
    pub(crate) dashboard: Dashboard,
    pub(crate) credentials: Credentials,
    pub(crate) format: OutputFormat,
}

impl AppContext {
    pub(crate) fn new(
        config: &DashboardConfig,
        credentials: Credentials,
        format: OutputFormat,
    ) -> CliResult<Self> {
        let api = ApiClient::from_config(config)
            .map_err(|err| CliError::failure(anyhow!("failed to build API client: {err}")))?;
        let identity = FirebaseIdentity::from_config(config).map_err(|err| match err {
            ClientError::Config { .. } => CliError::validation(
                "identity API key is required (pass --api-key or set GMA_IDENTITY_API_KEY)",
            ),
            other => CliError::failure(anyhow!("failed to build identity client: {other}")),
        })?;
        let dashboard = Dashboard::new(Arc::new(identity), Arc::new(api.clone()), config.upload);
        Ok(Self {
            api,
            dashboard,
            credentials,
            format,
        })
    }

    /// Establish a session from the stored refresh credential, falling back
    /// to email and password sign-in.
    pub(crate) async fn connect(&self) -> CliResult<()> {
        let session = self.dashboard.session();
        if let Some(refresh_token) = self.credentials.refresh_token.as_deref() {
            debug!("resuming session from refresh credential");
            session
                .resume(refresh_token)
                .await
                .map_err(|err| classify_dashboard(&err))?;
            return Ok(());
        }
        let Some(email) = self.credentials.email.as_deref() else {
            session.restore(None);
            return Err(CliError::validation(
                "sign-in required (set GMA_REFRESH_TOKEN, or GMA_EMAIL and GMA_PASSWORD)",
            ));
        };
        let password = resolve_password(self.credentials.password.as_deref())?;
        session
            .sign_in(email, &password)
            .await
            .map_err(|err| classify_dashboard(&err))?;
        Ok(())
    }

    pub(crate) fn require_email(&self) -> CliResult<&str> {
        self.credentials
            .email
            .as_deref()
            .ok_or_else(|| CliError::validation("email is required (pass --email or set GMA_EMAIL)"))
    }
}

/// Return the supplied password, prompting on a terminal when absent.
pub(crate) fn resolve_password(supplied: Option<&str>) -> CliResult<String> {
    if let Some(password) = supplied.filter(|value| !value.is_empty()) {
        return Ok(password.to_string());
    }
    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password("Password: ")
            .map_err(|err| CliError::failure(anyhow!("failed to read password: {err}")))?;
        if password.is_empty() {
            return Err(CliError::validation("password must not be empty"));
        }
        return Ok(password);
    }
    Err(CliError::validation(
        "password is required (pass --password or set GMA_PASSWORD)",
    ))
}

/// Select `ids` in the current listing.
///
/// Every id is checked before anything is selected.
pub(crate) fn select_ids(selection: &mut VideoSelection, ids: &[i64]) -> CliResult<()> {
    if let Some(missing) = ids
        .iter()
        .find(|id| !selection.videos().iter().any(|video| video.id == **id))
    {
        return Err(CliError::validation(format!("video {missing} not found")));
    }
    for &id in ids {
        if !selection.is_selected(id) {
            selection.toggle(id);
        }
    }
    Ok(())
}
