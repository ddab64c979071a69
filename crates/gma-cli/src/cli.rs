//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gma_api_models::TestType;
use gma_config::DashboardConfig;
use gma_dashboard::SortKey;
use gma_telemetry::{
    GlobalContextGuard, LoggingConfig, build_sha, init_logging, with_command_context,
};
use url::Url;

use crate::client::{AppContext, CliError, CliResult, Credentials, load_config};
use crate::commands::{auth, blind_test, profile, summary, videos};

const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Entrypoint used by the binary; returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command = command_label(&cli.command);

    let config = match load_config(&cli.global) {
        Ok(config) => config,
        Err(err) => return report(&err),
    };
    if let Err(err) = init_logging(&LoggingConfig {
        level: &config.log_level,
        format: config.log_format,
        build_sha: build_sha(),
    }) {
        eprintln!("warning: logging disabled: {err}");
    }
    let _context = GlobalContextGuard::new(command);

    match with_command_context(command, execute(cli, &config)).await {
        Ok(()) => 0,
        Err(err) => report(&err),
    }
}

fn report(err: &CliError) -> i32 {
    eprintln!("error: {}", err.display_message());
    err.exit_code()
}

async fn execute(cli: Cli, config: &DashboardConfig) -> CliResult<()> {
    let credentials = Credentials::from_args(&cli.global);
    let mut ctx = AppContext::new(config, credentials, cli.global.output)?;
    dispatch(&mut ctx, cli.command).await
}

pub(crate) async fn dispatch(ctx: &mut AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::Signin(args) => auth::handle_sign_in(ctx, args).await,
        Command::Signup => auth::handle_sign_up(ctx).await,
        Command::Summary => summary::handle_summary(ctx).await,
        Command::Videos(videos) => match videos {
            VideosCommand::Ls(args) => videos::handle_list(ctx, args).await,
            VideosCommand::Upload(args) => videos::handle_upload(ctx, args).await,
            VideosCommand::Rm(args) => videos::handle_remove(ctx, args).await,
            VideosCommand::Rename(args) => videos::handle_rename(ctx, args).await,
            VideosCommand::Download(args) => videos::handle_download(ctx, args).await,
        },
        Command::Test(test) => match test {
            TestCommand::Run(args) => blind_test::handle_run(ctx, args).await,
            TestCommand::Instant(args) => blind_test::handle_instant(ctx, args).await,
            TestCommand::History => blind_test::handle_history(ctx).await,
            TestCommand::Show(args) => blind_test::handle_show(ctx, args).await,
        },
        Command::Profile(command) => match command {
            ProfileCommand::Show => profile::handle_show(ctx).await,
            ProfileCommand::Set(args) => profile::handle_set(ctx, args).await,
        },
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Signin(_) => "signin",
        Command::Signup => "signup",
        Command::Summary => "summary",
        Command::Videos(VideosCommand::Ls(_)) => "videos ls",
        Command::Videos(VideosCommand::Upload(_)) => "videos upload",
        Command::Videos(VideosCommand::Rm(_)) => "videos rm",
        Command::Videos(VideosCommand::Rename(_)) => "videos rename",
        Command::Videos(VideosCommand::Download(_)) => "videos download",
        Command::Test(TestCommand::Run(_)) => "test run",
        Command::Test(TestCommand::Instant(_)) => "test instant",
        Command::Test(TestCommand::History) => "test history",
        Command::Test(TestCommand::Show(_)) => "test show",
        Command::Profile(ProfileCommand::Show) => "profile show",
        Command::Profile(ProfileCommand::Set(_)) => "profile set",
    }
}

#[derive(Parser)]
#[command(
    name = "gma",
    about = "Console for the GMA video classification service"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Connection, credential and output options shared by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    #[arg(long, global = true, env = "GMA_API_URL", value_parser = parse_url)]
    pub(crate) api_url: Option<Url>,
    #[arg(long, global = true, env = "GMA_HTTP_TIMEOUT_SECS")]
    pub(crate) timeout: Option<u64>,
    #[arg(long, global = true, env = "GMA_IDENTITY_API_KEY", hide_env_values = true)]
    pub(crate) api_key: Option<String>,
    #[arg(long, global = true, env = "GMA_EMAIL")]
    pub(crate) email: Option<String>,
    #[arg(long, global = true, env = "GMA_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
    #[arg(
        long,
        global = true,
        env = "GMA_REFRESH_TOKEN",
        hide_env_values = true,
        help = "Resume a session printed by `gma signin` instead of signing in again"
    )]
    pub(crate) refresh_token: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sign in and print a refresh credential for later commands.
    Signin(SignInArgs),
    /// Create an account with the configured email and password.
    Signup,
    /// Show test totals and video counts.
    Summary,
    #[command(subcommand)]
    Videos(VideosCommand),
    #[command(subcommand)]
    Test(TestCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand)]
pub(crate) enum VideosCommand {
    /// List uploaded videos.
    Ls(VideoListArgs),
    /// Upload local video files.
    Upload(UploadArgs),
    /// Delete videos by id.
    Rm(VideoRemoveArgs),
    /// Rename a stored video.
    Rename(VideoRenameArgs),
    /// Download a stored video.
    Download(VideoDownloadArgs),
}

#[derive(Subcommand)]
pub(crate) enum TestCommand {
    /// Submit stored videos for a blind test.
    Run(TestRunArgs),
    /// Upload files and run an instant test over them.
    Instant(UploadArgs),
    /// List previous tests.
    History,
    /// Show the results of one test.
    Show(TestShowArgs),
}

#[derive(Subcommand)]
pub(crate) enum ProfileCommand {
    /// Show the backend profile.
    Show,
    /// Update the display name.
    Set(ProfileSetArgs),
}

#[derive(Args, Default)]
pub(crate) struct SignInArgs {
    /// Federated provider id, for example `google.com`.
    #[arg(long, requires = "provider_token")]
    pub(crate) provider: Option<String>,
    /// Provider-issued ID token.
    #[arg(long, env = "GMA_PROVIDER_TOKEN", hide_env_values = true)]
    pub(crate) provider_token: Option<String>,
}

#[derive(Args)]
pub(crate) struct VideoListArgs {
    #[arg(long, default_value_t = 0)]
    pub(crate) skip: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    pub(crate) limit: u32,
    #[arg(long, default_value = "name", value_parser = parse_sort_key)]
    pub(crate) sort: SortKey,
    /// Case-insensitive filter on the file name.
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    #[arg(required = true)]
    pub(crate) files: Vec<PathBuf>,
    /// Retry failed transfers up to this many times.
    #[arg(long, default_value_t = 0)]
    pub(crate) retries: u8,
}

#[derive(Args)]
pub(crate) struct VideoRemoveArgs {
    #[arg(required = true)]
    pub(crate) ids: Vec<i64>,
}

#[derive(Args)]
pub(crate) struct VideoRenameArgs {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Args)]
pub(crate) struct VideoDownloadArgs {
    pub(crate) id: i64,
    /// Target file or directory.
    #[arg(long = "to", default_value = ".")]
    pub(crate) destination: PathBuf,
}

#[derive(Args)]
pub(crate) struct TestRunArgs {
    #[arg(long = "type", value_enum, default_value_t = TestKind::Full)]
    pub(crate) kind: TestKind,
    /// Submit every listed video.
    #[arg(long, conflicts_with = "ids")]
    pub(crate) all: bool,
    #[arg(required_unless_present = "all")]
    pub(crate) ids: Vec<i64>,
}

#[derive(Args)]
pub(crate) struct TestShowArgs {
    pub(crate) id: i64,
}

#[derive(Args)]
pub(crate) struct ProfileSetArgs {
    /// New display name; blank clears it.
    #[arg(long)]
    pub(crate) name: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum TestKind {
    Full,
    Instant,
}

impl From<TestKind> for TestType {
    fn from(kind: TestKind) -> Self {
        match kind {
            TestKind::Full => Self::Full,
            TestKind::Instant => Self::Instant,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_url(input: &str) -> Result<Url, String> {
    Url::parse(input).map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_sort_key(input: &str) -> Result<SortKey, String> {
    input
        .parse()
        .map_err(|_| format!("unknown sort key '{input}' (expected name or size)"))
}
