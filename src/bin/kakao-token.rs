use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use kakao_memo::cli::init_tracing;
use kakao_memo::config::DEFAULT_STORE_PATH;
use kakao_memo::report::token_report;
use kakao_memo::{
    Config, KakaoEndpoints, KakaoError, LocalServer, LocalServerConfig, OAuthClient,
    OAuthClientConfig, TokenRecord, TokenStore, refresh_stored_tokens,
};

#[derive(Debug, Parser)]
#[command(
    name = "kakao-token",
    about = "Sign in with Kakao in the browser and save the access token to the env file."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    common: CommonArgs,

    /// Redirect URI registered for the Kakao app; the local server listens on it.
    #[arg(long, default_value = KakaoEndpoints::default_redirect_uri())]
    redirect_uri: String,

    /// Print the login URL without opening a browser.
    #[arg(long)]
    no_browser: bool,

    /// Give up if no successful callback arrives within this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Renew the access token with the stored refresh token.
    Refresh,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Token store holding KAKAO_REST_API_KEY and the issued tokens.
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    env_file: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);

    let result = match cli.command {
        Some(Command::Refresh) => run_refresh(&cli.common.env_file).await,
        None => run_login(&cli).await,
    };

    let report = token_report(&result, &cli.common.env_file);
    if report.is_success() {
        println!("{}", report.text);
    } else {
        eprintln!("{}", report.text);
    }
    ExitCode::from(report.exit_code)
}

async fn run_login(cli: &Cli) -> Result<TokenRecord, KakaoError> {
    let config = Config::load(&cli.common.env_file)?;
    let client_config = OAuthClientConfig::from_config(&config, cli.redirect_uri.as_str())?;
    let client = OAuthClient::new(client_config)?;

    let mut server_config = LocalServerConfig::from_redirect_uri(&cli.redirect_uri)?;
    if let Some(secs) = cli.timeout_secs {
        server_config = server_config.with_timeout(Duration::from_secs(secs));
    }
    let server = LocalServer::new(server_config);
    let listener = server.bind().await?;

    let login_url = server.config().login_url();
    println!("Open this URL in your browser to sign in with Kakao:\n  {login_url}");
    if !cli.no_browser {
        if let Err(err) = webbrowser::open(&login_url) {
            eprintln!("Failed to open browser automatically: {err}");
        }
    }
    println!("Waiting for authorization...");

    server
        .run(listener, client, TokenStore::new(&cli.common.env_file))
        .await
}

async fn run_refresh(env_file: &Path) -> Result<TokenRecord, KakaoError> {
    let config = Config::load(env_file)?;
    refresh_stored_tokens(&config).await
}
