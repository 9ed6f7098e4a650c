use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kakao_memo::cli::init_tracing;
use kakao_memo::config::DEFAULT_STORE_PATH;
use kakao_memo::report::send_report;
use kakao_memo::{Config, KakaoError, SendResult, send_memo};

#[derive(Debug, Parser)]
#[command(
    name = "kakao-send",
    about = "Send a KakaoTalk memo to yourself from a file, piped stdin, or a test message."
)]
struct Cli {
    /// File whose contents are sent. Without it, piped stdin is used.
    file: Option<PathBuf>,

    /// Token store holding KAKAO_ACCESS_TOKEN.
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    env_file: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let report = send_report(&run(&cli).await);
    if report.is_success() {
        println!("{}", report.text);
    } else {
        eprintln!("{}", report.text);
    }
    ExitCode::from(report.exit_code)
}

async fn run(cli: &Cli) -> Result<SendResult, KakaoError> {
    let config = Config::load(&cli.env_file)?;
    let stdin = io::stdin();
    let stdin_is_terminal = stdin.is_terminal();

    println!("Sending message...");
    send_memo(&config, cli.file.as_deref(), stdin_is_terminal, stdin.lock()).await
}
