use clap::Parser;
use ops_agent_cli::{Cli, run};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ops-agent failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
