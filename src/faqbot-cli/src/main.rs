use anyhow::Result;
use clap::Parser;
use faqbot_cli::cli::{Cli, dispatch_command};
use faqbot_cli::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_level, cli.json_logs)?;

    dispatch_command(cli).await
}
