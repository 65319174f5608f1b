use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    novelscope::logging::init().context("init logging")?;

    let cli = novelscope::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        novelscope::cli::Command::Scrape(args) => {
            novelscope::scrape::run(args).await.context("scrape")?;
        }
        novelscope::cli::Command::Clean(args) => {
            novelscope::clean::run(args).context("clean")?;
        }
        novelscope::cli::Command::Analyze(args) => {
            novelscope::analyze::run(args).context("analyze")?;
        }
        novelscope::cli::Command::Store(args) => {
            novelscope::store::run(args).await.context("store")?;
        }
        novelscope::cli::Command::Run(args) => {
            novelscope::pipeline::run(args).await.context("run")?;
        }
    }

    Ok(())
}
