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
    skedcal::logging::init().context("init logging")?;

    let cli = skedcal::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        skedcal::cli::Command::Convert(args) => {
            skedcal::convert::run(args).await.context("convert")?;
        }
        skedcal::cli::Command::Inspect(args) => {
            skedcal::inspect::run(args).await.context("inspect")?;
        }
    }

    Ok(())
}
