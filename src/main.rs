use clap::Parser;
use controller_examples::cli::Cli;
use controller_examples::config::Settings;
use controller_examples::generate_examples;
use controller_examples::generator::render;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the examples document, so logs go to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::new()?;
    let examples = generate_examples(&settings).await?;

    render::write_examples(&examples, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        info!(path = %path.display(), count = examples.len(), "examples written");
    }
    Ok(())
}
