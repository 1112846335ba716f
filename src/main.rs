mod cli;
mod error;
mod fetch;
mod logging;
mod pipeline;
mod update;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use crate::fetch::Fetcher;
use clap::Parser;
use exn::ResultExt;
use marquee_config::Config;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            if err.is_retryable() {
                tracing::info!("This failure may be transient; running the command again could succeed");
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let fetcher = Fetcher::new()?;
    match cli.command {
        Command::Build(args) => {
            let published = pipeline::build(&config, &args, &fetcher).await?;
            println!(
                "{} {} {}",
                published.manifest.version,
                published.manifest.database.hash,
                published.manifest_path.display()
            );
        },
        Command::Check(args) => {
            let decision = update::check(&config, &args, &fetcher).await?;
            println!("{decision}");
        },
        Command::Update(args) => match update::update(&config, &args, &fetcher).await? {
            update::Outcome::UpToDate => println!("up to date"),
            update::Outcome::Updated { decision, version, report } => {
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
                println!("updated to {version} ({decision})");
            },
        },
    }
    Ok(())
}
