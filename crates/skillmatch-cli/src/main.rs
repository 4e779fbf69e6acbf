use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use skillmatch_core::app::{execute, Outcome};
use skillmatch_core::config::LOG_ENV;
use skillmatch_core::store::Catalogue;
use skillmatch_core::{EngineBuilder, EngineConfig, Response};

mod cli;
mod demo;
mod output;
mod serve;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("skillmatch error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = cli::Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = &cli.store {
        config.store.path = path.clone();
    }
    init_tracing(&config.log.level, cli.quiet, cli.verbose)?;

    match &cli.command {
        cli::Commands::Init(args) => {
            let seed = if args.demo {
                demo::catalogue(chrono::Utc::now()).context("failed to build demo catalogue")?
            } else {
                Catalogue::new()
            };
            let engine = EngineBuilder::from_config(&config)
                .seed(seed)
                .overwrite(args.force)
                .build()
                .await
                .context("failed to initialize store")?;
            let counts = engine.status().await?;
            let message = format!(
                "Store initialized at {} ({} resources, {} pending tasks)",
                engine.store().describe(),
                counts.resources,
                counts.pending
            );
            output::emit(&Response::Outcome(Outcome::ok(message)), cli.compact)
        }
        cli::Commands::Serve => {
            let engine = EngineBuilder::from_config(&config)
                .build()
                .await
                .context("failed to open store")?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            serve::run(&engine, stdin, tokio::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
        other => {
            let command = other
                .to_command()
                .context("subcommand has no engine counterpart")?;
            let engine = EngineBuilder::from_config(&config)
                .build()
                .await
                .context("failed to open store")?;
            let response = execute(&engine, &command).await;
            output::emit(&response, cli.compact)
        }
    }
}

fn init_tracing(default_level: &str, quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        default_level
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
