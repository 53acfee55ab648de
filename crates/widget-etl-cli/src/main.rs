//! widget-etl - batch ETL for widget activity feeds

mod cli;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command};
use commands::run::RunOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(path) = &cli.db_path {
        config.db_path = path.clone();
    }

    match &cli.command {
        Command::Run {
            data_path,
            skip_quality,
            snapshots,
            staging_dir,
            resume,
            after,
        } => {
            let options = RunOptions {
                data_path: commands::data_path(data_path.as_ref(), &config.data_path),
                skip_quality: *skip_quality,
                snapshots: *snapshots,
                staging_dir: staging_dir.clone(),
                resume: resume.clone().zip(*after),
            };
            commands::run::run(&cli, &config, options)
        }

        Command::Validate { data_path } => commands::validate::run(
            &cli,
            &commands::data_path(data_path.as_ref(), &config.data_path),
        ),

        Command::TopUsers { data_path } => commands::top_users::run(
            &cli,
            &commands::data_path(data_path.as_ref(), &config.data_path),
        ),

        Command::Index { data_path } => commands::index::run(
            &cli,
            &commands::data_path(data_path.as_ref(), &config.data_path),
        ),

        Command::Status => commands::status::run(&cli, &config.db_path),
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}
