use clap::{Parser, Subcommand};
use tracing::debug;

use crate::dispatch::DispatchArgs;

mod dataset;
mod dispatch;
mod file_utils;
mod parsers;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Builds the candidate routes of one or more datasets
    #[command(visible_alias = "d")]
    Dispatch {
        #[command(flatten)]
        args: DispatchArgs,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Dispatch { args }) => dispatch::run(args)?,
        None => debug!("No command given"),
    }

    Ok(())
}
