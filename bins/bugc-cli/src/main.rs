//! bugc cli
mod command;
mod handlers;
mod utils;

use anyhow::Result;
use clap::Parser;
use command::{Cli, Commands};
use handlers::{build_command, check_command};
use utils::init_logger;

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build_command(&args)?,
        Commands::Check(args) => check_command(&args)?,
    }

    Ok(())
}
