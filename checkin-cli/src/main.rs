//! `checkin`: run, inspect and move phased check-ins from the terminal.

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use logging::LogTarget;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match &cli.command {
        Command::Run(args) => match &args.log_file {
            Some(path) => LogTarget::File(path),
            None => LogTarget::Discard,
        },
        _ => LogTarget::Stderr,
    };
    logging::init(cli.global.verbose, target)?;

    match cli.command {
        Command::Run(args) => commands::run(&cli.global, args),
        Command::Stats(args) => commands::stats(&cli.global, args),
        Command::Switch(args) => commands::switch(&cli.global, args),
        Command::Export(args) => commands::export(&cli.global, args),
        Command::Import(args) => commands::import(&cli.global, args),
        Command::Validate(args) => commands::validate(&cli.global, args),
        Command::Reset(args) => commands::reset(&cli.global, args),
    }
}
