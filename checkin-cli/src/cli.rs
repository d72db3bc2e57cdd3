//! Command-line arguments.

use std::path::PathBuf;

use checkin::Mode;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "checkin",
    version,
    about = "Phased relationship check-ins in the terminal",
    after_help = "Examples:\n  checkin run\n  checkin run --mode full\n  checkin stats\n  checkin export --format json --out answers.json\n  checkin import answers.txt\n  checkin validate --phase-dir phases/phase_1 --strict",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Phase directory holding manifest.json and questions.json
    #[arg(long, value_name = "DIR", global = true, conflicts_with = "example")]
    pub phase_dir: Option<PathBuf>,

    /// Bundled phase to use when no --phase-dir is given
    #[arg(long, value_name = "ID", global = true, default_value = "phase_0")]
    pub example: String,

    /// State file [default: $CHECKIN_STATE_DIR/state.json, else the platform data dir]
    #[arg(long, value_name = "FILE", global = true)]
    pub state: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer questions in the terminal wizard
    Run(RunArgs),
    /// Show progress for the stored mode
    Stats(StatsArgs),
    /// Switch between the lite and full sets, keeping every answer
    Switch(SwitchArgs),
    /// Write the answers as text or JSON
    Export(ExportArgs),
    /// Read answers from a text or JSON export and merge them in
    Import(ImportArgs),
    /// Check a phase definition for structural problems
    Validate(ValidateArgs),
    /// Delete all answers and progress for the phase
    Reset(ResetArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Set to use; defaults to the stored one, or lite
    #[arg(long, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Write logs to this file while the wizard owns the terminal
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Target set: lite or full
    #[arg(value_name = "MODE")]
    pub mode: Mode,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
    pub format: ExportFormat,

    /// Set to export; defaults to the stored one, or lite
    #[arg(long, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Output path; stdout when omitted
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export file to read, or - for stdin
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Report what would be imported without saving
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm deleting the saved answers
    #[arg(long)]
    pub yes: bool,
}
