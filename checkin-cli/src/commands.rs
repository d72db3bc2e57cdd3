//! Command implementations.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use checkin::reconcile::{self, Reconciliation};
use checkin::validate::validate as validate_phase;
use checkin::{
    Export, FileStore, Mode, PhaseDefinition, Questionnaire, ReviewItem, STATE_DIR_ENV, Stats,
    ValidationReport, ValidationStatus,
};
use checkin_ratatui_wizard::{Wizard, WizardOutcome, describe_switch};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{
    ExportArgs, ExportFormat, GlobalArgs, ImportArgs, ResetArgs, RunArgs, StatsArgs, SwitchArgs,
    ValidateArgs,
};

fn load_phase(global: &GlobalArgs) -> Result<PhaseDefinition> {
    match &global.phase_dir {
        Some(dir) => PhaseDefinition::load(dir)
            .with_context(|| format!("loading phase from {}", dir.display())),
        None => example_phases::by_id(&global.example),
    }
}

fn state_path(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.state {
        Some(path) => Ok(path.clone()),
        None => FileStore::default_path().with_context(|| {
            format!("no data directory found; pass --state or set {STATE_DIR_ENV}")
        }),
    }
}

fn open(global: &GlobalArgs) -> Result<Questionnaire<FileStore>> {
    let definition = load_phase(global)?;
    let path = state_path(global)?;
    debug!(phase = definition.id(), state = %path.display(), "opening session");
    let store =
        FileStore::open(&path).with_context(|| format!("opening state {}", path.display()))?;
    Ok(Questionnaire::new(definition, store))
}

/// Mode for read-only commands: the explicit one, the stored one, or lite.
fn effective_mode(questionnaire: &Questionnaire<FileStore>, explicit: Option<Mode>) -> Mode {
    explicit
        .or_else(|| questionnaire.storage().load_mode())
        .unwrap_or(Mode::Lite)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_stats(mode: Mode, stats: &Stats) {
    println!(
        "{mode}: {} answered, {} skipped, {} open of {}",
        stats.answered, stats.skipped, stats.unanswered, stats.total
    );
}

pub fn run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let mut questionnaire = open(global)?;
    let stored = questionnaire.storage().load_mode();
    match args.mode {
        Some(mode) if stored != Some(mode) => {
            let switch = questionnaire.init_with_upgrade(mode)?;
            info!(direction = ?switch.direction, %mode, "starting in requested mode");
        }
        Some(mode) => questionnaire.init(mode)?,
        None => {
            questionnaire.resume()?;
        }
    }

    let title = questionnaire.definition().title().to_string();
    let outcome = Wizard::new().with_title(title).run(&mut questionnaire)?;

    let stats = questionnaire.stats();
    let mode = questionnaire.mode().unwrap_or(Mode::Lite);
    match outcome {
        WizardOutcome::Completed => println!("Check-in complete."),
        WizardOutcome::Paused => println!("Paused. Run `checkin run` to pick up where you left off."),
    }
    print_stats(mode, &stats);
    Ok(())
}

pub fn stats(global: &GlobalArgs, args: StatsArgs) -> Result<()> {
    let questionnaire = open(global)?;
    let mode = effective_mode(&questionnaire, None);
    let definition = questionnaire.definition();
    let manifest = definition.manifest(mode)?;
    let skipped = questionnaire.storage().load_skipped(mode);
    let stats = Stats::compute(definition, questionnaire.responses(), manifest, &skipped);

    if args.json {
        #[derive(Serialize)]
        struct StatsOutput<'a> {
            phase: &'a str,
            mode: Mode,
            #[serde(flatten)]
            stats: Stats,
            completed_modes: Vec<Mode>,
        }
        return print_json(&StatsOutput {
            phase: definition.id(),
            mode,
            stats,
            completed_modes: questionnaire.completed_modes().into_iter().collect(),
        });
    }

    println!("{}", definition.title());
    print_stats(mode, &stats);
    let completed = questionnaire.completed_modes();
    if !completed.is_empty() {
        let names: Vec<String> = completed.iter().map(Mode::to_string).collect();
        println!("Completed: {}", names.join(", "));
    }
    Ok(())
}

pub fn switch(global: &GlobalArgs, args: SwitchArgs) -> Result<()> {
    let mut questionnaire = open(global)?;
    let switch = questionnaire
        .init_with_upgrade(args.mode)
        .with_context(|| format!("switching to {}", args.mode))?;
    info!(mode = %args.mode, start = switch.start_index, "switched");

    if args.json {
        return print_json(&switch);
    }
    println!("{}", describe_switch(&switch));
    Ok(())
}

pub fn export(global: &GlobalArgs, args: ExportArgs) -> Result<()> {
    let questionnaire = open(global)?;
    let mode = effective_mode(&questionnaire, args.mode);
    let skipped = questionnaire.storage().load_skipped(mode);
    let export = Export::new(questionnaire.definition(), questionnaire.responses(), mode)?
        .with_skipped(skipped);

    let mut body = match args.format {
        ExportFormat::Text => export.to_text(),
        ExportFormat::Json => export.to_json()?,
    };
    if !body.ends_with('\n') {
        body.push('\n');
    }

    match &args.out {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), %mode, "exported");
            eprintln!("Wrote {}", path.display());
        }
        None => io::stdout().write_all(body.as_bytes())?,
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("reading stdin")?;
        return Ok(input);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_reconciliation(result: &Reconciliation, dry_run: bool) {
    let verb = if dry_run { "Would import" } else { "Imported" };
    println!("{verb} {} answer(s).", result.responses.len());
    if !result.needs_review.is_empty() {
        println!("Needs review:");
        for item in &result.needs_review {
            let mut line = format!("  {}: {}", item.question_id, item.reason);
            if !item.unmatched.is_empty() {
                line.push_str(&format!(" ({})", item.unmatched.join(", ")));
            }
            if !item.missing_fields.is_empty() {
                line.push_str(&format!(" (missing {})", item.missing_fields.join(", ")));
            }
            println!("{line}");
        }
    }
    if !result.unknown_ids.is_empty() {
        let ids: Vec<&str> = result.unknown_ids.iter().map(|id| id.as_str()).collect();
        println!("Ignored unknown questions: {}", ids.join(", "));
    }
}

pub fn import(global: &GlobalArgs, args: ImportArgs) -> Result<()> {
    let input = read_input(&args.input)?;
    let mut questionnaire = open(global)?;
    let result = reconcile::import(questionnaire.definition(), &input)
        .with_context(|| format!("importing {}", args.input.display()))?;
    info!(
        imported = result.responses.len(),
        review = result.needs_review.len(),
        unknown = result.unknown_ids.len(),
        "reconciled import"
    );

    if args.json {
        #[derive(Serialize)]
        struct ImportOutput<'a> {
            dry_run: bool,
            imported: usize,
            needs_review: &'a [ReviewItem],
            unknown_ids: Vec<&'a str>,
        }
        print_json(&ImportOutput {
            dry_run: args.dry_run,
            imported: result.responses.len(),
            needs_review: &result.needs_review,
            unknown_ids: result.unknown_ids.iter().map(|id| id.as_str()).collect(),
        })?;
    } else {
        print_reconciliation(&result, args.dry_run);
    }

    if !args.dry_run {
        // An active session lets the merge clear skips the import answers.
        questionnaire.resume()?;
        questionnaire.merge_responses(result.responses);
    }
    Ok(())
}

pub fn validate(global: &GlobalArgs, args: ValidateArgs) -> Result<()> {
    let definition = load_phase(global)?;
    let report = validate_phase(&definition);

    if args.json {
        #[derive(Serialize)]
        struct ValidateOutput<'a> {
            status: ValidationStatus,
            #[serde(flatten)]
            report: &'a ValidationReport,
        }
        print_json(&ValidateOutput {
            status: report.status(),
            report: &report,
        })?;
    } else {
        let status = match report.status() {
            ValidationStatus::Pass => "PASS",
            ValidationStatus::Warn => "WARN",
            ValidationStatus::Fail => "FAIL",
        };
        println!("{status}: {}", report.phase);
        for error in &report.errors {
            println!("  error: {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }

    if !report.passes(args.strict) {
        bail!(
            "phase '{}' failed validation ({} errors, {} warnings)",
            report.phase,
            report.errors.len(),
            report.warnings.len()
        );
    }
    Ok(())
}

pub fn reset(global: &GlobalArgs, args: ResetArgs) -> Result<()> {
    if !args.yes {
        bail!("reset deletes every saved answer for the phase; pass --yes to confirm");
    }
    let mut questionnaire = open(global)?;
    let phase = questionnaire.definition().id().to_string();
    questionnaire.reset();
    info!(%phase, "reset");
    println!("Cleared all answers for {phase}.");
    Ok(())
}
