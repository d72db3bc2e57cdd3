use std::path::PathBuf;

use checkin::PhaseDefinition;

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/phase_0")
}

/// The five-question fixture phase: lite = q01..q03, full = q01..q05.
pub fn phase() -> PhaseDefinition {
    PhaseDefinition::load(&fixture_dir()).expect("fixture phase loads")
}
