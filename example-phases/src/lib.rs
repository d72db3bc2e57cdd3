//! Bundled phase documents for demos and tests.
//!
//! Each phase is a pair of JSON documents embedded at compile time, exactly
//! as they would sit in a phase directory on disk.

use anyhow::{Context, bail};
use checkin::PhaseDefinition;

pub mod communication;
pub mod getting_started;

/// An embedded phase: its id and the two documents.
#[derive(Debug, Clone, Copy)]
pub struct BundledPhase {
    pub id: &'static str,
    pub manifest: &'static str,
    pub questions: &'static str,
}

impl BundledPhase {
    /// Parse the embedded documents.
    pub fn definition(&self) -> anyhow::Result<PhaseDefinition> {
        PhaseDefinition::from_json_str(self.manifest, self.questions)
            .with_context(|| format!("bundled phase '{}'", self.id))
    }
}

/// All bundled phases, in display order.
pub const PHASES: [BundledPhase; 2] = [getting_started::PHASE, communication::PHASE];

/// Look up a bundled phase by id.
pub fn by_id(id: &str) -> anyhow::Result<PhaseDefinition> {
    match PHASES.iter().find(|phase| phase.id == id) {
        Some(phase) => phase.definition(),
        None => bail!(
            "no bundled phase '{id}' (available: {})",
            PHASES.map(|p| p.id).join(", ")
        ),
    }
}
