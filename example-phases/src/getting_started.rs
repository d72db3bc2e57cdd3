//! Phase 0: a first, broad check-in. Covers every question type.

use checkin::PhaseDefinition;

use crate::BundledPhase;

pub const PHASE: BundledPhase = BundledPhase {
    id: "phase_0",
    manifest: include_str!("../phases/phase_0/manifest.json"),
    questions: include_str!("../phases/phase_0/questions.json"),
};

pub fn definition() -> anyhow::Result<PhaseDefinition> {
    PHASE.definition()
}
