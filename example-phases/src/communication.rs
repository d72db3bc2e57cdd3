//! Phase 1: listening and feeling cared for.
//!
//! The compound question shows different follow-ups depending on whether
//! the disagreement was resolved.

use checkin::PhaseDefinition;

use crate::BundledPhase;

pub const PHASE: BundledPhase = BundledPhase {
    id: "phase_1",
    manifest: include_str!("../phases/phase_1/manifest.json"),
    questions: include_str!("../phases/phase_1/questions.json"),
};

pub fn definition() -> anyhow::Result<PhaseDefinition> {
    PHASE.definition()
}
