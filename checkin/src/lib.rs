//! # checkin
//!
//! Questionnaire engine for phased relationship check-ins.
//!
//! A phase is loaded once as a [`PhaseDefinition`]. A [`Questionnaire`] walks
//! one of its manifests (`lite` or `full`), records answers and persists
//! session state through a [`SessionStore`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkin::{MemoryStore, Mode, PhaseDefinition, Questionnaire, Response};
//!
//! let phase = PhaseDefinition::load("phases/phase_0".as_ref())?;
//! let mut questionnaire = Questionnaire::new(phase, MemoryStore::new());
//! questionnaire.init(Mode::Lite)?;
//!
//! questionnaire.save_response("q03", Response::FreeText("hello".into()))?;
//! questionnaire.next();
//!
//! let switch = questionnaire.init_with_upgrade(Mode::Full)?;
//! println!("{} new questions", switch.unanswered_count);
//! ```
//!
//! ## Modules
//!
//! - [`reconcile`] - Map imported answers (JSON or text export) onto the current schema
//! - [`export`] - Render answers as text or as a JSON document
//! - [`ranked`] - Ranked-choice reordering and the drag gesture state machine

// Re-export all types from checkin-types
pub use checkin_types::*;

mod error;
pub use error::{ImportError, TraversalError};

mod storage;
pub use storage::PhaseStorage;

mod memory_store;
pub use memory_store::MemoryStore;

mod file_store;
pub use file_store::{FileStore, STATE_DIR_ENV};

mod questionnaire;
pub use questionnaire::{ModeSwitch, Questionnaire, Stats, SwitchDirection, TraversalState};

pub mod export;
pub use export::{Export, ExportDocument};

pub mod ranked;

pub mod reconcile;
pub use reconcile::{ImportSource, Reconciliation, ReviewItem, ReviewReason, match_option};
