//! Ratatui front end for checkin questionnaires.
//!
//! Walks the active manifest one question at a time in the terminal, with
//! a progress bar, section context, skip and back, and a lite/full switch.
//!
//! ```rust,ignore
//! use checkin::{FileStore, Questionnaire};
//! use checkin_ratatui_wizard::{Wizard, WizardOutcome};
//!
//! let mut questionnaire = Questionnaire::new(phase, FileStore::open(path)?);
//! match Wizard::new().run(&mut questionnaire)? {
//!     WizardOutcome::Completed => println!("Done, thank you."),
//!     WizardOutcome::Paused => println!("Saved. Run again to continue."),
//! }
//! ```

pub mod editor;
mod wizard;

pub use editor::Editor;
pub use wizard::{
    Notice, Screen, Theme, Wizard, WizardError, WizardOutcome, WizardSession, describe_switch,
};
