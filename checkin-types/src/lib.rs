//! Core types for the checkin questionnaire engine.
//!
//! This crate provides the foundational, presentation-agnostic types:
//! - `PhaseDefinition` - Sections, questions and the named `lite`/`full` manifests
//! - `Question` and `QuestionKind` - Individual questions and their typed shapes
//! - `Response` and `Responses` - Answers keyed by `QuestionId`
//! - `SessionStore` - The persistence seam used by the engine
//! - `validate` - Structural checks over a phase definition

mod question_id;
pub use question_id::QuestionId;

mod response;
pub use response::{
    FieldValue, MultiSelection, RankedAnswer, Response, Selection, json_type_name,
};

mod responses;
pub use responses::{ResponseError, Responses};

mod question;
pub use question::{
    CompoundQuestion, Condition, DEFAULT_RANKED_KEY, Field, FieldKind, FreeTextQuestion,
    MultiSelectQuestion, NumberField, OTHER_VALUE, Question, QuestionKind, RankedSelectQuestion,
    SelectOption, SelectionLimits, ShowWhen, SingleSelectQuestion, label_for,
};

mod phase;
pub use phase::{
    Intro, MANIFEST_FILE, Manifest, ManifestDocument, Mode, PhaseDefinition, PhaseDisplay,
    QUESTIONS_FILE, QuestionsDocument, Section,
};

mod error;
pub use error::{SchemaError, StoreError};

mod traits;
pub use traits::SessionStore;

pub mod validate;
pub use validate::{ValidationReport, ValidationStatus};
