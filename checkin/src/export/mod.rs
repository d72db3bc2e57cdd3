//! Render a phase's answers for people and for other tools.
//!
//! [`Export::to_text`] produces the plain-text form meant to be read, pasted
//! into a message or printed. [`Export::to_document`] produces the structured
//! JSON form. Both can be fed back through [`crate::reconcile::import`].

mod json;
mod text;

use std::collections::BTreeSet;

pub use json::{ExportDocument, ExportItem, ExportPhase, FORMAT_VERSION, ItemStatus};

use crate::{
    FieldKind, FieldValue, Manifest, Mode, PhaseDefinition, Question, QuestionId, QuestionKind,
    Questionnaire, Response, Responses, SchemaError, SessionStore, Stats, TraversalError,
    label_for,
};
use crate::reconcile::{ESCAPE, starts_block};

/// A view over one manifest's answers, ready to render.
#[derive(Debug, Clone)]
pub struct Export<'a> {
    definition: &'a PhaseDefinition,
    responses: &'a Responses,
    mode: Mode,
    manifest: &'a Manifest,
    skipped: BTreeSet<QuestionId>,
}

impl<'a> Export<'a> {
    /// Export the answers for `mode`. Fails when the phase has no such manifest.
    pub fn new(
        definition: &'a PhaseDefinition,
        responses: &'a Responses,
        mode: Mode,
    ) -> Result<Self, SchemaError> {
        let manifest = definition.manifest(mode)?;
        Ok(Self {
            definition,
            responses,
            mode,
            manifest,
            skipped: BTreeSet::new(),
        })
    }

    /// Mark these ids as skipped rather than unanswered.
    pub fn with_skipped(mut self, skipped: BTreeSet<QuestionId>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn stats(&self) -> Stats {
        Stats::compute(self.definition, self.responses, self.manifest, &self.skipped)
    }

    /// Manifest questions in order, paired with their 1-based number.
    ///
    /// Ids missing from the definition are skipped with a warning.
    fn entries(&self) -> impl Iterator<Item = (usize, &'a Question)> + '_ {
        self.manifest
            .question_ids()
            .iter()
            .enumerate()
            .filter_map(move |(index, id)| match self.definition.question(id.as_str()) {
                Some(question) => Some((index + 1, question)),
                None => {
                    tracing::warn!(question = %id, "manifest id has no question; not exported");
                    None
                }
            })
    }

    fn status(&self, question: &Question) -> ItemStatus {
        if self.responses.is_answered(self.definition, question.id().as_str()) {
            ItemStatus::Answered
        } else if self.skipped.contains(question.id()) {
            ItemStatus::Skipped
        } else {
            ItemStatus::Unanswered
        }
    }

    fn section_title(&self, question: &Question) -> &'a str {
        self.definition
            .section(question.section_id())
            .map(|s| s.title.as_str())
            .unwrap_or_default()
    }
}

impl<S: SessionStore> Questionnaire<S> {
    /// Export the active manifest, including the skipped marks.
    pub fn export(&self) -> Result<Export<'_>, TraversalError> {
        let mode = self.mode().ok_or(TraversalError::NotStarted)?;
        let skipped = self.skipped().cloned().unwrap_or_default();
        Ok(Export::new(self.definition(), self.responses(), mode)?.with_skipped(skipped))
    }
}

/// Answer lines for `response`, without the `A:` marker.
///
/// Option values are shown as their labels. The first line is the one that
/// follows `A:` directly; lists start on the next line.
pub(crate) fn answer_lines(question: &Question, response: &Response) -> Vec<String> {
    let options = question.kind().options();
    let mut lines = Vec::new();
    match response {
        Response::SingleSelect(selection) => {
            lines.push(label_for(options, &selection.selected_value).to_string());
            extras(&mut lines, &selection.other_text, &selection.notes);
        }
        Response::MultiSelect(selection) => {
            lines.push(String::new());
            for value in &selection.selected_values {
                lines.push(format!("- {}", label_for(options, value)));
            }
            extras(&mut lines, &selection.other_text, &selection.notes);
        }
        Response::Ranked(ranked) => {
            lines.push(String::new());
            for (rank, value) in ranked.values.iter().enumerate() {
                lines.push(format!("{}. {}", rank + 1, label_for(options, value)));
            }
        }
        Response::FreeText(text) => {
            lines.extend(text.trim().lines().map(|line| {
                if starts_block(line) {
                    format!("{ESCAPE}{line}")
                } else {
                    line.to_string()
                }
            }));
        }
        Response::Compound(values) => {
            lines.push(String::new());
            if let QuestionKind::Compound(compound) = question.kind() {
                for field in compound.visible_fields(values) {
                    let Some(value) = values.get(&field.key).filter(|v| v.is_filled()) else {
                        continue;
                    };
                    lines.push(format!(
                        "  {}: {}",
                        field.display_label(),
                        field_text(&field.kind, value)
                    ));
                }
                // Entries that belong to no field, such as unmatched import text.
                for (key, value) in values {
                    if compound.field(key).is_some() || !value.is_filled() {
                        continue;
                    }
                    lines.push(format!("  {key}: {}", field_text(&FieldKind::FreeText, value)));
                }
            }
        }
    }
    lines
}

/// One line summary of an answer, used in the JSON export.
pub(crate) fn answer_summary(question: &Question, response: &Response) -> String {
    let options = question.kind().options();
    match response {
        Response::SingleSelect(selection) => {
            let label = label_for(options, &selection.selected_value);
            match selection.other_text.as_deref().filter(|t| !t.trim().is_empty()) {
                Some(other) if label.is_empty() => other.trim().to_string(),
                Some(other) => format!("{label} ({other})"),
                None => label.to_string(),
            }
        }
        Response::MultiSelect(selection) => selection
            .selected_values
            .iter()
            .map(|v| label_for(options, v))
            .collect::<Vec<_>>()
            .join("; "),
        Response::Ranked(ranked) => ranked
            .values
            .iter()
            .enumerate()
            .map(|(rank, v)| format!("{}. {}", rank + 1, label_for(options, v)))
            .collect::<Vec<_>>()
            .join("; "),
        Response::FreeText(text) => text.trim().to_string(),
        Response::Compound(_) => answer_lines(question, response)
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn extras(lines: &mut Vec<String>, other_text: &Option<String>, notes: &Option<String>) {
    if let Some(other) = other_text.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("Other: {}", one_line(other)));
    }
    if let Some(notes) = notes.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("Notes: {}", one_line(notes)));
    }
}

/// Join the non-blank lines of `text` with `; `.
///
/// Compound text fields and the `Other:`/`Notes:` extras are written on one
/// line, so a multi-line value comes back from a text import joined by `; `.
fn one_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn field_text(kind: &FieldKind, value: &FieldValue) -> String {
    let options = kind.options();
    match value {
        FieldValue::Text(text) => one_line(label_for(options, text)),
        FieldValue::List(items) => items
            .iter()
            .map(|item| label_for(options, item))
            .collect::<Vec<_>>()
            .join("; "),
        FieldValue::Number(n) => n.to_string(),
    }
}
