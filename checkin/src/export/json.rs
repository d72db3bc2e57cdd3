use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Export, answer_summary};
use crate::{Mode, QuestionId, Stats};

/// Version of the [`ExportDocument`] layout.
pub const FORMAT_VERSION: u32 = 1;

/// The structured export of one manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub format_version: u32,
    pub phase: ExportPhase,
    pub mode: Mode,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPhase {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// One manifest question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    pub question_id: QuestionId,
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    /// The question type, e.g. `single_select`.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub status: ItemStatus,
    /// The canonical JSON answer, absent when nothing was entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    /// The answer with option labels instead of values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Answered,
    Skipped,
    Unanswered,
}

impl Export<'_> {
    pub fn to_document(&self) -> ExportDocument {
        let items = self
            .entries()
            .map(|(_, question)| {
                let response = self
                    .responses
                    .get(question.id().as_str())
                    .filter(|r| r.has_entry());
                ExportItem {
                    question_id: question.id().clone(),
                    section_id: question.section_id().to_string(),
                    section_title: self.section_title(question).to_string(),
                    title: question.title().to_string(),
                    prompt: question.prompt().to_string(),
                    kind: question.kind().type_name().to_string(),
                    status: self.status(question),
                    answer: response.map(|r| r.to_value()),
                    answer_text: response.map(|r| answer_summary(question, r)),
                }
            })
            .collect();

        ExportDocument {
            format_version: FORMAT_VERSION,
            phase: ExportPhase {
                id: self.definition.id().to_string(),
                title: self.definition.title().to_string(),
            },
            mode: self.mode,
            stats: self.stats(),
            items,
        }
    }

    /// The JSON document, pretty-printed.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_document())
    }
}
