//! Import reconciliation.
//!
//! Maps an answer set produced outside the current session (another export,
//! an older schema, a hand-edited file) onto the current phase definition.
//! Anything that cannot be matched confidently is flagged for review and
//! preserved, never silently dropped.

mod matching;
mod text;

pub use matching::{MatchRule, PREFIX_LEN, match_option, normalize, resolve};
pub use text::{BlockStatus, TextBlock, parse_text_export, raw_answer};
pub(crate) use text::{ESCAPE, starts_block};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    CompoundQuestion, ExportDocument, FieldKind, FieldValue, ImportError, MultiSelection,
    MultiSelectQuestion, OTHER_VALUE, PhaseDefinition, QuestionId, QuestionKind, RankedAnswer,
    RankedSelectQuestion, Response, Responses, SelectOption, Selection, SingleSelectQuestion,
    json_type_name,
};

/// Why an imported answer needs a human to look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    /// Nothing supplied could be matched to an option.
    Unmatched,
    /// Some items matched, others did not.
    PartiallyMatched,
    /// The answer is empty.
    Empty,
    /// Required fields of a compound question are missing.
    MissingFields,
    /// The answer's JSON shape does not fit the question; it was kept raw.
    WrongShape,
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unmatched => "no matching option",
            Self::PartiallyMatched => "some items did not match",
            Self::Empty => "empty answer",
            Self::MissingFields => "required fields missing",
            Self::WrongShape => "unexpected answer shape",
        };
        f.write_str(text)
    }
}

/// One flagged question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub question_id: QuestionId,
    pub reason: ReviewReason,
    /// The supplied text that could not be matched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
    /// Required, visible compound fields with no value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    /// The answer exactly as supplied.
    pub original: Value,
}

/// The result of reconciling an import against the current schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Answers ready to merge into the response store. Unknown ids are
    /// retained raw inside.
    pub responses: Responses,
    pub needs_review: Vec<ReviewItem>,
    /// Ids the current schema does not know.
    pub unknown_ids: Vec<QuestionId>,
}

impl Reconciliation {
    /// Ids of the flagged questions.
    pub fn needs_review_ids(&self) -> Vec<&QuestionId> {
        self.needs_review.iter().map(|item| &item.question_id).collect()
    }

    /// Check whether every answer reconciled without a flag.
    pub fn is_clean(&self) -> bool {
        self.needs_review.is_empty()
    }
}

/// Where an import came from.
#[derive(Debug, Clone)]
pub enum ImportSource {
    /// The structured JSON export.
    Export(ExportDocument),
    /// A bare JSON map of question id to answer.
    Answers(Map<String, Value>),
    /// The human-readable text export.
    Text(String),
}

impl ImportSource {
    /// Guess the format of `input`.
    pub fn detect(input: &str) -> Result<Self, ImportError> {
        let trimmed = input.trim_start();
        if trimmed.is_empty() {
            return Err(ImportError::Empty);
        }
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return Ok(Self::Text(input.to_string()));
        }

        let value: Value = serde_json::from_str(trimmed)?;
        let Value::Object(map) = value else {
            return Err(ImportError::NotAnObject(json_type_name(&value)));
        };
        if map.contains_key("format_version") && map.contains_key("items") {
            let document = serde_json::from_value(Value::Object(map))?;
            return Ok(Self::Export(document));
        }
        Ok(Self::Answers(map))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Export(_) => "json export",
            Self::Answers(_) => "json answers",
            Self::Text(_) => "text export",
        }
    }

    /// Provisional raw answers keyed by question id.
    pub fn answers(&self, definition: &PhaseDefinition) -> Map<String, Value> {
        match self {
            Self::Export(document) => document
                .items
                .iter()
                .filter_map(|item| {
                    let answer = item.answer.clone()?;
                    Some((item.question_id.to_string(), answer))
                })
                .collect(),
            Self::Answers(map) => map.clone(),
            Self::Text(text) => {
                let mut answers = Map::new();
                for block in parse_text_export(text) {
                    let raw = match definition.question(block.question_id.as_str()) {
                        Some(question) => raw_answer(question.kind(), &block),
                        None if block.status == BlockStatus::Answered => {
                            Some(Value::String(block.text()))
                        }
                        None => None,
                    };
                    if let Some(raw) = raw {
                        answers.insert(block.question_id.to_string(), raw);
                    }
                }
                answers
            }
        }
    }
}

/// Detect the format of `input` and reconcile it against `definition`.
pub fn import(definition: &PhaseDefinition, input: &str) -> Result<Reconciliation, ImportError> {
    let source = ImportSource::detect(input)?;
    let answers = source.answers(definition);
    if answers.is_empty() {
        return Err(ImportError::Empty);
    }
    tracing::debug!(source = source.kind_name(), answers = answers.len(), "importing");
    Ok(reconcile(definition, &answers))
}

/// Reconcile raw answers keyed by question id against `definition`.
///
/// Reconciling answers that are already canonical for the current schema
/// returns them unchanged with nothing flagged.
pub fn reconcile(definition: &PhaseDefinition, answers: &Map<String, Value>) -> Reconciliation {
    let mut result = Reconciliation::default();

    for (id, raw) in answers {
        if raw.is_null() {
            continue;
        }
        let Some(question) = definition.question(id) else {
            tracing::debug!(question = %id, "import references unknown question");
            result.unknown_ids.push(QuestionId::new(id));
            result.responses.retain_raw(id.as_str(), raw.clone());
            continue;
        };

        let outcome = match question.kind() {
            QuestionKind::SingleSelect(q) => single_select(q, raw),
            QuestionKind::MultiSelect(q) => multi_select(q, raw),
            QuestionKind::RankedSelect(q) => ranked_select(q, raw),
            QuestionKind::FreeText(_) => free_text(raw),
            QuestionKind::Compound(q) => compound(q, raw),
        };

        match outcome.response {
            Some(response) => {
                result.responses.insert(id.as_str(), response);
            }
            None => result.responses.retain_raw(id.as_str(), raw.clone()),
        }
        if let Some(reason) = outcome.flag {
            tracing::debug!(question = %id, %reason, "flagged for review");
            result.needs_review.push(ReviewItem {
                question_id: QuestionId::new(id),
                reason,
                unmatched: outcome.unmatched,
                missing_fields: outcome.missing_fields,
                original: raw.clone(),
            });
        }
    }

    tracing::info!(
        phase = %definition.id(),
        imported = result.responses.len(),
        needs_review = result.needs_review.len(),
        unknown = result.unknown_ids.len(),
        "reconciled import"
    );
    result
}

#[derive(Default)]
struct Outcome {
    response: Option<Response>,
    flag: Option<ReviewReason>,
    unmatched: Vec<String>,
    missing_fields: Vec<String>,
}

impl Outcome {
    fn clean(response: Response) -> Self {
        Self {
            response: Some(response),
            ..Default::default()
        }
    }

    fn wrong_shape() -> Self {
        Self {
            flag: Some(ReviewReason::WrongShape),
            ..Default::default()
        }
    }

    fn flagged(response: Response, reason: ReviewReason, unmatched: Vec<String>) -> Self {
        Self {
            response: Some(response),
            flag: Some(reason),
            unmatched,
            missing_fields: Vec::new(),
        }
    }
}

/// Append `text` to an optional free-text note, one entry per line.
fn append_text(existing: Option<String>, text: &str) -> Option<String> {
    match existing.filter(|e| !e.trim().is_empty()) {
        Some(existing) if existing.contains(text) => Some(existing),
        Some(existing) => Some(format!("{text}\n{existing}")),
        None => Some(text.to_string()),
    }
}

fn single_select(question: &SingleSelectQuestion, raw: &Value) -> Outcome {
    let mut selection = match raw {
        Value::Object(_) => match serde_json::from_value::<Selection>(raw.clone()) {
            Ok(selection) => selection,
            Err(_) => return Outcome::wrong_shape(),
        },
        Value::String(s) => Selection::new(s.as_str()),
        _ => return Outcome::wrong_shape(),
    };

    let input = selection.selected_value.trim().to_string();
    if input.is_empty() {
        let has_other = selection
            .other_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        return match (has_other, question.allows_other()) {
            (true, true) => {
                selection.selected_value = OTHER_VALUE.to_string();
                Outcome::clean(selection.into())
            }
            (true, false) => {
                let unmatched = selection.other_text.iter().cloned().collect();
                Outcome::flagged(selection.into(), ReviewReason::Unmatched, unmatched)
            }
            (false, _) => Outcome::flagged(selection.into(), ReviewReason::Empty, Vec::new()),
        };
    }

    match resolve(&input, &question.options) {
        Some((option, rule)) => {
            if rule != MatchRule::ExactValue {
                tracing::debug!(input = %input, value = %option.value, ?rule, "resolved option");
            }
            selection.selected_value = option.value.clone();
            Outcome::clean(selection.into())
        }
        None => {
            selection.selected_value = String::new();
            selection.other_text = append_text(selection.other_text.take(), &input);
            Outcome::flagged(selection.into(), ReviewReason::Unmatched, vec![input])
        }
    }
}

/// Read a list of strings from an array, or split a `;`-joined string.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => Some(text::split_list(s)),
        _ => None,
    }
}

/// Resolve each item; returns (resolved values, unmatched inputs).
fn resolve_items(items: &[String], options: &[SelectOption]) -> (Vec<String>, Vec<String>) {
    let mut resolved: Vec<String> = Vec::new();
    let mut unmatched = Vec::new();
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match match_option(item, options) {
            Some(option) if !resolved.contains(&option.value) => resolved.push(option.value.clone()),
            Some(_) => {}
            None => unmatched.push(item.to_string()),
        }
    }
    (resolved, unmatched)
}

fn partial_reason(resolved: &[String]) -> ReviewReason {
    if resolved.is_empty() {
        ReviewReason::Unmatched
    } else {
        ReviewReason::PartiallyMatched
    }
}

fn multi_select(question: &MultiSelectQuestion, raw: &Value) -> Outcome {
    let mut selection = match raw {
        Value::Object(_) => match serde_json::from_value::<MultiSelection>(raw.clone()) {
            Ok(selection) => selection,
            Err(_) => return Outcome::wrong_shape(),
        },
        other => match string_list(other) {
            Some(items) => MultiSelection::new(items),
            None => return Outcome::wrong_shape(),
        },
    };

    let (resolved, unmatched) = resolve_items(&selection.selected_values, &question.options);
    selection.selected_values = resolved;
    if unmatched.is_empty() {
        return Outcome::clean(selection.into());
    }
    selection.other_text = append_text(selection.other_text.take(), &unmatched.join("; "));
    let reason = partial_reason(&selection.selected_values);
    Outcome::flagged(selection.into(), reason, unmatched)
}

fn ranked_select(question: &RankedSelectQuestion, raw: &Value) -> Outcome {
    let key = question.answer_key();
    let list = match raw {
        Value::Object(object) => match object.get(key) {
            Some(list) => list,
            None => {
                // An answer stored under an older key: accept a lone list.
                let mut lists = object.values().filter(|v| v.is_array());
                match (lists.next(), lists.next()) {
                    (Some(list), None) => list,
                    _ => return Outcome::wrong_shape(),
                }
            }
        },
        other => other,
    };
    let Some(items) = string_list(list) else {
        return Outcome::wrong_shape();
    };

    let (values, unmatched) = resolve_items(&items, &question.options);
    let reason = partial_reason(&values);
    let response = Response::Ranked(RankedAnswer {
        key: key.to_string(),
        values,
    });
    if unmatched.is_empty() {
        Outcome::clean(response)
    } else {
        Outcome::flagged(response, reason, unmatched)
    }
}

fn free_text(raw: &Value) -> Outcome {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Object(object) => match object.get("text") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(_) => return Outcome::wrong_shape(),
        },
        _ => return Outcome::wrong_shape(),
    };
    if text.trim().is_empty() {
        Outcome::flagged(Response::FreeText(text), ReviewReason::Empty, Vec::new())
    } else {
        Outcome::clean(Response::FreeText(text))
    }
}

fn compound(question: &CompoundQuestion, raw: &Value) -> Outcome {
    let Value::Object(input) = raw else {
        return Outcome::wrong_shape();
    };

    let mut consumed: BTreeSet<&str> = question
        .fields
        .iter()
        .filter(|f| input.contains_key(&f.key))
        .map(|f| f.key.as_str())
        .collect();
    let mut values = BTreeMap::new();
    let mut unmatched = Vec::new();

    for field in &question.fields {
        let found = match input.get(&field.key) {
            Some(value) => Some((field.key.as_str(), value)),
            None => fuzzy_key(&field.key, field.display_label(), input, &consumed),
        };
        let Some((key, value)) = found else {
            continue;
        };
        consumed.insert(key);
        if key != field.key {
            tracing::debug!(field = %field.key, input_key = %key, "matched field by name");
        }
        let (reconciled, missed) = field_value(&field.kind, value);
        if let Some(reconciled) = reconciled {
            values.insert(field.key.clone(), reconciled);
        }
        if !missed.is_empty() {
            // Unmatched text is stored beside the field so it survives the merge.
            values.insert(other_key(&field.key), FieldValue::Text(missed.join("; ")));
        }
        unmatched.extend(missed.into_iter().map(|m| format!("{}: {m}", field.display_label())));
    }

    for (key, value) in input {
        if consumed.contains(key.as_str()) || value.is_null() || values.contains_key(key) {
            continue;
        }
        if let Ok(extra) = serde_json::from_value::<FieldValue>(value.clone()) {
            values.insert(key.clone(), extra);
        }
        unmatched.push(format!("{key}: {}", display_raw(value)));
    }

    let missing_fields: Vec<String> = question
        .visible_fields(&values)
        .filter(|f| !f.optional && !values.get(&f.key).is_some_and(FieldValue::is_filled))
        .map(|f| f.key.clone())
        .collect();

    let resolved_any = question.fields.iter().any(|f| values.contains_key(&f.key));
    let flag = if !unmatched.is_empty() {
        Some(if resolved_any {
            ReviewReason::PartiallyMatched
        } else {
            ReviewReason::Unmatched
        })
    } else if !missing_fields.is_empty() {
        Some(ReviewReason::MissingFields)
    } else {
        None
    };

    Outcome {
        response: Some(Response::Compound(values)),
        flag,
        unmatched,
        missing_fields,
    }
}

/// The compound entry holding text that matched none of `field`'s options.
pub fn other_key(field: &str) -> String {
    format!("{field}_other")
}

/// Find the input key that best names a field: reciprocal containment of
/// normalized key or label, preferring the smallest length difference.
fn fuzzy_key<'a>(
    field_key: &str,
    field_label: &str,
    input: &'a Map<String, Value>,
    consumed: &BTreeSet<&str>,
) -> Option<(&'a str, &'a Value)> {
    let targets: Vec<String> = [normalize(field_key), normalize(field_label)]
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();

    input
        .iter()
        .filter(|(key, _)| !consumed.contains(key.as_str()))
        .filter_map(|(key, value)| {
            let candidate = normalize(key);
            if candidate.is_empty() {
                return None;
            }
            targets
                .iter()
                .filter(|t| candidate.contains(t.as_str()) || t.contains(candidate.as_str()))
                .map(|t| t.len().abs_diff(candidate.len()))
                .min()
                .map(|distance| (distance, key.as_str(), value))
        })
        .min_by_key(|(distance, _, _)| *distance)
        .map(|(_, key, value)| (key, value))
}

/// Reconcile one compound field value; returns the value and unmatched text.
fn field_value(kind: &FieldKind, raw: &Value) -> (Option<FieldValue>, Vec<String>) {
    match kind {
        FieldKind::FreeText => match raw {
            Value::Null => (None, Vec::new()),
            Value::String(s) => (Some(FieldValue::Text(s.clone())), Vec::new()),
            Value::Number(_) | Value::Bool(_) => (Some(FieldValue::Text(raw.to_string())), Vec::new()),
            Value::Array(_) => match string_list(raw) {
                Some(items) => (Some(FieldValue::Text(items.join("; "))), Vec::new()),
                None => (None, vec![raw.to_string()]),
            },
            Value::Object(_) => (None, vec![raw.to_string()]),
        },
        FieldKind::Number(_) => match raw {
            Value::Null => (None, Vec::new()),
            Value::Number(n) => match n.as_f64() {
                Some(n) => (Some(FieldValue::Number(n)), Vec::new()),
                None => (None, vec![n.to_string()]),
            },
            Value::String(s) if s.trim().is_empty() => (Some(FieldValue::Text(String::new())), Vec::new()),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => (Some(FieldValue::Number(n)), Vec::new()),
                Err(_) => (None, vec![s.clone()]),
            },
            other => (None, vec![other.to_string()]),
        },
        FieldKind::SingleSelect(q) => {
            let text = match raw {
                Value::Null => return (None, Vec::new()),
                Value::String(s) => s.clone(),
                Value::Array(items) if items.len() == 1 => display_raw(&items[0]),
                other => display_raw(other),
            };
            if text.trim().is_empty() {
                return (Some(FieldValue::Text(String::new())), Vec::new());
            }
            match match_option(&text, &q.options) {
                Some(option) => (Some(FieldValue::Text(option.value.clone())), Vec::new()),
                None => (None, vec![text]),
            }
        }
        FieldKind::MultiSelect(MultiSelectQuestion { options, .. })
        | FieldKind::RankedSelect(RankedSelectQuestion { options, .. }) => {
            if raw.is_null() {
                return (None, Vec::new());
            }
            let Some(items) = string_list(raw) else {
                return (None, vec![raw.to_string()]);
            };
            let (resolved, unmatched) = resolve_items(&items, options);
            (Some(FieldValue::List(resolved)), unmatched)
        }
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Condition, Field, FreeTextQuestion, Mode, NumberField, Question};

    fn phase() -> PhaseDefinition {
        PhaseDefinition::new("phase_0", "Check-in")
            .with_question(Question::new(
                "q01",
                "s1",
                1,
                "Safe",
                QuestionKind::SingleSelect(SingleSelectQuestion::new(vec![
                    SelectOption::new("yes", "Yes\u{2014}completely safe"),
                    SelectOption::new("mostly", "Mostly safe"),
                    SelectOption::new("no", "Not safe"),
                ])),
            ))
            .with_question(Question::new(
                "q02",
                "s1",
                2,
                "Topics",
                QuestionKind::MultiSelect(MultiSelectQuestion::new(vec![
                    SelectOption::new("money", "Money"),
                    SelectOption::new("chores", "Household chores"),
                    SelectOption::new("other", "Other"),
                ])),
            ))
            .with_question(Question::new(
                "q03",
                "s1",
                3,
                "Words",
                QuestionKind::FreeText(FreeTextQuestion::new()),
            ))
            .with_question(Question::new(
                "q04",
                "s1",
                4,
                "Priorities",
                QuestionKind::RankedSelect(RankedSelectQuestion::new(vec![
                    SelectOption::new("a", "Time"),
                    SelectOption::new("b", "Money"),
                    SelectOption::new("c", "Sleep"),
                ])),
            ))
            .with_question(Question::new(
                "q05",
                "s1",
                5,
                "Habits",
                QuestionKind::Compound(CompoundQuestion::new(vec![
                    Field::new(
                        "frequency",
                        "How often",
                        FieldKind::SingleSelect(SingleSelectQuestion::new(vec![
                            SelectOption::new("weekly", "Weekly"),
                            SelectOption::new("monthly", "Monthly"),
                        ])),
                    ),
                    Field::new("hours", "Hours", FieldKind::Number(NumberField::default()))
                        .with_show_when("frequency", Condition::Equals("weekly".into())),
                    Field::new("note", "Note", FieldKind::FreeText).optional(),
                ])),
            ))
            .with_manifest(Mode::Full, &["q01", "q02", "q03", "q04", "q05"])
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn label_resolves_to_value() {
        let result = reconcile(&phase(), &map(json!({"q01": {"selected_value": "Yes\u{2014}completely safe"}})));
        assert!(result.is_clean());
        assert_eq!(
            result.responses.get("q01"),
            Some(&Response::SingleSelect(Selection::new("yes")))
        );
    }

    #[test]
    fn unrecognized_single_select_becomes_other_text() {
        let result = reconcile(
            &phase(),
            &map(json!({"q01": {"selected_value": "it's complicated, long story"}})),
        );
        assert_eq!(
            result.responses.get("q01"),
            Some(&Response::SingleSelect(
                Selection::new("").with_other_text("it's complicated, long story")
            ))
        );
        assert_eq!(result.needs_review_ids(), vec![&QuestionId::new("q01")]);
        assert_eq!(result.needs_review[0].reason, ReviewReason::Unmatched);
    }

    #[test]
    fn multi_select_drops_unmatched_items_into_other_text() {
        let result = reconcile(
            &phase(),
            &map(json!({"q02": {"selected_values": ["money", "chores at home", "the weather"]}})),
        );
        let Some(Response::MultiSelect(selection)) = result.responses.get("q02") else {
            panic!("Expected MultiSelect");
        };
        assert_eq!(selection.selected_values, vec!["money"]);
        assert_eq!(selection.other_text.as_deref(), Some("chores at home; the weather"));
        assert_eq!(result.needs_review[0].reason, ReviewReason::PartiallyMatched);
        assert_eq!(result.needs_review[0].unmatched.len(), 2);
    }

    #[test]
    fn multi_select_with_nothing_resolved_is_flagged() {
        let result = reconcile(&phase(), &map(json!({"q02": ["weather"]})));
        assert_eq!(result.needs_review[0].reason, ReviewReason::Unmatched);
    }

    #[test]
    fn free_text_flagged_only_when_empty() {
        let result = reconcile(&phase(), &map(json!({"q03": {"text": "  "}})));
        assert_eq!(result.needs_review[0].reason, ReviewReason::Empty);

        let result = reconcile(&phase(), &map(json!({"q03": "plain string"})));
        assert!(result.is_clean());
        assert_eq!(
            result.responses.get("q03"),
            Some(&Response::FreeText("plain string".into()))
        );
    }

    #[test]
    fn ranked_keeps_order_and_drops_unmatched() {
        let result = reconcile(&phase(), &map(json!({"q04": {"ranked": ["Sleep", "Fun", "time"]}})));
        let Some(Response::Ranked(ranked)) = result.responses.get("q04") else {
            panic!("Expected Ranked");
        };
        assert_eq!(ranked.values, vec!["c", "a"]);
        assert_eq!(result.needs_review[0].unmatched, vec!["Fun"]);
    }

    #[test]
    fn ranked_accepts_a_lone_list_under_an_old_key() {
        let result = reconcile(&phase(), &map(json!({"q04": {"order": ["b", "a"]}})));
        assert!(result.is_clean());
        let Some(Response::Ranked(ranked)) = result.responses.get("q04") else {
            panic!("Expected Ranked");
        };
        assert_eq!(ranked.key, "ranked");
        assert_eq!(ranked.values, vec!["b", "a"]);
    }

    #[test]
    fn compound_fuzzy_key_match() {
        let result = reconcile(
            &phase(),
            &map(json!({"q05": {"how_often": "Weekly", "hours_per_week": "3"}})),
        );
        assert!(result.is_clean(), "{:?}", result.needs_review);
        let Some(Response::Compound(values)) = result.responses.get("q05") else {
            panic!("Expected Compound");
        };
        assert_eq!(values["frequency"], FieldValue::Text("weekly".into()));
        assert_eq!(values["hours"], FieldValue::Number(3.0));
    }

    #[test]
    fn compound_missing_required_visible_field_is_flagged() {
        let result = reconcile(&phase(), &map(json!({"q05": {"frequency": "weekly"}})));
        assert_eq!(result.needs_review[0].reason, ReviewReason::MissingFields);
        assert_eq!(result.needs_review[0].missing_fields, vec!["hours"]);

        // Hidden fields are not required.
        let result = reconcile(&phase(), &map(json!({"q05": {"frequency": "monthly"}})));
        assert!(result.is_clean());
    }

    #[test]
    fn compound_unmatched_field_text_is_kept_beside_the_field() {
        let result = reconcile(
            &phase(),
            &map(json!({"q05": {"frequency": "every full moon", "note": "because"}})),
        );
        let Some(Response::Compound(values)) = result.responses.get("q05") else {
            panic!("Expected Compound");
        };
        assert!(!values.contains_key("frequency"));
        assert_eq!(
            values["frequency_other"],
            FieldValue::Text("every full moon".into())
        );
        assert_eq!(values["note"], FieldValue::Text("because".into()));
        assert_eq!(result.needs_review[0].reason, ReviewReason::PartiallyMatched);
        assert_eq!(result.needs_review[0].unmatched, vec!["How often: every full moon"]);
    }

    #[test]
    fn compound_blank_required_field_is_missing() {
        let result = reconcile(
            &phase(),
            &map(json!({"q05": {"frequency": "weekly", "hours": ""}})),
        );
        assert_eq!(result.needs_review[0].reason, ReviewReason::MissingFields);
        assert_eq!(result.needs_review[0].missing_fields, vec!["hours"]);
    }

    #[test]
    fn unknown_ids_are_retained() {
        let result = reconcile(&phase(), &map(json!({"q99": {"text": "old"}})));
        assert_eq!(result.unknown_ids, vec![QuestionId::new("q99")]);
        assert_eq!(result.responses.retained().len(), 1);
        assert!(result.is_clean());
    }

    #[test]
    fn wrong_shape_is_kept_raw_and_flagged() {
        let result = reconcile(&phase(), &map(json!({"q05": "not an object"})));
        assert_eq!(result.needs_review[0].reason, ReviewReason::WrongShape);
        assert!(result.responses.get("q05").is_none());
        assert_eq!(result.responses.retained().len(), 1);
    }

    #[test]
    fn canonical_input_is_unchanged() {
        let canonical = json!({
            "q01": {"selected_value": "mostly", "notes": "better lately"},
            "q02": {"selected_values": ["money", "other"], "other_text": "in-laws"},
            "q03": {"text": "hello"},
            "q04": {"ranked": ["c", "a", "b"]},
            "q05": {"frequency": "weekly", "hours": 2.5, "note": ""}
        });
        let result = reconcile(&phase(), &map(canonical.clone()));
        assert!(result.is_clean(), "{:?}", result.needs_review);
        assert_eq!(result.responses.to_value(), canonical);
    }

    #[test]
    fn detects_import_sources() {
        assert!(matches!(
            ImportSource::detect("{\"q01\": {\"text\": \"x\"}}").unwrap(),
            ImportSource::Answers(_)
        ));
        assert!(matches!(
            ImportSource::detect("Q1 [q01] Title\nA: yes").unwrap(),
            ImportSource::Text(_)
        ));
        assert!(matches!(
            ImportSource::detect("[1, 2]"),
            Err(ImportError::NotAnObject("array"))
        ));
        assert!(matches!(ImportSource::detect("  "), Err(ImportError::Empty)));
    }

    #[test]
    fn text_import_end_to_end() {
        let text = "Q1 [q01] Safe\nA: Mostly safe\n\nQ2 [q02] Topics\nA:\n- Money\n- Household chores\n";
        let result = import(&phase(), text).unwrap();
        assert!(result.is_clean());
        assert_eq!(
            result.responses.get("q01"),
            Some(&Response::SingleSelect(Selection::new("mostly")))
        );
    }
}
