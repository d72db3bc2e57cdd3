use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{QuestionKind, ResponseError};

/// An answer to one question.
///
/// The variant is determined by the question's kind. The JSON form is
/// untagged; use [`Response::from_value`] with the question kind to decode it.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `{selected_value, other_text?, notes?}`
    SingleSelect(Selection),

    /// `{selected_values, other_text?, notes?}`
    MultiSelect(MultiSelection),

    /// `{<key>: [value, ...]}`, rank = position.
    Ranked(RankedAnswer),

    /// `{text}`
    FreeText(String),

    /// `{<field_key>: <primitive answer>, ...}`
    Compound(BTreeMap<String, FieldValue>),
}

/// The answer to a single-select question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub selected_value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Selection {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            selected_value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_other_text(mut self, text: impl Into<String>) -> Self {
        self.other_text = Some(text.into());
        self
    }
}

/// The answer to a multi-select question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSelection {
    #[serde(default)]
    pub selected_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MultiSelection {
    pub fn new(values: Vec<String>) -> Self {
        Self {
            selected_values: values,
            ..Default::default()
        }
    }
}

/// The answer to a top-level ranked question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAnswer {
    /// The answer key the list is stored under.
    pub key: String,

    /// Selected option values, most important first.
    pub values: Vec<String>,
}

/// The answer to one compound field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text fields and single-select fields.
    Text(String),

    /// Multi-select and ranked fields.
    List(Vec<String>),

    /// Number fields.
    Number(f64),
}

impl FieldValue {
    /// Check whether this value counts as filled in.
    pub fn is_filled(&self) -> bool {
        match self {
            Self::Text(s) => !s.trim().is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Number(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

#[derive(Serialize, Deserialize)]
struct TextAnswer {
    #[serde(default)]
    text: String,
}

/// Short name of a JSON value's type for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Response {
    /// Decode the JSON shape of an answer for a question of `kind`.
    pub fn from_value(kind: &QuestionKind, value: &Value) -> Result<Self, ResponseError> {
        let mismatch = |expected: &'static str| ResponseError::Shape {
            expected,
            actual: json_type_name(value),
        };
        let Value::Object(object) = value else {
            return Err(mismatch("object"));
        };

        match kind {
            QuestionKind::SingleSelect(_) => {
                if !object.contains_key("selected_value") {
                    return Err(mismatch("{selected_value}"));
                }
                serde_json::from_value(value.clone())
                    .map(Self::SingleSelect)
                    .map_err(|_| mismatch("{selected_value}"))
            }
            QuestionKind::MultiSelect(_) => {
                if !object.contains_key("selected_values") {
                    return Err(mismatch("{selected_values}"));
                }
                serde_json::from_value(value.clone())
                    .map(Self::MultiSelect)
                    .map_err(|_| mismatch("{selected_values}"))
            }
            QuestionKind::RankedSelect(ranked) => {
                let key = ranked.answer_key();
                let list = match object.get(key) {
                    Some(list) => list,
                    None => return Err(mismatch("{<key>: [..]}")),
                };
                let values: Vec<String> =
                    serde_json::from_value(list.clone()).map_err(|_| mismatch("{<key>: [..]}"))?;
                Ok(Self::Ranked(RankedAnswer {
                    key: key.to_string(),
                    values,
                }))
            }
            QuestionKind::FreeText(_) => {
                if !object.contains_key("text") {
                    return Err(mismatch("{text}"));
                }
                serde_json::from_value::<TextAnswer>(value.clone())
                    .map(|answer| Self::FreeText(answer.text))
                    .map_err(|_| mismatch("{text}"))
            }
            QuestionKind::Compound(_) => {
                let mut fields = BTreeMap::new();
                for (key, raw) in object {
                    if raw.is_null() {
                        continue;
                    }
                    let field: FieldValue = serde_json::from_value(raw.clone())
                        .map_err(|_| mismatch("{<field_key>: text | [text] | number}"))?;
                    fields.insert(key.clone(), field);
                }
                Ok(Self::Compound(fields))
            }
        }
    }

    /// Encode this answer in its JSON shape.
    pub fn to_value(&self) -> Value {
        match self {
            Self::SingleSelect(selection) => {
                serde_json::to_value(selection).unwrap_or(Value::Null)
            }
            Self::MultiSelect(selection) => {
                serde_json::to_value(selection).unwrap_or(Value::Null)
            }
            Self::Ranked(ranked) => {
                let mut object = Map::new();
                object.insert(
                    ranked.key.clone(),
                    Value::Array(ranked.values.iter().cloned().map(Value::String).collect()),
                );
                Value::Object(object)
            }
            Self::FreeText(text) => {
                let mut object = Map::new();
                object.insert("text".to_string(), Value::String(text.clone()));
                Value::Object(object)
            }
            Self::Compound(fields) => serde_json::to_value(fields).unwrap_or(Value::Null),
        }
    }

    /// Type-specific non-emptiness, without compound visibility rules.
    pub fn has_content(&self) -> bool {
        match self {
            Self::SingleSelect(s) => !s.selected_value.trim().is_empty(),
            Self::MultiSelect(m) => !m.selected_values.is_empty(),
            Self::Ranked(r) => !r.values.is_empty(),
            Self::FreeText(text) => !text.trim().is_empty(),
            Self::Compound(fields) => fields.values().any(FieldValue::is_filled),
        }
    }

    /// Check whether anything was entered at all.
    ///
    /// Unlike [`Response::has_content`], a select answer with no option but
    /// with `other_text` or `notes` counts. Imports store unmatched text
    /// this way.
    pub fn has_entry(&self) -> bool {
        let filled = |text: &Option<String>| text.as_deref().is_some_and(|t| !t.trim().is_empty());
        self.has_content()
            || match self {
                Self::SingleSelect(s) => filled(&s.other_text) || filled(&s.notes),
                Self::MultiSelect(m) => filled(&m.other_text) || filled(&m.notes),
                _ => false,
            }
    }

    /// Get the type name of this response for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SingleSelect(_) => "single_select",
            Self::MultiSelect(_) => "multi_select",
            Self::Ranked(_) => "ranked_select",
            Self::FreeText(_) => "free_text",
            Self::Compound(_) => "compound",
        }
    }

    /// Check whether this response has the shape expected for `kind`.
    pub fn fits(&self, kind: &QuestionKind) -> bool {
        self.type_name() == kind.type_name()
    }
}

impl From<Selection> for Response {
    fn from(selection: Selection) -> Self {
        Self::SingleSelect(selection)
    }
}

impl From<MultiSelection> for Response {
    fn from(selection: MultiSelection) -> Self {
        Self::MultiSelect(selection)
    }
}
