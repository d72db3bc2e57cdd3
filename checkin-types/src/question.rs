use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FieldValue, QuestionId, Response};

/// The option value that asks the respondent to elaborate in free text.
pub const OTHER_VALUE: &str = "other";

/// Answer key used by top-level ranked questions that do not declare one.
pub const DEFAULT_RANKED_KEY: &str = "ranked";

/// A single question in a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique id, e.g. `"q01"`. Filled from the map key when omitted.
    #[serde(default = "empty_id")]
    id: QuestionId,

    /// The section this question belongs to.
    #[serde(default)]
    section_id: String,

    /// Position of the question in authoring order.
    #[serde(default)]
    order: u32,

    /// Short title shown above the prompt.
    #[serde(default)]
    title: String,

    /// The prompt text shown to the respondent.
    #[serde(default)]
    prompt: String,

    /// The kind of question (determines options, fields and answer shape).
    #[serde(flatten)]
    kind: QuestionKind,

    /// Example answers, shown as hints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    examples: Vec<String>,
}

fn empty_id() -> QuestionId {
    QuestionId::new("")
}

impl Question {
    /// Create a new question.
    pub fn new(
        id: impl Into<QuestionId>,
        section_id: impl Into<String>,
        order: u32,
        title: impl Into<String>,
        kind: QuestionKind,
    ) -> Self {
        Self {
            id: id.into(),
            section_id: section_id.into(),
            order,
            title: title.into(),
            prompt: String::new(),
            kind,
            examples: Vec::new(),
        }
    }

    /// Set the prompt text.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Add example answers.
    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    pub(crate) fn set_id_if_missing(&mut self, id: &QuestionId) {
        if self.id.is_empty() {
            self.id = id.clone();
        }
    }

    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Check whether `response` counts as an answer to this question.
    ///
    /// Emptiness is type-specific. A compound question is answered when any
    /// visible required field is filled; when it has no visible required
    /// fields, when any visible field is filled.
    pub fn is_answered(&self, response: &Response) -> bool {
        match (&self.kind, response) {
            (QuestionKind::Compound(compound), Response::Compound(values)) => {
                compound.is_answered(values)
            }
            (_, response) => response.has_content(),
        }
    }
}

/// The kind of question, determining answer shape and available options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Choose exactly one option.
    SingleSelect(SingleSelectQuestion),

    /// Choose any number of options, optionally bounded.
    MultiSelect(MultiSelectQuestion),

    /// Choose an ordered subset of options (rank = position).
    RankedSelect(RankedSelectQuestion),

    /// Free-form text.
    FreeText(FreeTextQuestion),

    /// A group of typed fields, each keyed by its own `key`.
    Compound(CompoundQuestion),
}

impl QuestionKind {
    /// The `type` discriminant as it appears in the questions document.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SingleSelect(_) => "single_select",
            Self::MultiSelect(_) => "multi_select",
            Self::RankedSelect(_) => "ranked_select",
            Self::FreeText(_) => "free_text",
            Self::Compound(_) => "compound",
        }
    }

    /// The options of a select-type question (empty for text and compound).
    pub fn options(&self) -> &[SelectOption] {
        match self {
            Self::SingleSelect(q) => &q.options,
            Self::MultiSelect(q) => &q.options,
            Self::RankedSelect(q) => &q.options,
            Self::FreeText(_) | Self::Compound(_) => &[],
        }
    }

    /// Check if this is a select kind (single, multi or ranked).
    pub fn is_select(&self) -> bool {
        matches!(
            self,
            Self::SingleSelect(_) | Self::MultiSelect(_) | Self::RankedSelect(_)
        )
    }
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Stored value, e.g. `"yes"`.
    pub value: String,

    /// Label shown to the respondent, e.g. `"Yes, completely safe"`.
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Check if this is the "other" sentinel that requires free-text elaboration.
    pub fn is_other(&self) -> bool {
        self.value == OTHER_VALUE
    }
}

/// Look up the label of `value`, falling back to the value itself.
pub fn label_for<'a>(options: &'a [SelectOption], value: &'a str) -> &'a str {
    options
        .iter()
        .find(|opt| opt.value == value)
        .map(|opt| opt.label.as_str())
        .unwrap_or(value)
}

/// Selection-count limits as written in the original `validation` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_selected: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selected: Option<usize>,
}

impl SelectionLimits {
    fn is_empty(&self) -> bool {
        self.min_selected.is_none() && self.max_selected.is_none()
    }
}

/// Configuration for a single-select question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleSelectQuestion {
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl SingleSelectQuestion {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }

    /// Check if one of the options is the "other" sentinel.
    pub fn allows_other(&self) -> bool {
        self.options.iter().any(SelectOption::is_other)
    }
}

/// Configuration for a multi-select question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiSelectQuestion {
    #[serde(default)]
    pub options: Vec<SelectOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,

    #[serde(default, skip_serializing_if = "SelectionLimits::is_empty")]
    pub validation: SelectionLimits,
}

impl MultiSelectQuestion {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Set cardinality bounds.
    pub fn with_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn min_selected(&self) -> Option<usize> {
        self.min.or(self.validation.min_selected)
    }

    pub fn max_selected(&self) -> Option<usize> {
        self.max.or(self.validation.max_selected)
    }

    pub fn allows_other(&self) -> bool {
        self.options.iter().any(SelectOption::is_other)
    }
}

/// Configuration for a ranked-select question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedSelectQuestion {
    #[serde(default)]
    pub options: Vec<SelectOption>,

    /// Answer key for top-level ranked questions. Compound fields use the field key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,

    #[serde(default, skip_serializing_if = "SelectionLimits::is_empty")]
    pub validation: SelectionLimits,
}

impl RankedSelectQuestion {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Set the answer key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn answer_key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_RANKED_KEY)
    }

    pub fn max_selected(&self) -> Option<usize> {
        self.max.or(self.validation.max_selected)
    }
}

/// Configuration for a free-text question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeTextQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FreeTextQuestion {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Configuration for a numeric compound field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Configuration for a compound question (a group of typed fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompoundQuestion {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl CompoundQuestion {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Get a field by key.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Fields whose `showWhen` predicate holds for the current values.
    pub fn visible_fields<'a>(
        &'a self,
        values: &'a std::collections::BTreeMap<String, FieldValue>,
    ) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.is_visible(values))
    }

    /// Partial-credit completeness for compound answers.
    pub fn is_answered(&self, values: &std::collections::BTreeMap<String, FieldValue>) -> bool {
        let visible: Vec<&Field> = self.visible_fields(values).collect();
        let filled = |f: &&Field| values.get(&f.key).is_some_and(FieldValue::is_filled);

        let required: Vec<&&Field> = visible.iter().filter(|f| !f.optional).collect();
        if required.is_empty() {
            visible.iter().any(filled)
        } else {
            required.into_iter().any(filled)
        }
    }
}

/// A field inside a compound question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Answer key inside the compound response.
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(flatten)]
    pub kind: FieldKind,

    /// Visibility predicate referencing another field of the same question.
    #[serde(default, rename = "showWhen", skip_serializing_if = "Option::is_none")]
    pub show_when: Option<ShowWhen>,

    /// Optional fields are never required for completion.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            show_when: None,
            optional: false,
        }
    }

    /// Show this field only when `condition` holds for `field`.
    pub fn with_show_when(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.show_when = Some(ShowWhen {
            field: field.into(),
            condition,
        });
        self
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Label for display, falling back to the key.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    pub fn is_visible(&self, values: &std::collections::BTreeMap<String, FieldValue>) -> bool {
        match &self.show_when {
            None => true,
            Some(rule) => rule.is_satisfied(values.get(&rule.field)),
        }
    }
}

/// The primitive kind of a compound field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    SingleSelect(SingleSelectQuestion),
    MultiSelect(MultiSelectQuestion),
    RankedSelect(RankedSelectQuestion),
    #[serde(alias = "short_text")]
    FreeText,
    Number(NumberField),
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SingleSelect(_) => "single_select",
            Self::MultiSelect(_) => "multi_select",
            Self::RankedSelect(_) => "ranked_select",
            Self::FreeText => "free_text",
            Self::Number(_) => "number",
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        match self {
            Self::SingleSelect(q) => &q.options,
            Self::MultiSelect(q) => &q.options,
            Self::RankedSelect(q) => &q.options,
            Self::FreeText | Self::Number(_) => &[],
        }
    }

    /// Check if answers of this kind are lists.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::MultiSelect(_) | Self::RankedSelect(_))
    }
}

/// A `showWhen` visibility predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShowWhen", into = "RawShowWhen")]
pub struct ShowWhen {
    /// Key of the field whose value is tested.
    pub field: String,
    pub condition: Condition,
}

/// The test applied by a `ShowWhen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The field's value equals this one.
    Equals(String),
    /// The field's value is one of these.
    In(Vec<String>),
    /// The field's list value contains this one.
    Includes(String),
}

impl ShowWhen {
    pub fn is_satisfied(&self, value: Option<&FieldValue>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match (&self.condition, value) {
            (Condition::Equals(expected), FieldValue::Text(text)) => text == expected,
            (Condition::Equals(expected), FieldValue::Number(n)) => {
                expected.parse::<f64>().is_ok_and(|e| e == *n)
            }
            (Condition::Equals(expected), FieldValue::List(items)) => {
                items.len() == 1 && &items[0] == expected
            }
            (Condition::In(allowed), FieldValue::Text(text)) => allowed.contains(text),
            (Condition::In(allowed), FieldValue::List(items)) => {
                items.iter().any(|item| allowed.contains(item))
            }
            (Condition::In(_), FieldValue::Number(_)) => false,
            (Condition::Includes(needle), FieldValue::List(items)) => items.contains(needle),
            (Condition::Includes(needle), FieldValue::Text(text)) => text == needle,
            (Condition::Includes(_), FieldValue::Number(_)) => false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawShowWhen {
    field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equals: Option<Value>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    includes: Option<Value>,
}

fn scalar_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("showWhen value must be a scalar, got {other}")),
    }
}

impl TryFrom<RawShowWhen> for ShowWhen {
    type Error = String;

    fn try_from(raw: RawShowWhen) -> Result<Self, Self::Error> {
        let condition = match (raw.equals, raw.one_of, raw.includes) {
            (Some(v), None, None) => Condition::Equals(scalar_to_string(v)?),
            (None, Some(vs), None) => Condition::In(
                vs.into_iter()
                    .map(scalar_to_string)
                    .collect::<Result<_, _>>()?,
            ),
            (None, None, Some(v)) => Condition::Includes(scalar_to_string(v)?),
            _ => {
                return Err(format!(
                    "showWhen on '{}' needs exactly one of equals, in, includes",
                    raw.field
                ));
            }
        };
        Ok(Self {
            field: raw.field,
            condition,
        })
    }
}

impl From<ShowWhen> for RawShowWhen {
    fn from(rule: ShowWhen) -> Self {
        let mut raw = RawShowWhen {
            field: rule.field,
            equals: None,
            one_of: None,
            includes: None,
        };
        match rule.condition {
            Condition::Equals(v) => raw.equals = Some(Value::String(v)),
            Condition::In(vs) => raw.one_of = Some(vs.into_iter().map(Value::String).collect()),
            Condition::Includes(v) => raw.includes = Some(Value::String(v)),
        }
        raw
    }
}
