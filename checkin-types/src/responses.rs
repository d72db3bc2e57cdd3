use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{PhaseDefinition, QuestionId, Response};

/// Error type for response decoding and writes.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("Expected answer shape {expected}, got {actual}")]
    Shape {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Question '{0}' does not exist in the current phase")]
    UnknownQuestion(QuestionId),

    #[error("Answer for '{question_id}' is {actual} but the question is {expected}")]
    TypeMismatch {
        question_id: QuestionId,
        expected: &'static str,
        actual: &'static str,
    },
}

/// The response store: one answer per question id.
///
/// Answers for questions the current phase definition does not know (or
/// whose stored shape no longer fits) are retained as raw JSON so that a
/// schema change never destroys data. Retained answers are written back on
/// save but never count towards progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    answers: BTreeMap<QuestionId, Response>,
    retained: BTreeMap<QuestionId, Value>,
}

impl Responses {
    /// Create a new empty response store.
    pub fn new() -> Self {
        Self {
            answers: BTreeMap::new(),
            retained: BTreeMap::new(),
        }
    }

    /// Insert an answer, replacing any previous (or retained) one wholesale.
    pub fn insert(&mut self, id: impl Into<QuestionId>, response: Response) -> Option<Response> {
        let id = id.into();
        self.retained.remove(&id);
        self.answers.insert(id, response)
    }

    /// Keep a raw answer that cannot be decoded against the current schema.
    pub fn retain_raw(&mut self, id: impl Into<QuestionId>, value: Value) {
        let id = id.into();
        if !self.answers.contains_key(&id) {
            self.retained.insert(id, value);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Response> {
        self.answers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.answers.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Response> {
        self.answers.remove(id)
    }

    /// Iterate over decoded answers in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Response)> {
        self.answers.iter()
    }

    /// Raw answers kept for ids the schema cannot decode.
    pub fn retained(&self) -> &BTreeMap<QuestionId, Value> {
        &self.retained
    }

    /// Get the number of decoded answers.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Check if there are no decoded and no retained answers.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.retained.is_empty()
    }

    /// Drop every answer, decoded and retained.
    pub fn clear(&mut self) {
        self.answers.clear();
        self.retained.clear();
    }

    /// Merge another store into this one; `other` wins on conflicts.
    pub fn extend(&mut self, other: Responses) {
        for (id, value) in other.retained {
            if !self.answers.contains_key(&id) {
                self.retained.insert(id, value);
            }
        }
        for (id, response) in other.answers {
            self.insert(id, response);
        }
    }

    /// Check whether `id` has a qualifying answer under the phase's rules.
    pub fn is_answered(&self, definition: &PhaseDefinition, id: &str) -> bool {
        match (definition.question(id), self.answers.get(id)) {
            (Some(question), Some(response)) => question.is_answered(response),
            _ => false,
        }
    }

    /// Decode a persisted store against `definition`.
    ///
    /// Ids unknown to the definition, and answers whose shape does not fit,
    /// are retained raw.
    pub fn from_value(definition: &PhaseDefinition, value: &Value) -> Self {
        let mut responses = Self::new();
        let Value::Object(object) = value else {
            if !value.is_null() {
                tracing::warn!(
                    actual = crate::json_type_name(value),
                    "stored responses are not an object; ignoring"
                );
            }
            return responses;
        };

        for (id, raw) in object {
            let Some(question) = definition.question(id) else {
                responses.retained.insert(QuestionId::new(id), raw.clone());
                continue;
            };
            match Response::from_value(question.kind(), raw) {
                Ok(response) => {
                    responses.answers.insert(QuestionId::new(id), response);
                }
                Err(err) => {
                    tracing::warn!(question = %id, error = %err, "retaining undecodable answer");
                    responses.retained.insert(QuestionId::new(id), raw.clone());
                }
            }
        }
        responses
    }

    /// Encode decoded and retained answers as one JSON object.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        for (id, raw) in &self.retained {
            object.insert(id.to_string(), raw.clone());
        }
        for (id, response) in &self.answers {
            object.insert(id.to_string(), response.to_value());
        }
        Value::Object(object)
    }
}

impl IntoIterator for Responses {
    type Item = (QuestionId, Response);
    type IntoIter = std::collections::btree_map::IntoIter<QuestionId, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.into_iter()
    }
}

impl<'a> IntoIterator for &'a Responses {
    type Item = (&'a QuestionId, &'a Response);
    type IntoIter = std::collections::btree_map::Iter<'a, QuestionId, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}
