use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Mode, PhaseDefinition, QuestionId, Responses, SessionStore};

const RESPONSES: &str = "responses";
const MODE: &str = "mode";
const COMPLETED_MODES: &str = "completed_modes";

/// Phase-scoped view of a [`SessionStore`].
///
/// Every key is prefixed with the phase id, so phases never share state.
/// Write failures are logged and swallowed: in-memory state stays correct
/// for the rest of the session even when a write is lost. Blobs that fail
/// to decode are logged and treated as absent.
#[derive(Debug)]
pub struct PhaseStorage<S> {
    phase_id: String,
    store: S,
}

impl<S: SessionStore> PhaseStorage<S> {
    pub fn new(phase_id: impl Into<String>, store: S) -> Self {
        Self {
            phase_id: phase_id.into(),
            store,
        }
    }

    /// The namespaced key for `name`.
    pub fn key(&self, name: &str) -> String {
        format!("{}:{name}", self.phase_id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let key = self.key(name);
        let blob = match self.store.get(&key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(%key, error = %err, "failed to read stored state");
                return None;
            }
        };
        match serde_json::from_str(&blob) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%key, error = %err, "ignoring corrupt stored state");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) {
        let key = self.key(name);
        let result = serde_json::to_string(value)
            .map_err(Into::into)
            .and_then(|blob| self.store.set(&key, &blob));
        if let Err(err) = result {
            tracing::warn!(%key, error = %err, "failed to persist state; continuing in memory");
        }
    }

    fn delete(&mut self, name: &str) {
        let key = self.key(name);
        if let Err(err) = self.store.remove(&key) {
            tracing::warn!(%key, error = %err, "failed to remove stored state");
        }
    }

    pub fn load_responses(&self, definition: &PhaseDefinition) -> Responses {
        self.load::<serde_json::Value>(RESPONSES)
            .map(|value| Responses::from_value(definition, &value))
            .unwrap_or_default()
    }

    pub fn save_responses(&mut self, responses: &Responses) {
        self.save(RESPONSES, &responses.to_value());
    }

    pub fn load_mode(&self) -> Option<Mode> {
        self.load(MODE)
    }

    pub fn save_mode(&mut self, mode: Mode) {
        self.save(MODE, &mode);
    }

    pub fn load_cursor(&self, mode: Mode) -> Option<usize> {
        self.load(&format!("cursor:{mode}"))
    }

    pub fn save_cursor(&mut self, mode: Mode, cursor: usize) {
        self.save(&format!("cursor:{mode}"), &cursor);
    }

    pub fn load_skipped(&self, mode: Mode) -> BTreeSet<QuestionId> {
        self.load(&format!("skipped:{mode}")).unwrap_or_default()
    }

    pub fn save_skipped(&mut self, mode: Mode, skipped: &BTreeSet<QuestionId>) {
        self.save(&format!("skipped:{mode}"), skipped);
    }

    pub fn load_completed_modes(&self) -> BTreeSet<Mode> {
        self.load(COMPLETED_MODES).unwrap_or_default()
    }

    /// Record that `mode` was completed. Returns `false` if it already was.
    pub fn mark_completed(&mut self, mode: Mode) -> bool {
        let mut completed = self.load_completed_modes();
        if !completed.insert(mode) {
            return false;
        }
        self.save(COMPLETED_MODES, &completed);
        true
    }

    /// Delete every key of this phase.
    pub fn reset(&mut self) -> usize {
        let prefix = format!("{}:", self.phase_id);
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(phase = %self.phase_id, error = %err, "failed to list stored state");
                return 0;
            }
        };
        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            let name = &key[prefix.len()..];
            self.delete(name);
            removed += 1;
        }
        tracing::info!(phase = %self.phase_id, removed, "reset phase state");
        removed
    }
}
