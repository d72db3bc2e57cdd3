use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    Manifest, Mode, PhaseDefinition, PhaseStorage, Question, QuestionId, Response, ResponseError,
    Responses, SessionStore, TraversalError,
};

/// Where a questionnaire is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    /// `init` has not been called.
    NotStarted,
    /// A manifest is active.
    InProgress,
    /// `next` or `skip` was invoked at the last index.
    Complete,
}

/// Progress over the active manifest.
///
/// `answered + skipped + unanswered == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub answered: usize,
    pub skipped: usize,
    pub unanswered: usize,
    pub total: usize,
}

impl Stats {
    /// Count answered, skipped and unanswered ids of `manifest`.
    ///
    /// An answered id is never counted as skipped.
    pub fn compute(
        definition: &PhaseDefinition,
        responses: &Responses,
        manifest: &Manifest,
        skipped: &BTreeSet<QuestionId>,
    ) -> Self {
        let mut stats = Stats {
            total: manifest.len(),
            ..Default::default()
        };
        for id in manifest.question_ids() {
            if responses.is_answered(definition, id.as_str()) {
                stats.answered += 1;
            } else if skipped.contains(id) {
                stats.skipped += 1;
            } else {
                stats.unanswered += 1;
            }
        }
        stats
    }
}

/// How a mode switch relates the old and new manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchDirection {
    /// `lite` to `full`.
    Upgrade,
    /// `full` to `lite`.
    Downgrade,
    /// The target mode was already active.
    Unchanged,
    /// No mode was active or stored before.
    Fresh,
}

/// Result of [`Questionnaire::init_with_upgrade`].
///
/// This is the only channel through which a front end learns what the switch
/// did; the engine itself shows nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeSwitch {
    pub previous: Option<Mode>,
    pub mode: Mode,
    pub direction: SwitchDirection,
    pub answered_count: usize,
    pub unanswered_count: usize,
    pub new_question_count: usize,
    pub start_index: usize,
}

#[derive(Debug)]
struct Session {
    mode: Mode,
    manifest: Manifest,
    cursor: usize,
    skipped: BTreeSet<QuestionId>,
    complete: bool,
}

/// The traversal engine for one phase.
///
/// Owns the phase definition, the response store and the session state, and
/// exposes navigation as a small set of operations. Every mutation is
/// persisted through [`PhaseStorage`] right away.
#[derive(Debug)]
pub struct Questionnaire<S> {
    definition: PhaseDefinition,
    storage: PhaseStorage<S>,
    responses: Responses,
    session: Option<Session>,
}

impl<S: SessionStore> Questionnaire<S> {
    /// Create a questionnaire and load any stored responses for the phase.
    pub fn new(definition: PhaseDefinition, store: S) -> Self {
        let storage = PhaseStorage::new(definition.id(), store);
        let responses = storage.load_responses(&definition);
        Self {
            definition,
            storage,
            responses,
            session: None,
        }
    }

    /// Activate the manifest for `mode`, restoring its saved cursor and skip set.
    ///
    /// Fails only when the manifest does not exist; nothing is changed then.
    pub fn init(&mut self, mode: Mode) -> Result<(), TraversalError> {
        let manifest = self.definition.manifest(mode)?.clone();
        let cursor = self
            .storage
            .load_cursor(mode)
            .map(|c| c.min(manifest.len().saturating_sub(1)))
            .unwrap_or(0);
        let skipped = self.storage.load_skipped(mode);

        tracing::debug!(phase = %self.definition.id(), %mode, cursor, "init");
        self.session = Some(Session {
            mode,
            manifest,
            cursor,
            skipped,
            complete: false,
        });
        self.storage.save_mode(mode);
        Ok(())
    }

    /// Resume the stored mode, or `lite` when none was stored.
    pub fn resume(&mut self) -> Result<Mode, TraversalError> {
        let mode = self.storage.load_mode().unwrap_or(Mode::Lite);
        self.init(mode)?;
        Ok(mode)
    }

    /// Switch to `mode`, keeping every answer and placing the cursor on the
    /// first unanswered question of the new manifest.
    ///
    /// If the target manifest cannot be loaded, returns an error and leaves
    /// all state, in memory and persisted, untouched.
    pub fn init_with_upgrade(&mut self, mode: Mode) -> Result<ModeSwitch, TraversalError> {
        let manifest = self.definition.manifest(mode)?.clone();

        let previous = self
            .session
            .as_ref()
            .map(|s| s.mode)
            .or_else(|| self.storage.load_mode());
        let direction = match previous {
            None => SwitchDirection::Fresh,
            Some(p) if p == mode => SwitchDirection::Unchanged,
            Some(Mode::Lite) => SwitchDirection::Upgrade,
            Some(Mode::Full) => SwitchDirection::Downgrade,
        };

        let answered_count = manifest
            .question_ids()
            .iter()
            .filter(|id| self.responses.is_answered(&self.definition, id.as_str()))
            .count();
        let start_index = first_unanswered(&self.definition, &self.responses, &manifest)
            .and_then(|id| manifest.position(id.as_str()))
            .unwrap_or(0);

        let result = ModeSwitch {
            previous,
            mode,
            direction,
            answered_count,
            unanswered_count: manifest.len() - answered_count,
            new_question_count: manifest.len(),
            start_index,
        };

        let skipped = self.storage.load_skipped(mode);
        self.session = Some(Session {
            mode,
            manifest,
            cursor: start_index,
            skipped,
            complete: false,
        });
        self.storage.save_mode(mode);
        self.storage.save_cursor(mode, start_index);

        tracing::info!(
            phase = %self.definition.id(),
            from = ?previous,
            to = %mode,
            answered = result.answered_count,
            unanswered = result.unanswered_count,
            "switched mode"
        );
        Ok(result)
    }

    /// Advance by one. Returns whether the cursor moved.
    ///
    /// At the last index the questionnaire becomes complete instead.
    pub fn next(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.cursor + 1 < session.manifest.len() {
            session.cursor += 1;
            session.complete = false;
            let (mode, cursor) = (session.mode, session.cursor);
            tracing::debug!(%mode, cursor, "next");
            self.storage.save_cursor(mode, cursor);
            true
        } else {
            let mode = session.mode;
            session.complete = true;
            if self.storage.mark_completed(mode) {
                tracing::info!(phase = %self.definition.id(), %mode, "completed manifest");
            }
            false
        }
    }

    /// Step back by one. Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.complete = false;
        if session.cursor == 0 {
            return false;
        }
        session.cursor -= 1;
        let (mode, cursor) = (session.mode, session.cursor);
        tracing::debug!(%mode, cursor, "previous");
        self.storage.save_cursor(mode, cursor);
        true
    }

    /// Mark the current question skipped, then behave like [`next`](Self::next).
    ///
    /// Returns `false` when this was the last question.
    pub fn skip(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(id) = session.manifest.question_ids().get(session.cursor).cloned() else {
            return false;
        };
        tracing::debug!(question = %id, "skip");
        session.skipped.insert(id);
        let mode = session.mode;
        let skipped = session.skipped.clone();
        self.storage.save_skipped(mode, &skipped);
        self.next()
    }

    /// Move the cursor to `id`. No-op if `id` is not in the active manifest.
    pub fn jump_to(&mut self, id: &str) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(index) = session.manifest.position(id) else {
            tracing::debug!(question = %id, "jump target not in manifest");
            return false;
        };
        session.cursor = index;
        session.complete = false;
        let mode = session.mode;
        self.storage.save_cursor(mode, index);
        true
    }

    /// Write or overwrite the answer for `id`, wholesale.
    ///
    /// The question must exist in the phase and the response must have the
    /// shape of its kind. A qualifying answer clears the skipped mark.
    pub fn save_response(
        &mut self,
        id: impl Into<QuestionId>,
        response: Response,
    ) -> Result<(), TraversalError> {
        let id = id.into();
        let Some(question) = self.definition.question(id.as_str()) else {
            return Err(ResponseError::UnknownQuestion(id).into());
        };
        if !response.fits(question.kind()) {
            return Err(ResponseError::TypeMismatch {
                question_id: id,
                expected: question.kind().type_name(),
                actual: response.type_name(),
            }
            .into());
        }
        let answered = question.is_answered(&response);

        self.responses.insert(id.clone(), response);
        self.storage.save_responses(&self.responses);

        if answered
            && let Some(session) = self.session.as_mut()
            && session.skipped.remove(&id)
        {
            let mode = session.mode;
            let skipped = session.skipped.clone();
            self.storage.save_skipped(mode, &skipped);
        }
        tracing::debug!(question = %id, answered, "saved response");
        Ok(())
    }

    /// Merge imported answers into the store; imported answers win.
    pub fn merge_responses(&mut self, imported: Responses) {
        self.responses.extend(imported);
        self.storage.save_responses(&self.responses);
        if let Some(session) = self.session.as_mut() {
            let before = session.skipped.len();
            session
                .skipped
                .retain(|id| !self.responses.is_answered(&self.definition, id.as_str()));
            if session.skipped.len() != before {
                let mode = session.mode;
                let skipped = session.skipped.clone();
                self.storage.save_skipped(mode, &skipped);
            }
        }
    }

    /// Counts over the active manifest. All zero before `init`.
    ///
    /// Answers for ids outside the manifest, and retained orphans, never count.
    pub fn stats(&self) -> Stats {
        match &self.session {
            Some(session) => Stats::compute(
                &self.definition,
                &self.responses,
                &session.manifest,
                &session.skipped,
            ),
            None => Stats::default(),
        }
    }

    pub fn is_current_answered(&self) -> bool {
        self.current_id()
            .is_some_and(|id| self.responses.is_answered(&self.definition, id.as_str()))
    }

    pub fn is_current_skipped(&self) -> bool {
        match (&self.session, self.current_id()) {
            (Some(session), Some(id)) => {
                session.skipped.contains(id) && !self.is_current_answered()
            }
            _ => false,
        }
    }

    /// The first id of the active manifest without a qualifying answer.
    pub fn find_first_unanswered(&self) -> Option<&QuestionId> {
        let session = self.session.as_ref()?;
        first_unanswered(&self.definition, &self.responses, &session.manifest)
    }

    pub fn state(&self) -> TraversalState {
        match &self.session {
            None => TraversalState::NotStarted,
            Some(s) if s.complete => TraversalState::Complete,
            Some(_) => TraversalState::InProgress,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.session.as_ref().map(|s| s.mode)
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.session.as_ref().map(|s| &s.manifest)
    }

    pub fn cursor(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.cursor)
    }

    /// Check if the cursor sits on the last question.
    pub fn is_last(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.cursor + 1 >= s.manifest.len())
    }

    pub fn current_id(&self) -> Option<&QuestionId> {
        let session = self.session.as_ref()?;
        session.manifest.question_ids().get(session.cursor)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_id()
            .and_then(|id| self.definition.question(id.as_str()))
    }

    pub fn response(&self, id: &str) -> Option<&Response> {
        self.responses.get(id)
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    /// Skipped ids of the active manifest.
    pub fn skipped(&self) -> Option<&BTreeSet<QuestionId>> {
        self.session.as_ref().map(|s| &s.skipped)
    }

    pub fn definition(&self) -> &PhaseDefinition {
        &self.definition
    }

    /// Modes whose manifest was walked to the end at least once.
    pub fn completed_modes(&self) -> BTreeSet<Mode> {
        self.storage.load_completed_modes()
    }

    pub fn storage(&self) -> &PhaseStorage<S> {
        &self.storage
    }

    /// Delete every answer and all session state of this phase.
    pub fn reset(&mut self) {
        self.storage.reset();
        self.responses.clear();
        self.session = None;
    }

    pub fn into_store(self) -> S {
        self.storage.into_inner()
    }
}

fn first_unanswered<'a>(
    definition: &PhaseDefinition,
    responses: &Responses,
    manifest: &'a Manifest,
) -> Option<&'a QuestionId> {
    manifest
        .question_ids()
        .iter()
        .find(|id| !responses.is_answered(definition, id.as_str()))
}
