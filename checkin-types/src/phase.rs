use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Question, QuestionId, SchemaError};

/// File name of the manifest document inside a phase directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the questions document inside a phase directory.
pub const QUESTIONS_FILE: &str = "questions.json";

/// Which named manifest drives the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Lite,
    Full,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Lite, Mode::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lite => "lite",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lite" => Ok(Self::Lite),
            "full" => Ok(Self::Full),
            _ => Err(SchemaError::UnknownMode(s.to_string())),
        }
    }
}

/// A named, ordered list of question ids defining one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

impl Manifest {
    pub fn new(question_ids: Vec<QuestionId>) -> Self {
        Self { question_ids }
    }

    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.question_ids.iter().position(|q| q.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }
}

/// A titled group of questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            question_ids: Vec::new(),
        }
    }
}

/// Display metadata for a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDisplay {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// Intro text shown before the first question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intro {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The `manifest.json` document of a phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub schema_version: String,

    pub display: PhaseDisplay,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<Intro>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manifests: BTreeMap<String, Manifest>,
}

/// The `questions.json` document of a phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionsDocument {
    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub questions: BTreeMap<QuestionId, Question>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manifests: BTreeMap<String, Manifest>,
}

/// Everything needed to run one phase: metadata, sections, questions and manifests.
///
/// Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseDefinition {
    display: PhaseDisplay,
    intro: Option<Intro>,
    sections: Vec<Section>,
    questions: BTreeMap<QuestionId, Question>,
    manifests: BTreeMap<String, Manifest>,
}

impl PhaseDefinition {
    /// Create an empty phase definition.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            display: PhaseDisplay {
                id: id.into(),
                title: title.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Combine the two documents. Manifests come from the manifest document,
    /// falling back to the questions document.
    pub fn from_documents(manifest: ManifestDocument, questions: QuestionsDocument) -> Self {
        let manifests = if manifest.manifests.is_empty() {
            questions.manifests
        } else {
            manifest.manifests
        };

        let mut map = questions.questions;
        for (id, question) in map.iter_mut() {
            question.set_id_if_missing(id);
        }

        Self {
            display: manifest.display,
            intro: manifest.intro,
            sections: questions.sections,
            questions: map,
            manifests,
        }
    }

    /// Parse both documents from JSON text.
    pub fn from_json_str(manifest: &str, questions: &str) -> Result<Self, SchemaError> {
        let manifest: ManifestDocument =
            serde_json::from_str(manifest).map_err(|source| SchemaError::Json {
                document: MANIFEST_FILE.to_string(),
                source,
            })?;
        let questions: QuestionsDocument =
            serde_json::from_str(questions).map_err(|source| SchemaError::Json {
                document: QUESTIONS_FILE.to_string(),
                source,
            })?;
        Ok(Self::from_documents(manifest, questions))
    }

    /// Load a phase directory containing `manifest.json` and `questions.json`.
    pub fn load(dir: &Path) -> Result<Self, SchemaError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| SchemaError::Io { path, source })
        };
        let manifest = read(MANIFEST_FILE)?;
        let questions = read(QUESTIONS_FILE)?;
        let definition = Self::from_json_str(&manifest, &questions)?;
        tracing::debug!(
            phase = %definition.id(),
            questions = definition.questions.len(),
            "loaded phase definition"
        );
        Ok(definition)
    }

    /// Add a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Add a question, registering it in its section when that section exists.
    pub fn with_question(mut self, question: Question) -> Self {
        if let Some(section) = self
            .sections
            .iter_mut()
            .find(|s| s.id == question.section_id())
            && !section.question_ids.contains(question.id())
        {
            section.question_ids.push(question.id().clone());
        }
        self.questions.insert(question.id().clone(), question);
        self
    }

    /// Define the manifest for `mode`.
    pub fn with_manifest(mut self, mode: Mode, ids: &[&str]) -> Self {
        self.manifests.insert(
            mode.as_str().to_string(),
            Manifest::new(ids.iter().map(|id| QuestionId::new(*id)).collect()),
        );
        self
    }

    /// Set the intro text.
    pub fn with_intro(mut self, intro: Intro) -> Self {
        self.intro = Some(intro);
        self
    }

    /// The phase id, used to namespace persisted state.
    pub fn id(&self) -> &str {
        &self.display.id
    }

    pub fn title(&self) -> &str {
        &self.display.title
    }

    pub fn display(&self) -> &PhaseDisplay {
        &self.display
    }

    pub fn intro(&self) -> Option<&Intro> {
        self.intro.as_ref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.questions.contains_key(id)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Get the manifest for `mode`.
    pub fn manifest(&self, mode: Mode) -> Result<&Manifest, SchemaError> {
        self.manifests
            .get(mode.as_str())
            .ok_or_else(|| SchemaError::ManifestNotFound(mode.as_str().to_string()))
    }

    /// All manifests by name.
    pub fn manifests(&self) -> &BTreeMap<String, Manifest> {
        &self.manifests
    }
}
