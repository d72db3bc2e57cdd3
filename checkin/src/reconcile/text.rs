//! Recover provisional answers from the human-readable text export.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{FieldKind, FieldValue, QuestionId, QuestionKind};

static QUESTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Q(\d+)[.:)]?\s*\[([^\]\s]+)\]").expect("regex for question markers")
});

static ANSWER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*A:\s?(.*)$").expect("regex for answer markers"));

static SECTION_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:={3,}|-{3,})").expect("regex for section breaks"));

static RANK_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*[.)]\s*").expect("regex for rank prefixes"));

/// Indent written before answer lines that would otherwise read as markers.
pub(crate) const ESCAPE: &str = "  ";

const SKIPPED: &str = "(skipped)";
const NO_ANSWER: &str = "(no answer)";

/// What a text block says about its question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Answered,
    Skipped,
    NoAnswer,
}

/// One question's block in a text export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub question_id: QuestionId,
    /// The `n` of the `Q<n>` marker.
    pub number: u32,
    /// Lines following the answer marker, the marker line's remainder first.
    pub lines: Vec<String>,
    pub status: BlockStatus,
}

impl TextBlock {
    /// The answer lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }
}

struct Pending {
    question_id: QuestionId,
    number: u32,
    in_answer: bool,
    lines: Vec<String>,
}

impl Pending {
    fn finish(mut self) -> TextBlock {
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.lines.pop();
        }
        let first_content = self.lines.iter().position(|l| !l.trim().is_empty());
        self.lines.drain(..first_content.unwrap_or(self.lines.len()));

        let status = match self.lines.as_slice() {
            [] => BlockStatus::NoAnswer,
            [only] if only.trim() == SKIPPED => BlockStatus::Skipped,
            [only] if only.trim() == NO_ANSWER => BlockStatus::NoAnswer,
            _ => BlockStatus::Answered,
        };
        if status != BlockStatus::Answered {
            self.lines.clear();
        }
        TextBlock {
            question_id: self.question_id,
            number: self.number,
            lines: self.lines,
            status,
        }
    }
}

/// Check whether `line` would start a block or end one.
///
/// Markers only count at the start of a line. The export indents answer
/// lines for which this holds.
pub(crate) fn starts_block(line: &str) -> bool {
    QUESTION_MARKER.is_match(line) || SECTION_BREAK.is_match(line)
}

/// Split a text export into per-question blocks.
///
/// A block starts at a `Q<n> [<id>]` marker at the start of a line. Lines up to the `A:` marker
/// (title and prompt) are ignored; everything after it belongs to the answer,
/// which may span several lines. Collection stops at the next question marker
/// or at a `===`/`---` section break.
pub fn parse_text_export(text: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<Pending> = None;

    for line in text.lines() {
        if let Some(caps) = QUESTION_MARKER.captures(line) {
            blocks.extend(current.take().map(Pending::finish));
            current = Some(Pending {
                question_id: QuestionId::new(&caps[2]),
                number: caps[1].parse().unwrap_or(0),
                in_answer: false,
                lines: Vec::new(),
            });
            continue;
        }
        if SECTION_BREAK.is_match(line) {
            blocks.extend(current.take().map(Pending::finish));
            continue;
        }
        let Some(block) = current.as_mut() else {
            continue;
        };
        if block.in_answer {
            block.lines.push(line.trim_end().to_string());
        } else if let Some(caps) = ANSWER_MARKER.captures(line) {
            block.in_answer = true;
            block.lines.push(caps[1].trim_end().to_string());
        }
    }
    blocks.extend(current.take().map(Pending::finish));

    tracing::debug!(blocks = blocks.len(), "parsed text export");
    blocks
}

/// Turn a text block into a raw answer shaped for `kind`.
///
/// Values are still labels at this point; reconciliation maps them to
/// option values. Returns `None` for skipped and unanswered blocks.
pub fn raw_answer(kind: &QuestionKind, block: &TextBlock) -> Option<Value> {
    if block.status != BlockStatus::Answered {
        return None;
    }
    let mut object = Map::new();
    match kind {
        QuestionKind::SingleSelect(_) => {
            let parsed = ParsedSelect::from_lines(&block.lines);
            let selected = parsed.items.into_iter().next().unwrap_or_default();
            object.insert("selected_value".into(), Value::String(selected));
            parsed.extras.write(&mut object);
        }
        QuestionKind::MultiSelect(_) => {
            let parsed = ParsedSelect::from_lines(&block.lines);
            object.insert("selected_values".into(), string_array(parsed.items));
            parsed.extras.write(&mut object);
        }
        QuestionKind::RankedSelect(ranked) => {
            let parsed = ParsedSelect::from_lines(&block.lines);
            object.insert(ranked.answer_key().into(), string_array(parsed.items));
        }
        QuestionKind::FreeText(_) => {
            let text = block
                .lines
                .iter()
                .map(|line| {
                    line.strip_prefix(ESCAPE)
                        .filter(|rest| starts_block(rest))
                        .unwrap_or(line.as_str())
                })
                .collect::<Vec<_>>()
                .join("\n");
            object.insert("text".into(), Value::String(text.trim().to_string()));
        }
        QuestionKind::Compound(compound) => {
            for line in &block.lines {
                let Some((label, value)) = line.trim().split_once(':') else {
                    continue;
                };
                let (label, value) = (label.trim(), value.trim());
                let field = compound.fields.iter().find(|f| {
                    f.display_label().eq_ignore_ascii_case(label) || f.key.eq_ignore_ascii_case(label)
                });
                match field {
                    Some(field) => {
                        let value = field_value(&field.kind, value);
                        object.insert(field.key.clone(), serde_json::to_value(value).ok()?);
                    }
                    None => {
                        object.insert(label.to_string(), Value::String(value.to_string()));
                    }
                }
            }
        }
    }
    Some(Value::Object(object))
}

fn field_value(kind: &FieldKind, text: &str) -> FieldValue {
    match kind {
        FieldKind::MultiSelect(_) | FieldKind::RankedSelect(_) => FieldValue::List(split_list(text)),
        FieldKind::Number(_) => text
            .parse::<f64>()
            .map(FieldValue::Number)
            .unwrap_or_else(|_| FieldValue::Text(text.to_string())),
        FieldKind::SingleSelect(_) | FieldKind::FreeText => FieldValue::Text(text.to_string()),
    }
}

/// Split a `; `-joined list, dropping empty items.
pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn string_array(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

#[derive(Default)]
struct Extras {
    other_text: Option<String>,
    notes: Option<String>,
}

impl Extras {
    fn write(self, object: &mut Map<String, Value>) {
        if let Some(other) = self.other_text {
            object.insert("other_text".into(), Value::String(other));
        }
        if let Some(notes) = self.notes {
            object.insert("notes".into(), Value::String(notes));
        }
    }
}

struct ParsedSelect {
    items: Vec<String>,
    extras: Extras,
}

impl ParsedSelect {
    fn from_lines(lines: &[String]) -> Self {
        let mut items = Vec::new();
        let mut extras = Extras::default();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = strip_prefix_ci(line, "other:") {
                extras.other_text = Some(rest.trim().to_string());
            } else if let Some(rest) = strip_prefix_ci(line, "notes:") {
                extras.notes = Some(rest.trim().to_string());
            } else if let Some(rest) = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("\u{2022} "))
            {
                items.push(rest.trim().to_string());
            } else if let Some(m) = RANK_PREFIX.find(line) {
                items.push(line[m.end()..].trim().to_string());
            } else {
                items.extend(split_list(line));
            }
        }
        Self { items, extras }
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        CompoundQuestion, Field, FreeTextQuestion, MultiSelectQuestion, NumberField,
        RankedSelectQuestion, SingleSelectQuestion,
    };

    const EXPORT: &str = "\
Check-in export: Getting Started
Mode: lite
Answered: 2/3

=== Safety ===

Q1 [q01] Feeling safe
Do you feel safe talking about hard things?
A: Yes, completely
Notes: most days

Q2 [q02] Topics
Which topics come up?
A:
- Money
- Chores
Other: the in-laws

=== Reflection ===

Q3 [q03] In your words
Describe a recent good moment.
A: We cooked dinner together.
It was calm.

Q4 [q04] Skipped one
Prompt.
A: (skipped)
";

    #[test]
    fn splits_blocks_at_markers() {
        let blocks = parse_text_export(EXPORT);
        let ids: Vec<&str> = blocks.iter().map(|b| b.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q01", "q02", "q03", "q04"]);
        assert_eq!(blocks[1].number, 2);
    }

    #[test]
    fn multi_line_answers_stop_at_next_marker() {
        let blocks = parse_text_export(EXPORT);
        assert_eq!(blocks[2].text(), "We cooked dinner together.\nIt was calm.");
        assert_eq!(blocks[3].status, BlockStatus::Skipped);
    }

    #[test]
    fn section_break_ends_a_block() {
        let text = "Q1 [q01] T\nA: first\n---\nfooter text";
        let blocks = parse_text_export(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "first");
    }

    #[test]
    fn indented_break_stays_in_the_answer() {
        let text = "Q1 [q01] T\nA: before\n  ---\n  Q2 [q02] not a marker\nafter\n";
        let blocks = parse_text_export(text);
        assert_eq!(blocks.len(), 1);

        let kind = QuestionKind::FreeText(FreeTextQuestion::new());
        assert_eq!(
            raw_answer(&kind, &blocks[0]).unwrap(),
            json!({"text": "before\n---\nQ2 [q02] not a marker\nafter"})
        );
    }

    #[test]
    fn block_without_answer_marker_is_unanswered() {
        let blocks = parse_text_export("Q7 [q07] Title only\nSome prompt\n");
        assert_eq!(blocks[0].status, BlockStatus::NoAnswer);
    }

    #[test]
    fn single_select_with_notes() {
        let blocks = parse_text_export(EXPORT);
        let kind = QuestionKind::SingleSelect(SingleSelectQuestion::default());
        assert_eq!(
            raw_answer(&kind, &blocks[0]).unwrap(),
            json!({"selected_value": "Yes, completely", "notes": "most days"})
        );
    }

    #[test]
    fn multi_select_bullets_and_other() {
        let blocks = parse_text_export(EXPORT);
        let kind = QuestionKind::MultiSelect(MultiSelectQuestion::default());
        assert_eq!(
            raw_answer(&kind, &blocks[1]).unwrap(),
            json!({"selected_values": ["Money", "Chores"], "other_text": "the in-laws"})
        );
    }

    #[test]
    fn ranked_numbered_lines() {
        let text = "Q5 [q05] Rank\nA:\n1. Time together\n2) Money\n3. Sleep\n";
        let blocks = parse_text_export(text);
        let kind = QuestionKind::RankedSelect(RankedSelectQuestion::default().with_key("priorities"));
        assert_eq!(
            raw_answer(&kind, &blocks[0]).unwrap(),
            json!({"priorities": ["Time together", "Money", "Sleep"]})
        );
    }

    #[test]
    fn compound_label_lines() {
        let text = "Q6 [q06] Habits\nA:\n  How often: Weekly\n  Topics: Money; Chores\n  Hours: 2.5\n  Mystery: ?\n";
        let blocks = parse_text_export(text);
        let kind = QuestionKind::Compound(CompoundQuestion::new(vec![
            Field::new(
                "often",
                "How often",
                FieldKind::SingleSelect(SingleSelectQuestion::default()),
            ),
            Field::new(
                "topics",
                "Topics",
                FieldKind::MultiSelect(MultiSelectQuestion::default()),
            ),
            Field::new("hours", "Hours", FieldKind::Number(NumberField::default())),
        ]));
        assert_eq!(
            raw_answer(&kind, &blocks[0]).unwrap(),
            json!({
                "often": "Weekly",
                "topics": ["Money", "Chores"],
                "hours": 2.5,
                "Mystery": "?"
            })
        );
    }

    #[test]
    fn skipped_block_has_no_raw_answer() {
        let blocks = parse_text_export(EXPORT);
        let kind = QuestionKind::FreeText(FreeTextQuestion::new());
        assert!(raw_answer(&kind, &blocks[3]).is_none());
    }
}
