use super::{Export, ItemStatus, answer_lines};

impl Export<'_> {
    /// Render the manifest as plain text.
    ///
    /// Each question becomes a block opened by `Q<n> [<id>] <title>`, where
    /// `n` is the question's position in the manifest. Blocks are grouped
    /// under `=== <section> ===` headings whenever the section changes.
    pub fn to_text(&self) -> String {
        let stats = self.stats();
        let display = self.definition.display();
        let title = if display.title.is_empty() {
            self.definition.id()
        } else {
            display.title.as_str()
        };

        let mut out = String::new();
        out.push_str(&format!("Check-in: {} [{}]\n", title, self.definition.id()));
        out.push_str(&format!("Mode: {}\n", self.mode));
        out.push_str(&format!("Answered: {}/{}\n", stats.answered, stats.total));

        let mut section: Option<&str> = None;
        for (number, question) in self.entries() {
            if section != Some(question.section_id()) {
                section = Some(question.section_id());
                let heading = self.section_title(question);
                let heading = if heading.is_empty() {
                    question.section_id()
                } else {
                    heading
                };
                out.push_str(&format!("\n=== {heading} ===\n"));
            }

            out.push_str(&format!("\nQ{} [{}] {}\n", number, question.id(), question.title()));
            if !question.prompt().trim().is_empty() {
                out.push_str(&format!("{}\n", question.prompt().trim()));
            }

            let response = self
                .responses
                .get(question.id().as_str())
                .filter(|r| r.has_entry());
            match response {
                Some(response) => {
                    let lines = answer_lines(question, response);
                    let (first, rest) = lines.split_first().map_or(("", &[][..]), |(f, r)| {
                        (f.as_str(), r)
                    });
                    if first.is_empty() {
                        out.push_str("A:\n");
                    } else {
                        out.push_str(&format!("A: {first}\n"));
                    }
                    for line in rest {
                        out.push_str(&format!("{line}\n"));
                    }
                }
                None => {
                    let marker = match self.status(question) {
                        ItemStatus::Skipped => "(skipped)",
                        _ => "(no answer)",
                    };
                    out.push_str(&format!("A: {marker}\n"));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::reconcile::{BlockStatus, parse_text_export};
    use crate::{
        FreeTextQuestion, Mode, MultiSelectQuestion, MultiSelection, PhaseDefinition, Question,
        QuestionId, QuestionKind, Response, Responses, Section, SelectOption, Selection,
        SingleSelectQuestion,
    };

    use super::Export;

    fn phase() -> PhaseDefinition {
        let feelings = vec![
            SelectOption::new("yes", "Yes"),
            SelectOption::new("no", "No"),
        ];
        let topics = vec![
            SelectOption::new("money", "Money"),
            SelectOption::new("chores", "Chores"),
        ];
        PhaseDefinition::new("phase_0", "Getting Started")
            .with_section(Section::new("safety", "Safety"))
            .with_section(Section::new("words", "In your words"))
            .with_question(
                Question::new(
                    "q01",
                    "safety",
                    1,
                    "Feeling safe",
                    QuestionKind::SingleSelect(SingleSelectQuestion::new(feelings)),
                )
                .with_prompt("Do you feel safe?"),
            )
            .with_question(Question::new(
                "q02",
                "safety",
                2,
                "Topics",
                QuestionKind::MultiSelect(MultiSelectQuestion::new(topics)),
            ))
            .with_question(Question::new(
                "q03",
                "words",
                3,
                "A good moment",
                QuestionKind::FreeText(FreeTextQuestion::new()),
            ))
            .with_manifest(Mode::Lite, &["q01", "q02", "q03"])
    }

    #[test]
    fn renders_sections_and_answers() {
        let definition = phase();
        let mut responses = Responses::new();
        responses.insert("q01", Response::SingleSelect(Selection::new("yes")));
        responses.insert(
            "q02",
            Response::MultiSelect(MultiSelection::new(vec!["money".into(), "chores".into()])),
        );

        let text = Export::new(&definition, &responses, Mode::Lite)
            .unwrap()
            .to_text();

        assert!(text.starts_with("Check-in: Getting Started [phase_0]\nMode: lite\nAnswered: 2/3\n"));
        assert!(text.contains("=== Safety ===\n\nQ1 [q01] Feeling safe\nDo you feel safe?\nA: Yes\n"));
        assert!(text.contains("Q2 [q02] Topics\nA:\n- Money\n- Chores\n"));
        assert!(text.contains("=== In your words ===\n\nQ3 [q03] A good moment\nA: (no answer)\n"));
    }

    #[test]
    fn skipped_questions_are_marked() {
        let definition = phase();
        let responses = Responses::new();
        let skipped: BTreeSet<QuestionId> = [QuestionId::new("q03")].into_iter().collect();

        let text = Export::new(&definition, &responses, Mode::Lite)
            .unwrap()
            .with_skipped(skipped)
            .to_text();

        let blocks = parse_text_export(&text);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].status, BlockStatus::NoAnswer);
        assert_eq!(blocks[2].status, BlockStatus::Skipped);
    }

    #[test]
    fn multi_line_free_text_survives_parsing() {
        let definition = phase();
        let mut responses = Responses::new();
        responses.insert("q03", Response::FreeText("We cooked.\nIt was calm.".into()));

        let text = Export::new(&definition, &responses, Mode::Lite)
            .unwrap()
            .to_text();

        let blocks = parse_text_export(&text);
        assert_eq!(blocks[2].text(), "We cooked.\nIt was calm.");
    }
}
