//! Integration tests for exporting answers and importing them back.

mod common;

use std::collections::BTreeMap;

use checkin::export::ItemStatus;
use checkin::reconcile::{self, ImportSource, ReviewReason};
use checkin::{
    ExportDocument, FieldValue, MemoryStore, Mode, MultiSelection, Questionnaire, RankedAnswer,
    Response, Selection, SessionStore,
};
use serde_json::json;

fn answered_full() -> Questionnaire<MemoryStore> {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Full).unwrap();

    let mut selection = Selection::new("yes");
    selection.notes = Some("better lately".into());
    questionnaire
        .save_response("q01", Response::SingleSelect(selection))
        .unwrap();

    let mut topics = MultiSelection::new(vec!["money".into(), "other".into()]);
    topics.other_text = Some("in-laws".into());
    questionnaire
        .save_response("q02", Response::MultiSelect(topics))
        .unwrap();

    questionnaire
        .save_response("q03", Response::FreeText("We cooked dinner.\nIt was calm.".into()))
        .unwrap();

    questionnaire
        .save_response(
            "q04",
            Response::Ranked(RankedAnswer {
                key: "priorities".into(),
                values: vec!["rest".into(), "time".into()],
            }),
        )
        .unwrap();

    let mut rhythm = BTreeMap::new();
    rhythm.insert("frequency".to_string(), FieldValue::from("weekly"));
    rhythm.insert("hours".to_string(), FieldValue::Number(2.5));
    rhythm.insert("note".to_string(), FieldValue::from("Sunday evenings"));
    questionnaire
        .save_response("q05", Response::Compound(rhythm))
        .unwrap();

    questionnaire
}

#[test]
fn test_text_export_imports_back_unchanged() {
    let questionnaire = answered_full();
    let text = questionnaire.export().unwrap().to_text();

    assert!(text.contains("Answered: 5/5"));
    assert!(text.contains("A: Yes\u{2014}completely safe\nNotes: better lately\n"));
    assert!(text.contains("A:\n1. Rest\n2. Time together\n"));
    assert!(text.contains("  How often: Weekly\n  Hours: 2.5\n  Note: Sunday evenings\n"));

    let result = reconcile::import(questionnaire.definition(), &text).unwrap();

    assert!(result.is_clean(), "{:?}", result.needs_review);
    assert!(result.unknown_ids.is_empty());
    assert_eq!(
        result.responses.to_value(),
        questionnaire.responses().to_value()
    );
}

#[test]
fn test_json_export_imports_back_unchanged() {
    let questionnaire = answered_full();
    let json = questionnaire.export().unwrap().to_json().unwrap();

    let source = ImportSource::detect(&json).unwrap();
    assert!(matches!(source, ImportSource::Export(_)));

    let result = reconcile::import(questionnaire.definition(), &json).unwrap();
    assert!(result.is_clean(), "{:?}", result.needs_review);
    assert_eq!(
        result.responses.to_value(),
        questionnaire.responses().to_value()
    );
}

#[test]
fn test_json_export_lists_skipped_and_unanswered() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    questionnaire.skip();

    let document: ExportDocument = questionnaire.export().unwrap().to_document();

    assert_eq!(document.mode, Mode::Lite);
    assert_eq!(document.items.len(), 3);
    assert_eq!(document.stats.skipped, 1);
    assert_eq!(document.stats.unanswered, 2);
    assert_eq!(document.items[0].section_title, "Safety");
    assert!(document.items.iter().all(|item| item.answer.is_none()));
}

#[test]
fn test_import_labels_into_a_running_session() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    questionnaire.skip();

    let input = json!({
        "q01": {"selected_value": "Yes\u{2014}completely safe"},
        "q02": {"selected_values": ["Money", "the neighbours"]},
        "q77": {"text": "from an older phase"}
    })
    .to_string();
    let result = reconcile::import(questionnaire.definition(), &input).unwrap();

    assert_eq!(result.needs_review.len(), 1);
    assert_eq!(result.needs_review_ids()[0].as_str(), "q02");
    assert_eq!(result.needs_review[0].reason, ReviewReason::PartiallyMatched);
    assert_eq!(result.unknown_ids.len(), 1);

    questionnaire.merge_responses(result.responses);

    assert_eq!(
        questionnaire.response("q01"),
        Some(&Response::SingleSelect(Selection::new("yes")))
    );
    let Some(Response::MultiSelect(topics)) = questionnaire.response("q02") else {
        panic!("Expected MultiSelect");
    };
    assert_eq!(topics.selected_values, vec!["money"]);
    assert_eq!(topics.other_text.as_deref(), Some("the neighbours"));
    // The skipped q01 now has an answer.
    assert_eq!(questionnaire.stats().skipped, 0);
    assert_eq!(questionnaire.responses().retained().len(), 1);
}

#[test]
fn test_empty_import_is_an_error() {
    let definition = common::phase();
    assert!(reconcile::import(&definition, "   \n").is_err());
    assert!(reconcile::import(&definition, "{}").is_err());
    assert!(reconcile::import(&definition, "[1, 2]").is_err());
}

#[test]
fn test_unmatched_import_text_survives_export_and_reimport() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    let input = json!({"q01": {"selected_value": "it's complicated, long story"}}).to_string();
    let result = reconcile::import(questionnaire.definition(), &input).unwrap();
    assert_eq!(result.needs_review[0].reason, ReviewReason::Unmatched);
    questionnaire.merge_responses(result.responses);

    let export = questionnaire.export().unwrap();
    let text = export.to_text();
    assert!(text.contains("A:\nOther: it's complicated, long story\n"), "{text}");

    let document = export.to_document();
    assert_eq!(document.items[0].status, ItemStatus::Unanswered);
    assert_eq!(
        document.items[0].answer,
        Some(json!({"selected_value": "", "other_text": "it's complicated, long story"}))
    );

    for source in [text, export.to_json().unwrap()] {
        let back = reconcile::import(questionnaire.definition(), &source).unwrap();
        let Some(Response::SingleSelect(selection)) = back.responses.get("q01") else {
            panic!("Expected SingleSelect");
        };
        assert_eq!(
            selection.other_text.as_deref(),
            Some("it's complicated, long story")
        );
    }
}

#[test]
fn test_unmatched_compound_field_is_stored() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Full).unwrap();
    let input = json!({"q05": {"frequency": "every full moon", "note": "Sundays"}}).to_string();
    let result = reconcile::import(questionnaire.definition(), &input).unwrap();
    assert_eq!(result.needs_review_ids()[0].as_str(), "q05");
    questionnaire.merge_responses(result.responses);

    let stored = questionnaire
        .storage()
        .store()
        .get("phase_0:responses")
        .unwrap()
        .unwrap();
    assert!(stored.contains("every full moon"));

    let text = questionnaire.export().unwrap().to_text();
    assert!(text.contains("  frequency_other: every full moon\n"), "{text}");

    let back = reconcile::import(questionnaire.definition(), &text).unwrap();
    let Some(Response::Compound(values)) = back.responses.get("q05") else {
        panic!("Expected Compound");
    };
    assert_eq!(
        values.get("frequency_other"),
        Some(&FieldValue::from("every full moon"))
    );
    assert_eq!(values.get("note"), Some(&FieldValue::from("Sundays")));
}

#[test]
fn test_free_text_with_marker_lines_round_trips() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    let answer = "Before\n---\nQ9 [q09] not a question\n=== nor a section ===\nAfter";
    questionnaire
        .save_response("q03", Response::FreeText(answer.into()))
        .unwrap();

    let text = questionnaire.export().unwrap().to_text();
    let result = reconcile::import(questionnaire.definition(), &text).unwrap();

    assert!(result.unknown_ids.is_empty());
    assert_eq!(result.responses.get("q03"), Some(&Response::FreeText(answer.into())));
}
