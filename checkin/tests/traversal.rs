//! Integration tests for traversal and mode switching over the fixture phase.

mod common;

use checkin::{
    MemoryStore, Mode, MultiSelection, PhaseDefinition, Questionnaire, RankedAnswer, Response,
    SchemaError, Selection, SessionStore, Stats, SwitchDirection, TraversalError, TraversalState,
};

fn lite() -> Questionnaire<MemoryStore> {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    questionnaire
}

fn answer_q01_and_q03(questionnaire: &mut Questionnaire<MemoryStore>) {
    questionnaire
        .save_response("q01", Response::SingleSelect(Selection::new("yes")))
        .unwrap();
    questionnaire
        .save_response("q03", Response::FreeText("hello".into()))
        .unwrap();
}

fn assert_stats_add_up(stats: Stats) {
    assert_eq!(stats.answered + stats.skipped + stats.unanswered, stats.total);
}

#[test]
fn test_lite_stats_after_two_answers() {
    let mut questionnaire = lite();
    answer_q01_and_q03(&mut questionnaire);

    assert_eq!(
        questionnaire.stats(),
        Stats {
            answered: 2,
            skipped: 0,
            unanswered: 1,
            total: 3,
        }
    );
}

#[test]
fn test_upgrade_counts_and_cursor() {
    let mut questionnaire = lite();
    answer_q01_and_q03(&mut questionnaire);

    let switch = questionnaire.init_with_upgrade(Mode::Full).unwrap();

    assert_eq!(switch.previous, Some(Mode::Lite));
    assert_eq!(switch.direction, SwitchDirection::Upgrade);
    assert_eq!(switch.answered_count, 2);
    assert_eq!(switch.unanswered_count, 3);
    assert_eq!(switch.new_question_count, 5);
    // q02 is still open, so it comes before the new questions.
    assert_eq!(switch.start_index, 1);
    assert_eq!(questionnaire.current_id().unwrap().as_str(), "q02");
}

#[test]
fn test_upgrade_lands_on_first_new_question() {
    let mut questionnaire = lite();
    answer_q01_and_q03(&mut questionnaire);
    questionnaire
        .save_response(
            "q02",
            Response::MultiSelect(MultiSelection::new(vec!["money".into()])),
        )
        .unwrap();

    let switch = questionnaire.init_with_upgrade(Mode::Full).unwrap();

    assert_eq!(switch.answered_count, 3);
    assert_eq!(switch.unanswered_count, 2);
    assert_eq!(questionnaire.current_id().unwrap().as_str(), "q04");
    assert_eq!(questionnaire.cursor(), 3);
}

#[test]
fn test_answers_survive_switching_out_and_back() {
    let mut questionnaire = Questionnaire::new(common::phase(), MemoryStore::new());
    questionnaire.init(Mode::Full).unwrap();
    let ranked = Response::Ranked(RankedAnswer {
        key: "priorities".into(),
        values: vec!["rest".into(), "time".into()],
    });
    questionnaire.save_response("q04", ranked.clone()).unwrap();
    answer_q01_and_q03(&mut questionnaire);
    let before = questionnaire.responses().to_value();

    let down = questionnaire.init_with_upgrade(Mode::Lite).unwrap();
    assert_eq!(down.direction, SwitchDirection::Downgrade);
    // q04 is out of view but not gone.
    assert_eq!(questionnaire.response("q04"), Some(&ranked));
    assert_eq!(questionnaire.stats().total, 3);

    questionnaire.init_with_upgrade(Mode::Full).unwrap();
    assert_eq!(questionnaire.responses().to_value(), before);
}

#[test]
fn test_failed_switch_changes_nothing() {
    let read = |name: &str| std::fs::read_to_string(common::fixture_dir().join(name)).unwrap();
    let mut manifest: serde_json::Value = serde_json::from_str(&read("manifest.json")).unwrap();
    manifest["manifests"].as_object_mut().unwrap().remove("full");
    let only_lite =
        PhaseDefinition::from_json_str(&manifest.to_string(), &read("questions.json")).unwrap();

    let mut questionnaire = Questionnaire::new(only_lite, MemoryStore::new());
    questionnaire.init(Mode::Lite).unwrap();
    questionnaire.next();
    let keys_before = questionnaire.storage().store().len();

    let err = questionnaire.init_with_upgrade(Mode::Full).unwrap_err();

    assert!(matches!(
        err,
        TraversalError::Schema(SchemaError::ManifestNotFound(ref name)) if name == "full"
    ));
    assert_eq!(questionnaire.mode(), Some(Mode::Lite));
    assert_eq!(questionnaire.cursor(), 1);
    assert_eq!(questionnaire.storage().store().len(), keys_before);
    assert_eq!(questionnaire.storage().load_mode(), Some(Mode::Lite));
}

#[test]
fn test_find_first_unanswered_is_idempotent() {
    let mut questionnaire = lite();
    answer_q01_and_q03(&mut questionnaire);

    let first = questionnaire.find_first_unanswered().cloned();
    let second = questionnaire.find_first_unanswered().cloned();
    assert_eq!(first, second);
    assert_eq!(first.unwrap().as_str(), "q02");
}

#[test]
fn test_skip_then_answer() {
    let mut questionnaire = lite();

    assert!(questionnaire.skip());
    assert!(questionnaire.skip());
    let stats = questionnaire.stats();
    assert_eq!(stats.skipped, 2);
    assert_stats_add_up(stats);

    questionnaire.jump_to("q01");
    assert!(questionnaire.is_current_skipped());
    questionnaire
        .save_response("q01", Response::SingleSelect(Selection::new("no")))
        .unwrap();
    assert!(!questionnaire.is_current_skipped());

    let stats = questionnaire.stats();
    assert_eq!((stats.answered, stats.skipped, stats.unanswered), (1, 1, 1));
    assert_stats_add_up(stats);
}

#[test]
fn test_walking_to_the_end_completes_the_mode() {
    let mut questionnaire = lite();

    assert!(questionnaire.next());
    assert!(questionnaire.next());
    assert!(questionnaire.is_last());
    assert!(!questionnaire.next());

    assert_eq!(questionnaire.state(), TraversalState::Complete);
    assert!(questionnaire.completed_modes().contains(&Mode::Lite));

    assert!(questionnaire.previous());
    assert_eq!(questionnaire.state(), TraversalState::InProgress);
}

#[test]
fn test_resume_restores_cursor_and_answers() {
    let mut questionnaire = lite();
    answer_q01_and_q03(&mut questionnaire);
    questionnaire.jump_to("q03");
    let store = questionnaire.into_store();

    let mut resumed = Questionnaire::new(common::phase(), store);
    assert_eq!(resumed.resume().unwrap(), Mode::Lite);
    assert_eq!(resumed.current_id().unwrap().as_str(), "q03");
    assert_eq!(resumed.stats().answered, 2);
}

#[test]
fn test_orphaned_answers_are_kept_but_not_counted() {
    let store = MemoryStore::new().with_entry(
        "phase_0:responses",
        r#"{"q01": {"selected_value": "yes"}, "q42": {"text": "old question"}}"#,
    );
    let mut questionnaire = Questionnaire::new(common::phase(), store);
    questionnaire.init(Mode::Lite).unwrap();

    assert_eq!(questionnaire.stats().answered, 1);
    assert_eq!(questionnaire.responses().retained().len(), 1);

    questionnaire
        .save_response("q03", Response::FreeText("new".into()))
        .unwrap();
    let stored = questionnaire
        .storage()
        .store()
        .get("phase_0:responses")
        .unwrap()
        .unwrap();
    assert!(stored.contains("q42"));
}

#[test]
fn test_type_mismatch_is_rejected() {
    let mut questionnaire = lite();

    let err = questionnaire
        .save_response("q03", Response::SingleSelect(Selection::new("yes")))
        .unwrap_err();

    assert!(err.to_string().contains("q03"));
    assert!(questionnaire.response("q03").is_none());
}
