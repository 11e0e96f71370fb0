mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use cuido_core::answer::Choice;
use cuido_core::error::CoreError;
use cuido_core::graph::ResponseType;
use cuido_core::questionnaire::{QuestionnaireKind, QuestionnaireStatus, ScoringPolicy};
use cuido_core::types::DbId;
use cuido_engine::memory::{MemoryProfileSink, MemoryStore};
use cuido_engine::store::QuestionnaireStore;
use cuido_engine::{Actor, Advance, EngineError, QuestionnaireEngine, Step};
use cuido_events::{EventBus, RESPONSE_UPSERTED, SESSION_STARTED};

fn single(option_id: DbId) -> Choice {
    Choice::Single { option_id }
}

fn text(t: &str) -> Choice {
    Choice::FreeText { text: t.into() }
}

fn next(advance: Advance) -> Step {
    match advance {
        Advance::Next(step) => step,
        Advance::Finished(finish) => panic!("expected another question, got {finish:?}"),
    }
}

#[tokio::test]
async fn start_shows_entry_question_with_progress_range() {
    let f = fixture().await;
    let step = f.engine.start(ONBOARDING).await.unwrap().unwrap();

    assert_eq!(step.question.id, Q_NAME);
    assert!(step.choices.is_empty(), "phantom options are never offered");
    assert_eq!(step.progress.current_step, 1);
    // Q1 Q2 Q3 Q4 Q5 Q6 at most; Q1 Q2 Q4 Q6 at least, since Q3 may be hidden.
    assert_eq!(step.progress.max_steps, 6);
    assert_eq!(step.progress.min_remaining, 3);
    assert!(f.store.sessions().unwrap().is_empty(), "no session before the first answer");
}

#[tokio::test]
async fn or_rule_hides_and_shows_question() {
    let f = fixture().await;

    for (user, answer, expected) in [(10, OPT_NO, Q_DURATION), (11, OPT_YES, Q_SUBJECT)] {
        f.engine
            .submit_answer(Actor::User(user), ONBOARDING, Q_NAME, text("Rosa"))
            .await
            .unwrap();
        let step = next(
            f.engine
                .submit_answer(Actor::User(user), ONBOARDING, Q_CARES, single(answer))
                .await
                .unwrap(),
        );
        assert_eq!(step.question.id, expected, "user {user}");
    }
}

/// Answer `answers` in order from the entry point, collecting every step shown.
async fn walk(f: &Fixture<MemoryProfileSink>, user: DbId, answers: Vec<Choice>) -> Vec<Step> {
    let mut shown = vec![f.engine.start(ONBOARDING).await.unwrap().unwrap()];
    for choice in answers {
        let current = shown.last().unwrap().question.id;
        match f
            .engine
            .submit_answer(Actor::User(user), ONBOARDING, current, choice)
            .await
            .unwrap()
        {
            Advance::Next(step) => shown.push(step),
            Advance::Finished(_) => break,
        }
    }
    shown
}

fn assert_bounds_hold(shown: &[Step]) {
    for (i, step) in shown.iter().enumerate() {
        let actual = shown.len() - 1 - i;
        let p = step.progress;
        assert_eq!(p.current_step, i + 1);
        assert!(p.min_remaining <= actual, "step {i}: {p:?}");
        assert!(actual <= p.max_remaining(), "step {i}: {p:?}");
    }
}

#[tokio::test]
async fn progress_bounds_hold_on_walked_path() {
    let f = fixture().await;
    let answers = vec![
        text("Rosa"),
        single(OPT_YES),
        text("mi madre"),
        single(OPT_LONG),
        single(OPT_GOOD),
    ];
    let shown = walk(&f, 20, answers).await;

    let path: Vec<DbId> = shown.iter().map(|s| s.question.id).collect();
    assert_eq!(path, vec![Q_NAME, Q_CARES, Q_SUBJECT, Q_DURATION, Q_MOOD]);
    assert_bounds_hold(&shown);
}

#[tokio::test]
async fn progress_bounds_hold_when_hidden_question_is_skipped() {
    let f = fixture().await;
    let answers = vec![text("Rosa"), single(OPT_NO), single(OPT_LONG), single(OPT_GOOD)];
    let shown = walk(&f, 21, answers).await;

    let path: Vec<DbId> = shown.iter().map(|s| s.question.id).collect();
    assert_eq!(path, vec![Q_NAME, Q_CARES, Q_DURATION, Q_MOOD]);
    assert_bounds_hold(&shown);

    // Once Q2 is answered "no", Q3 is known to be hidden and drops out.
    assert_eq!(shown[2].progress.min_remaining, 1);
    assert_eq!(shown[2].progress.max_steps, 5);
}

#[tokio::test]
async fn all_terminal_question_has_no_remaining_steps() {
    let f = fixture().await;
    let step = f.engine.start(SHORT).await.unwrap().unwrap();
    assert_eq!(step.progress.max_steps, step.progress.current_step);
    assert_eq!(step.progress.min_remaining, 0);
    assert_eq!(step.choices.len(), 2);
}

#[tokio::test]
async fn resume_replays_answers_along_chosen_branch() {
    let f = fixture().await;
    let user = Actor::User(30);

    let fresh = f.engine.resume(user, ONBOARDING).await.unwrap();
    assert!(fresh.session_id.is_none());
    assert_eq!(fresh.next.unwrap().question.id, Q_NAME);

    f.engine
        .submit_answer(user, ONBOARDING, Q_NAME, text("Rosa"))
        .await
        .unwrap();
    f.engine
        .submit_answer(user, ONBOARDING, Q_CARES, single(OPT_YES))
        .await
        .unwrap();

    let resumed = f.engine.resume(user, ONBOARDING).await.unwrap();
    assert!(resumed.session_id.is_some());
    assert_eq!(resumed.answers.len(), 2);
    let step = resumed.next.unwrap();
    assert_eq!(step.question.id, Q_SUBJECT);
    assert_eq!(step.progress.current_step, 3);

    // Changing Q2 hides Q3; the walk skips it.
    f.engine
        .submit_answer(user, ONBOARDING, Q_CARES, single(OPT_NO))
        .await
        .unwrap();
    let resumed = f.engine.resume(user, ONBOARDING).await.unwrap();
    assert_eq!(resumed.answers.len(), 2);
    assert_eq!(resumed.next.unwrap().question.id, Q_DURATION);
}

#[tokio::test]
async fn multi_choice_follows_lowest_display_order() {
    let f = fixture().await;
    let user = Actor::User(31);
    for (q, c) in [
        (Q_NAME, text("Rosa")),
        (Q_CARES, single(OPT_NO)),
        (Q_DURATION, single(OPT_RECENT)),
    ] {
        f.engine.submit_answer(user, ONBOARDING, q, c).await.unwrap();
    }
    let step = next(
        f.engine
            .submit_answer(
                user,
                ONBOARDING,
                Q_WORRIES,
                Choice::Multi {
                    option_ids: vec![OPT_HEALTH, OPT_MONEY],
                },
            )
            .await
            .unwrap(),
    );
    assert_eq!(step.question.id, Q_MOOD);
}

#[tokio::test]
async fn invalid_answer_is_rejected_before_any_write() {
    let f = fixture().await;

    let err = f
        .engine
        .submit_answer(Actor::User(40), ONBOARDING, Q_CARES, single(OPT_SUBJECT))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

    let err = f
        .engine
        .submit_answer(Actor::User(40), ONBOARDING, Q_NAME, single(OPT_YES))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

    assert!(f.store.sessions().unwrap().is_empty());
}

#[tokio::test]
async fn dangling_edge_is_surfaced() {
    let store = Arc::new(MemoryStore::new());
    let mut broken = definition(5, QuestionnaireKind::Generic, ScoringPolicy::Generic);
    broken.status = QuestionnaireStatus::Published;
    store.add_questionnaire(broken).unwrap();
    store
        .add_question(question(51, 5, 0, ResponseType::SingleChoice))
        .unwrap();
    store.add_option(option(5101, 51, Some(999), 0)).unwrap();
    let engine = QuestionnaireEngine::new(store, Arc::new(MemoryProfileSink::new()));

    let err = engine
        .submit_answer(Actor::User(1), 5, 51, single(5101))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::DanglingEdge {
            option_id: 5101,
            target_id: 999
        })
    );
}

#[tokio::test]
async fn unpublished_questionnaires_cannot_be_started() {
    let store = Arc::new(MemoryStore::new());
    store
        .add_questionnaire(definition(6, QuestionnaireKind::Generic, ScoringPolicy::Generic))
        .unwrap();
    let engine = QuestionnaireEngine::new(store, Arc::new(MemoryProfileSink::new()));

    assert_matches!(
        engine.start(6).await,
        Err(EngineError::Core(CoreError::Conflict(_)))
    );
    assert_matches!(
        engine.start(404).await,
        Err(EngineError::Core(CoreError::NotFound {
            entity: "questionnaire",
            id: 404
        }))
    );
}

#[tokio::test]
async fn publish_refuses_graph_with_two_entry_points() {
    let f = fixture().await;
    f.store
        .add_questionnaire(definition(7, QuestionnaireKind::Generic, ScoringPolicy::Generic))
        .unwrap();
    f.store
        .add_question(question(71, 7, 0, ResponseType::SingleChoice))
        .unwrap();
    f.store
        .add_question(question(72, 7, 1, ResponseType::SingleChoice))
        .unwrap();
    f.store.add_option(option(7101, 71, None, 0)).unwrap();
    f.store.add_option(option(7201, 72, None, 0)).unwrap();

    let err = f.engine.publish(7).await.unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::GraphIntegrity(_)));
    let still = f.store.find_questionnaire(7).await.unwrap().unwrap();
    assert_eq!(still.status, QuestionnaireStatus::Draft);
}

#[tokio::test]
async fn publishing_onboarding_archives_previous_and_archive_is_final() {
    let f = fixture().await;
    f.store
        .add_questionnaire(definition(8, QuestionnaireKind::Onboarding, ScoringPolicy::Generic))
        .unwrap();
    f.store
        .add_question(question(81, 8, 0, ResponseType::FreeText))
        .unwrap();
    f.store.add_option(phantom(8101, 81, None)).unwrap();

    let published = f.engine.publish(8).await.unwrap();
    assert_eq!(published.status, QuestionnaireStatus::Published);
    let previous = f.store.find_questionnaire(ONBOARDING).await.unwrap().unwrap();
    assert_eq!(previous.status, QuestionnaireStatus::Archived);

    assert_matches!(
        f.engine.publish(8).await,
        Err(EngineError::Core(CoreError::Conflict(_)))
    );
    let archived = f.engine.archive(8).await.unwrap();
    assert_eq!(archived.status, QuestionnaireStatus::Archived);
    assert_matches!(
        f.engine.archive(8).await,
        Err(EngineError::Core(CoreError::Conflict(_)))
    );
}

#[tokio::test]
async fn answering_publishes_events() {
    let store = Arc::new(MemoryStore::new());
    seed_short(&store);
    let bus = Arc::new(EventBus::default());
    let engine =
        QuestionnaireEngine::with_events(store, Arc::new(MemoryProfileSink::new()), bus.clone());
    engine.publish(SHORT).await.unwrap();

    let mut rx = bus.subscribe();
    engine
        .submit_answer(Actor::User(50), SHORT, Q_SHORT, single(OPT_SHORT_A))
        .await
        .unwrap();

    let started = rx.recv().await.unwrap();
    assert_eq!(started.event_type, SESSION_STARTED);
    assert_eq!(started.user_id, Some(50));
    let upserted = rx.recv().await.unwrap();
    assert_eq!(upserted.event_type, RESPONSE_UPSERTED);
    assert_eq!(upserted.payload["question_id"], Q_SHORT);
    let completed = rx.recv().await.unwrap();
    assert_eq!(completed.event_type, cuido_events::SESSION_COMPLETED);
}
