mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use cuido_core::answer::Choice;
use cuido_core::profile::ProfileField;
use cuido_core::session::SessionStatus;
use cuido_core::types::DbId;
use cuido_engine::file_storage::FileLocalStorage;
use cuido_engine::guest::GuestBufferStore;
use cuido_engine::memory::MemoryStore;
use cuido_engine::store::{LocalStorage, StoreError};
use cuido_engine::{Actor, Advance, EngineError, Finish, QuestionnaireEngine};

/// Answer the first two onboarding questions as a guest.
async fn answer_two(engine: &QuestionnaireEngine, buffer: &GuestBufferStore) {
    engine
        .submit_answer(
            Actor::Guest(buffer),
            ONBOARDING,
            Q_NAME,
            Choice::FreeText {
                text: "Marta".into(),
            },
        )
        .await
        .unwrap();
    engine
        .submit_answer(
            Actor::Guest(buffer),
            ONBOARDING,
            Q_CARES,
            Choice::Single { option_id: OPT_YES },
        )
        .await
        .unwrap();
}

fn row_set(store: &MemoryStore) -> BTreeSet<(DbId, DbId, String)> {
    store
        .responses()
        .unwrap()
        .into_iter()
        .map(|r| {
            (
                r.session_id,
                r.question_id,
                serde_json::to_string(&r.choice).unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn guest_answers_two_questions_then_registers() {
    let f = fixture().await;
    let buffer = guest_buffer();
    answer_two(&f.engine, &buffer).await;

    assert!(f.store.sessions().unwrap().is_empty(), "guests never touch the durable store");
    assert_eq!(buffer.load().unwrap().unwrap().answered_count(), 2);

    let report = f.engine.sync_to_cloud(&buffer, 42).await.unwrap().unwrap();
    assert_eq!(report.synced_responses, 2);
    assert_eq!(report.applied_fields, 1);
    assert!(report.completed.is_none());

    let sessions = f.store.sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].user_id, 42);
    assert_eq!(sessions[0].status, SessionStatus::InProgress);

    let rows = f.store.responses().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.session_id == sessions[0].id));

    assert!(buffer.load().unwrap().is_none(), "buffer is cleared after sync");
    let profile = f.profiles.profile(42).unwrap().unwrap();
    assert_eq!(profile.get(&ProfileField::Name).map(String::as_str), Some("Marta"));

    // The registered user continues where the guest left off.
    let resumed = f.engine.resume(Actor::User(42), ONBOARDING).await.unwrap();
    assert_eq!(resumed.session_id, Some(sessions[0].id));
    assert_eq!(resumed.next.unwrap().question.id, Q_SUBJECT);
}

#[tokio::test]
async fn syncing_the_same_buffer_twice_changes_nothing() {
    let f = fixture().await;
    let storage = Arc::new(cuido_engine::memory::MemoryLocalStorage::new());
    let buffer = GuestBufferStore::new(storage.clone(), "guest");
    answer_two(&f.engine, &buffer).await;
    let blob = storage.get("guest").unwrap().unwrap();

    f.engine.sync_to_cloud(&buffer, 43).await.unwrap().unwrap();
    let once = row_set(&f.store);

    storage.set("guest", &blob).unwrap();
    f.engine.sync_to_cloud(&buffer, 43).await.unwrap().unwrap();
    let twice = row_set(&f.store);

    assert_eq!(once, twice);
    assert_eq!(f.store.sessions().unwrap().len(), 1);

    assert!(f.engine.sync_to_cloud(&buffer, 43).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_profile_write_keeps_buffer_for_retry() {
    let f = fixture_with(Arc::new(FlakyProfileSink::failing())).await;
    let buffer = guest_buffer();
    answer_two(&f.engine, &buffer).await;
    let before = buffer.load().unwrap();

    let err = f.engine.sync_to_cloud(&buffer, 44).await.unwrap_err();
    assert_matches!(
        err,
        EngineError::Sync {
            synced: 2,
            total: 2,
            ..
        }
    );
    assert!(err.is_retryable());
    assert_eq!(buffer.load().unwrap(), before, "buffer must survive a failed sync");

    f.profiles.recover();
    let report = f.engine.sync_to_cloud(&buffer, 44).await.unwrap().unwrap();
    assert_eq!(report.synced_responses, 2);
    assert_eq!(f.store.responses().unwrap().len(), 2);
    assert_eq!(f.store.sessions().unwrap().len(), 1);
    assert!(buffer.load().unwrap().is_none());
    assert!(f.profiles.inner.profile(44).unwrap().is_some());
}

#[tokio::test]
async fn unreachable_store_keeps_buffer() {
    let f = fixture().await;
    let buffer = guest_buffer();
    answer_two(&f.engine, &buffer).await;

    f.store.set_offline(true).unwrap();
    let err = f.engine.sync_to_cloud(&buffer, 45).await.unwrap_err();
    match err {
        EngineError::Sync { synced, source, .. } => {
            assert_eq!(synced, 0);
            assert_matches!(*source, EngineError::Store(StoreError::Unavailable(_)));
        }
        other => panic!("expected a sync error, got {other:?}"),
    }
    assert_eq!(buffer.load().unwrap().unwrap().answered_count(), 2);

    f.store.set_offline(false).unwrap();
    assert!(f.engine.sync_to_cloud(&buffer, 45).await.unwrap().is_some());
}

#[tokio::test]
async fn guest_who5_is_scored_locally_and_completed_on_sync() {
    let f = fixture().await;
    let buffer = guest_buffer();

    let mut last = None;
    for (q, w) in WHO5_QUESTIONS.iter().zip([3, 4, 2, 5, 1]) {
        last = Some(
            f.engine
                .submit_answer(
                    Actor::Guest(&buffer),
                    WHO5,
                    *q,
                    Choice::Single {
                        option_id: who5_option(*q, w),
                    },
                )
                .await
                .unwrap(),
        );
    }
    match last {
        Some(Advance::Finished(Finish::Guest { outcome: Some(o) })) => {
            assert_eq!(o.score, 60.0);
            assert_eq!(o.band.unwrap().label, "Día normal");
        }
        other => panic!("expected a finished guest run, got {other:?}"),
    }
    assert!(buffer.load().unwrap().unwrap().completed);

    let report = f.engine.sync_to_cloud(&buffer, 46).await.unwrap().unwrap();
    let completed = report.completed.unwrap();
    assert_eq!(completed.session.status, SessionStatus::Completed);
    assert_eq!(completed.session.score, Some(60.0));
    assert_eq!(f.store.responses().unwrap().len(), 5);
}

#[tokio::test]
async fn guest_buffer_survives_restart_on_disk() {
    let f = fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let key = "cuido.guest_questionnaire";

    let buffer = GuestBufferStore::new(Arc::new(FileLocalStorage::new(dir.path()).unwrap()), key);
    answer_two(&f.engine, &buffer).await;

    let reopened =
        GuestBufferStore::new(Arc::new(FileLocalStorage::new(dir.path()).unwrap()), key);
    let resumed = f.engine.resume(Actor::Guest(&reopened), ONBOARDING).await.unwrap();
    assert!(resumed.session_id.is_none());
    assert_eq!(resumed.answers.len(), 2);
    assert_eq!(resumed.next.unwrap().question.id, Q_SUBJECT);

    f.engine.sync_to_cloud(&reopened, 47).await.unwrap().unwrap();
    assert!(!dir.path().join(format!("{key}.json")).exists());
    assert_eq!(f.store.responses().unwrap().len(), 2);
}

#[tokio::test]
async fn nothing_to_sync_without_a_buffer() {
    let f = fixture().await;
    assert!(f
        .engine
        .sync_to_cloud(&guest_buffer(), 48)
        .await
        .unwrap()
        .is_none());
    assert!(f.store.sessions().unwrap().is_empty());
}
