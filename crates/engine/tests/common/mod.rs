//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cuido_core::graph::{OptionNode, QuestionNode, ResponseType};
use cuido_core::profile::{ProfileCaptures, ProfileField};
use cuido_core::questionnaire::{
    QuestionnaireDefinition, QuestionnaireKind, QuestionnaireStatus, ScoringPolicy,
};
use cuido_core::types::DbId;
use cuido_core::visibility::{Combinator, Condition, VisibilityRule};
use cuido_engine::error::EngineResult;
use cuido_engine::guest::GuestBufferStore;
use cuido_engine::memory::{MemoryLocalStorage, MemoryProfileSink, MemoryStore};
use cuido_engine::store::{ProfileSink, StoreError};
use cuido_engine::QuestionnaireEngine;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Six-question onboarding flow.
///
/// ```text
/// Q1 name (free text) -> Q2 "do you care for someone?"
/// Q2 yes/no          -> Q3 (shown only if Q2 = yes)
/// Q3 who (free text) -> Q4
/// Q4 how long        -> Q5 (less than a year) | Q6 (longer)
/// Q5 worries (multi) -> Q6
/// Q6 mood            -> end
/// ```
pub const ONBOARDING: DbId = 1;
pub const Q_NAME: DbId = 11;
pub const Q_CARES: DbId = 12;
pub const Q_SUBJECT: DbId = 13;
pub const Q_DURATION: DbId = 14;
pub const Q_WORRIES: DbId = 15;
pub const Q_MOOD: DbId = 16;

pub const OPT_NAME: DbId = 1101;
pub const OPT_YES: DbId = 1201;
pub const OPT_NO: DbId = 1202;
pub const OPT_SUBJECT: DbId = 1301;
pub const OPT_RECENT: DbId = 1401;
pub const OPT_LONG: DbId = 1402;
pub const OPT_SLEEP: DbId = 1501;
pub const OPT_MONEY: DbId = 1502;
pub const OPT_HEALTH: DbId = 1503;
pub const OPT_GOOD: DbId = 1601;
pub const OPT_BAD: DbId = 1602;

/// WHO-5: questions 21..=25, option `q * 100 + w` carries weight `w`.
pub const WHO5: DbId = 2;
pub const WHO5_QUESTIONS: [DbId; 5] = [21, 22, 23, 24, 25];

pub fn who5_option(question_id: DbId, weight: i64) -> DbId {
    question_id * 100 + weight
}

/// One question whose options all end the questionnaire.
pub const SHORT: DbId = 4;
pub const Q_SHORT: DbId = 41;
pub const OPT_SHORT_A: DbId = 4101;
pub const OPT_SHORT_B: DbId = 4102;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn definition(
    id: DbId,
    kind: QuestionnaireKind,
    policy: ScoringPolicy,
) -> QuestionnaireDefinition {
    QuestionnaireDefinition {
        id,
        title: format!("Questionnaire {id}"),
        kind,
        status: QuestionnaireStatus::Draft,
        scoring_policy: policy,
    }
}

pub fn question(
    id: DbId,
    questionnaire_id: DbId,
    order_index: i32,
    response_type: ResponseType,
) -> QuestionNode {
    QuestionNode {
        id,
        questionnaire_id,
        order_index,
        prompt: format!("Question {id}"),
        response_type,
        visibility_rule: None,
        captures_profile_field: None,
    }
}

pub fn option(id: DbId, question_id: DbId, next: Option<DbId>, display_order: i32) -> OptionNode {
    OptionNode {
        id,
        question_id,
        label: format!("Option {id}"),
        score: None,
        next_question_id: next,
        display_order,
        is_phantom: false,
    }
}

pub fn phantom(id: DbId, question_id: DbId, next: Option<DbId>) -> OptionNode {
    OptionNode {
        label: String::new(),
        is_phantom: true,
        ..option(id, question_id, next, 0)
    }
}

pub fn seed_onboarding(store: &MemoryStore) {
    store
        .add_questionnaire(definition(
            ONBOARDING,
            QuestionnaireKind::Onboarding,
            ScoringPolicy::Generic,
        ))
        .unwrap();

    let mut name = question(Q_NAME, ONBOARDING, 0, ResponseType::FreeText);
    name.captures_profile_field = Some(ProfileField::Name);
    let mut subject = question(Q_SUBJECT, ONBOARDING, 2, ResponseType::FreeText);
    subject.captures_profile_field = Some(ProfileField::CaregivingSubject);
    subject.visibility_rule = Some(VisibilityRule {
        combinator: Combinator::Or,
        conditions: vec![Condition {
            question_id: Q_CARES,
            acceptable_option_ids: vec![OPT_YES],
        }],
    });

    for q in [
        name,
        question(Q_CARES, ONBOARDING, 1, ResponseType::SingleChoice),
        subject,
        question(Q_DURATION, ONBOARDING, 3, ResponseType::SingleChoice),
        question(Q_WORRIES, ONBOARDING, 4, ResponseType::MultiChoice),
        question(Q_MOOD, ONBOARDING, 5, ResponseType::SingleChoice),
    ] {
        store.add_question(q).unwrap();
    }

    for o in [
        phantom(OPT_NAME, Q_NAME, Some(Q_CARES)),
        option(OPT_YES, Q_CARES, Some(Q_SUBJECT), 0),
        option(OPT_NO, Q_CARES, Some(Q_SUBJECT), 1),
        phantom(OPT_SUBJECT, Q_SUBJECT, Some(Q_DURATION)),
        option(OPT_RECENT, Q_DURATION, Some(Q_WORRIES), 0),
        option(OPT_LONG, Q_DURATION, Some(Q_MOOD), 1),
        option(OPT_SLEEP, Q_WORRIES, Some(Q_MOOD), 0),
        option(OPT_MONEY, Q_WORRIES, Some(Q_MOOD), 1),
        option(OPT_HEALTH, Q_WORRIES, Some(Q_MOOD), 2),
        option(OPT_GOOD, Q_MOOD, None, 0),
        option(OPT_BAD, Q_MOOD, None, 1),
    ] {
        store.add_option(o).unwrap();
    }
}

pub fn seed_who5(store: &MemoryStore) {
    store
        .add_questionnaire(definition(WHO5, QuestionnaireKind::Scored, ScoringPolicy::Who5))
        .unwrap();
    for (i, q) in WHO5_QUESTIONS.iter().enumerate() {
        store
            .add_question(question(*q, WHO5, i as i32, ResponseType::SingleChoice))
            .unwrap();
        let next = WHO5_QUESTIONS.get(i + 1).copied();
        for w in 0..=5 {
            store
                .add_option(OptionNode {
                    score: Some(w as f64),
                    ..option(who5_option(*q, w), *q, next, w as i32)
                })
                .unwrap();
        }
    }
}

pub fn seed_short(store: &MemoryStore) {
    store
        .add_questionnaire(definition(SHORT, QuestionnaireKind::Generic, ScoringPolicy::Generic))
        .unwrap();
    store
        .add_question(question(Q_SHORT, SHORT, 0, ResponseType::SingleChoice))
        .unwrap();
    store.add_option(option(OPT_SHORT_A, Q_SHORT, None, 0)).unwrap();
    store.add_option(option(OPT_SHORT_B, Q_SHORT, None, 1)).unwrap();
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Profile collaborator that fails while `failing` is set.
#[derive(Default)]
pub struct FlakyProfileSink {
    pub failing: AtomicBool,
    pub inner: MemoryProfileSink,
}

impl FlakyProfileSink {
    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            inner: MemoryProfileSink::new(),
        }
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileSink for FlakyProfileSink {
    async fn apply_profile_fields(
        &self,
        user_id: DbId,
        fields: &ProfileCaptures,
    ) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("profile service down".into()).into());
        }
        self.inner.apply_profile_fields(user_id, fields).await
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture<P = MemoryProfileSink> {
    pub store: Arc<MemoryStore>,
    pub profiles: Arc<P>,
    pub engine: QuestionnaireEngine,
}

/// Store seeded with the onboarding, WHO-5 and short questionnaires, all
/// published through the engine.
pub async fn fixture() -> Fixture {
    fixture_with(Arc::new(MemoryProfileSink::new())).await
}

pub async fn fixture_with<P: ProfileSink + 'static>(profiles: Arc<P>) -> Fixture<P> {
    let store = Arc::new(MemoryStore::new());
    seed_onboarding(&store);
    seed_who5(&store);
    seed_short(&store);

    let engine = QuestionnaireEngine::new(store.clone(), profiles.clone());
    for id in [ONBOARDING, WHO5, SHORT] {
        engine.publish(id).await.unwrap();
    }
    Fixture {
        store,
        profiles,
        engine,
    }
}

pub fn guest_buffer() -> GuestBufferStore {
    GuestBufferStore::new(Arc::new(MemoryLocalStorage::new()), "cuido.guest_questionnaire")
}
