//! # Property-Based Test Generators
//!
//! Composable `proptest` strategies for survey configurations, ratings and
//! lifecycle action sequences.
//!
//! ## Design Decisions
//!
//! - Generators produce *semantic* values (ratings, scales, action
//!   sequences), not raw ciphertext bytes, so tests exercise the aggregation
//!   paths rather than the input decoder.
//! - Roughly a fifth of ratings are boundary or out-of-scale values (0, 1,
//!   255) to exercise the oblivious clamp.
//! - Scales and limits are kept small: every submitted rating costs one
//!   executor round-trip per histogram bucket.

extern crate std;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::vec::Vec;

use survey::{MAX_RESPONDENTS, MAX_MAX_SCORE, MIN_MAX_SCORE};

// ── Scalar Generators ────────────────────────────────────────────────────────

/// Any `u8`, biased toward values the clamp must fix.
///
/// Distribution:
///   10% → 0
///   10% → 255
///   10% → 1
///   70% → uniform in [1, 10]
pub fn rating_strategy() -> impl Strategy<Value = u8> {
    prop_oneof![
        1 => Just(0u8),
        1 => Just(u8::MAX),
        1 => Just(1u8),
        7 => (1u8..=10u8),
    ]
}

/// Ratings already inside `1..=bound`.
pub fn in_scale_rating(bound: u32) -> impl Strategy<Value = u8> {
    1u8..=(bound as u8)
}

/// Accepted scale bounds.
pub fn max_score_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        1 => Just(MIN_MAX_SCORE),
        1 => Just(MAX_MAX_SCORE),
        3 => (MIN_MAX_SCORE..=MAX_MAX_SCORE),
    ]
}

/// Scale bounds `publish_survey` must reject.
pub fn invalid_max_score_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        2 => Just(0u32),
        2 => Just(1u32),
        2 => Just(MAX_MAX_SCORE + 1),
        1 => (MAX_MAX_SCORE + 1..=u32::MAX),
    ]
}

pub fn respondent_limit_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        1 => Just(1u32),
        1 => Just(MAX_RESPONDENTS),
        3 => (1u32..=MAX_RESPONDENTS),
    ]
}

pub fn invalid_respondent_limit_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        2 => Just(0u32),
        2 => Just(MAX_RESPONDENTS + 1),
        1 => (MAX_RESPONDENTS + 1..=u32::MAX),
    ]
}

/// Strategy for ledger time advances in seconds.
pub fn duration_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => Just(0u64),
        3 => (1u64..=3_600u64),
        2 => (1u64..=604_800u64),
    ]
}

// ── Survey Config Generators ─────────────────────────────────────────────────

/// A publishable survey small enough to fill within one test case.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub respondent_limit: u32,
    pub max_scores: Vec<u32>,
}

impl SurveyConfig {
    pub fn total_questions(&self) -> u32 {
        self.max_scores.len() as u32
    }
}

pub fn survey_config_strategy() -> impl Strategy<Value = SurveyConfig> {
    (1u32..=5u32, prop::collection::vec(MIN_MAX_SCORE..=6u32, 1..=3)).prop_map(
        |(respondent_limit, max_scores)| SurveyConfig {
            respondent_limit,
            max_scores,
        },
    )
}

/// A config together with one in-scale rating row per respondent slot.
pub fn filled_survey_strategy() -> impl Strategy<Value = (SurveyConfig, Vec<Vec<u8>>)> {
    survey_config_strategy().prop_flat_map(|config| {
        let row: Vec<BoxedStrategy<u8>> = config
            .max_scores
            .iter()
            .map(|bound| in_scale_rating(*bound).boxed())
            .collect();
        let rows = prop::collection::vec(row, config.respondent_limit as usize);
        (Just(config), rows)
    })
}

// ── Action Generators ────────────────────────────────────────────────────────

/// Every entry point a lifecycle exploration can drive.
///
/// `user_index` selects from a fixed pool of respondents (modular indexing),
/// so repeated indices exercise the one-response rule.
#[derive(Debug, Clone)]
pub enum SurveyAction {
    Publish,
    Submit { user_index: usize, ratings: Vec<u8> },
    Close,
    Delete,
    UpdateTitle,
    GrantOwner { question: u32 },
    GrantRespondent { user_index: usize, question: u32 },
    AdvanceTime { delta: u64 },
}

/// Weights favour submissions; `Delete` is rare so most runs get past
/// `Created`.
pub fn survey_action_strategy(
    num_users: usize,
    num_questions: u32,
) -> impl Strategy<Value = SurveyAction> {
    let user = 0..num_users;
    let question = 0..num_questions + 1;
    let n = num_questions as usize;
    let ratings = prop_oneof![
        9 => prop::collection::vec(rating_strategy(), n..=n),
        1 => prop::collection::vec(rating_strategy(), 0..=n + 1),
    ];

    prop_oneof![
        10 => Just(SurveyAction::Publish),
        40 => (user.clone(), ratings)
            .prop_map(|(u, r)| SurveyAction::Submit { user_index: u, ratings: r }),
        6 => Just(SurveyAction::Close),
        2 => Just(SurveyAction::Delete),
        4 => Just(SurveyAction::UpdateTitle),
        8 => question.clone().prop_map(|q| SurveyAction::GrantOwner { question: q }),
        8 => (user, question)
            .prop_map(|(u, q)| SurveyAction::GrantRespondent { user_index: u, question: q }),
        6 => duration_strategy().prop_map(|d| SurveyAction::AdvanceTime { delta: d }),
    ]
}

pub fn survey_action_sequence(
    num_users: usize,
    num_questions: u32,
    max_len: usize,
) -> impl Strategy<Value = Vec<SurveyAction>> {
    prop::collection::vec(survey_action_strategy(num_users, num_questions), 1..=max_len)
}

// ── Historical Pattern Generators ────────────────────────────────────────────

/// Common survey runs, used to reach deep states quickly.
#[derive(Debug, Clone, Arbitrary)]
pub enum SurveyPattern {
    /// Publish, then one response per slot until the survey closes itself.
    FillToLimit,
    /// Owner closes after a single response.
    CloseEarly,
    /// Draft edited then deleted before publishing.
    DeleteDraft,
    /// Same respondent submits twice.
    DoubleSubmit,
    /// Owner tries to edit a live survey, then the run completes.
    EditAfterPublish,
}

/// Expand a pattern into a concrete action sequence.
pub fn pattern_to_actions(
    pattern: &SurveyPattern,
    num_questions: u32,
    respondent_limit: u32,
) -> Vec<SurveyAction> {
    let row = |r: u8| std::vec![r; num_questions as usize];
    match pattern {
        SurveyPattern::FillToLimit => {
            let mut actions = std::vec![SurveyAction::Publish];
            for i in 0..respondent_limit as usize {
                actions.push(SurveyAction::Submit {
                    user_index: i,
                    ratings: row((i % 5) as u8 + 1),
                });
            }
            actions.push(SurveyAction::GrantOwner { question: 0 });
            actions
        }
        SurveyPattern::CloseEarly => std::vec![
            SurveyAction::Publish,
            SurveyAction::Submit { user_index: 0, ratings: row(2) },
            SurveyAction::Close,
            SurveyAction::GrantRespondent { user_index: 0, question: 0 },
            SurveyAction::Submit { user_index: 1, ratings: row(3) },
        ],
        SurveyPattern::DeleteDraft => std::vec![
            SurveyAction::UpdateTitle,
            SurveyAction::Delete,
            SurveyAction::Publish,
            SurveyAction::Submit { user_index: 0, ratings: row(1) },
        ],
        SurveyPattern::DoubleSubmit => std::vec![
            SurveyAction::Publish,
            SurveyAction::Submit { user_index: 0, ratings: row(4) },
            SurveyAction::Submit { user_index: 0, ratings: row(1) },
        ],
        SurveyPattern::EditAfterPublish => std::vec![
            SurveyAction::Publish,
            SurveyAction::UpdateTitle,
            SurveyAction::Delete,
            SurveyAction::Close,
        ],
    }
}
