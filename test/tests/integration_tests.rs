//! # Survey Testing Framework — Integration Tests
//!
//! Exercises the survey and executor contracts through the framework:
//! - Property-based aggregate, clamp and boundary checks
//! - State space exploration over random lifecycles
//! - Scenario DSL for end-to-end runs

extern crate std;

use proptest::prelude::*;
use soroban_sdk::Address;
use std::vec::Vec;

use survey::{lifecycle::LifecycleAction, SurveyError, SurveyStatus};
use test_framework::generators::*;
use test_framework::invariants::*;
use test_framework::scenario_dsl::{run_scenarios, Scenario};
use test_framework::state_explorer::*;
use test_framework::*;

/// Plaintext aggregates a question should reach after `ratings`.
fn model(bound: u32, ratings: &[u8]) -> QuestionSnapshot {
    let clamped: Vec<u32> = ratings
        .iter()
        .map(|r| (*r as u32).clamp(1, bound))
        .collect();
    let mut frequencies = std::vec![0u32; bound as usize];
    for v in &clamped {
        frequencies[*v as usize - 1] += 1;
    }
    QuestionSnapshot {
        max_score_bound: bound,
        total: clamped.iter().sum(),
        sum_squares: clamped.iter().map(|v| v * v).sum(),
        min: clamped.iter().copied().min().unwrap_or(255),
        max: clamped.iter().copied().max().unwrap_or(0),
        frequencies,
    }
}

// ═════════════════════════════════════════════════════════════════════════════
//  Property-Based Tests
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// **Property**: decrypted aggregates equal the plaintext computation.
    #[test]
    fn prop_aggregates_match_plaintext(
        (config, rows) in filled_survey_strategy(),
    ) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(
            &env,
            config.total_questions(),
            config.respondent_limit,
        );
        harness.publish(&config.max_scores);
        for row in &rows {
            harness.respond(row);
        }

        prop_assert_eq!(harness.status(), SurveyStatus::Closed);
        for (q, bound) in config.max_scores.iter().enumerate() {
            let column: Vec<u8> = rows.iter().map(|r| r[q]).collect();
            prop_assert_eq!(harness.question(q as u32), model(*bound, &column));
        }
        InvariantSet::survey_defaults().assert_all(&harness.snapshot());
    }

    /// **Property**: out-of-scale ratings are folded in as the nearest scale end.
    #[test]
    fn prop_ratings_are_clamped(
        bound in max_score_strategy(),
        ratings in prop::collection::vec(rating_strategy(), 1..=4),
    ) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, 1, ratings.len() as u32);
        harness.publish(&[bound]);

        let mut respondents = Vec::new();
        for r in &ratings {
            respondents.push(harness.respond(&[*r]));
        }

        prop_assert_eq!(harness.question(0), model(bound, &ratings));
        for (who, r) in respondents.iter().zip(&ratings) {
            prop_assert_eq!(harness.answers_of(who), std::vec![(*r as u32).clamp(1, bound)]);
        }
    }

    /// **Property**: scale bounds outside `2..=10` never publish.
    #[test]
    fn prop_invalid_max_scores_rejected(
        bad in invalid_max_score_strategy(),
        position in 0usize..3,
    ) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, 3, 5);
        let mut scores = std::vec![5u32, 5, 5];
        scores[position] = bad;

        assert_contract_error!(harness.try_publish(&scores), SurveyError::MaxScoreInvalid);
        prop_assert_eq!(harness.status(), SurveyStatus::Created);
        prop_assert_eq!(harness.survey.get_transition_log().len(), 0);
    }

    /// **Property**: every limit in `1..=1000` is accepted, nothing else is.
    #[test]
    fn prop_respondent_limit_boundaries(
        good in respondent_limit_strategy(),
        bad in invalid_respondent_limit_strategy(),
    ) {
        let env = TestEnv::new();
        let rejected = SurveyTestHarness::deploy(&env);
        assert_contract_error!(
            rejected.try_initialize(2, bad),
            SurveyError::BadRespondentLimit
        );

        let accepted = SurveyTestHarness::new(&env, 2, good);
        prop_assert_eq!(accepted.snapshot().respondent_limit, good);
    }

    /// **Property**: an address is counted at most once, whatever it sends.
    #[test]
    fn prop_single_submission(
        first in prop::collection::vec(rating_strategy(), 2..=2),
        second in prop::collection::vec(rating_strategy(), 2..=2),
    ) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, 2, 5);
        harness.publish(&[4, 6]);

        let respondent = harness.respond(&first);
        let before = harness.snapshot();
        assert_contract_error!(
            harness.try_respond_as(&respondent, &second),
            SurveyError::AlreadyResponded
        );
        let after = harness.snapshot();

        prop_assert_eq!(after.total_respondents, 1);
        prop_assert_eq!(before.questions, after.questions);
    }

    /// **Property**: the survey closes on exactly the `limit`-th response.
    #[test]
    fn prop_auto_close_is_exact(limit in 1u32..=4) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, 1, limit);
        harness.publish(&[3]);

        for _ in 1..limit {
            harness.respond(&[2]);
            prop_assert_eq!(harness.status(), SurveyStatus::Active);
        }
        harness.respond(&[2]);
        prop_assert_eq!(harness.status(), SurveyStatus::Closed);
        prop_assert_eq!(harness.total_respondents(), limit);

        let late = env.generate_address();
        assert_contract_error!(harness.try_respond_as(&late, &[1]), SurveyError::NotActive);
    }

    /// **Property**: invariants hold after arbitrary action sequences.
    #[test]
    fn prop_invariants_hold_under_random_actions(
        (config, actions) in survey_config_strategy().prop_flat_map(|c| {
            let n = c.total_questions();
            (Just(c), survey_action_sequence(3, n, 12))
        }),
    ) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(
            &env,
            config.total_questions(),
            config.respondent_limit,
        );
        let users = env.generate_addresses(3);

        let mut explorer = StateExplorer::new(
            &harness,
            InvariantSet::survey_defaults(),
            TransitionInvariantSet::survey_defaults(),
            ExplorerConfig { max_steps: 12, fail_fast: true, record_snapshots: false },
            users,
            config.max_scores.clone(),
        );
        let result = explorer.explore(&actions);

        prop_assert!(result.passed(),
            "Invariant violations: {:?}", result.summary.invariant_violations);
        for (action, outcome) in &result.action_log {
            prop_assert!(!matches!(outcome, ActionOutcome::UnexpectedError(_)),
                "{:?} failed outside the contract: {:?}", action, outcome);
        }
    }

    /// **Property**: recorded usage patterns keep every invariant.
    #[test]
    fn prop_patterns_preserve_invariants(pattern in any::<SurveyPattern>()) {
        let env = TestEnv::new();
        let harness = SurveyTestHarness::new(&env, 2, 3);
        let users = env.generate_addresses(3);

        let mut explorer = StateExplorer::with_defaults(&harness, users, std::vec![5, 3]);
        let result = explorer.explore(&pattern_to_actions(&pattern, 2, 3));
        prop_assert!(result.passed(),
            "Pattern {:?} violated: {:?}", pattern, result.summary.invariant_violations);
    }
}

// ═════════════════════════════════════════════════════════════════════════════
//  Invariant Tests
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn test_all_invariants_hold_on_fresh_survey() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 2, 3);
    let snapshot = harness.snapshot();

    assert_eq!(snapshot.status, SurveyStatus::Created);
    assert!(snapshot.questions.is_empty());
    InvariantSet::survey_defaults().assert_all(&snapshot);
}

#[test]
fn test_published_survey_starts_from_sentinels() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 2, 3);
    harness.publish(&[4, 2]);

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.questions[0], model(4, &[]));
    assert_eq!(snapshot.questions[1].frequencies, std::vec![0, 0]);
    InvariantSet::survey_defaults().assert_all(&snapshot);
}

#[test]
fn test_invariants_catch_corrupted_snapshot() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 1, 3);
    harness.publish(&[5]);
    harness.respond(&[4]);

    let mut snapshot = harness.snapshot();
    snapshot.questions[0].frequencies[0] += 1;
    let violations = InvariantSet::survey_defaults().check_all(&snapshot);
    let names: Vec<_> = violations.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"sum(frequencies) == total_respondents"));
    assert!(names.contains(&"total == weighted histogram"));
}

#[test]
fn test_transition_invariants_reject_reopening() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 1, 1);
    harness.publish(&[3]);
    harness.respond(&[3]);

    let closed = harness.snapshot();
    let mut reopened = closed.clone();
    reopened.status = SurveyStatus::Active;

    let violations = TransitionInvariantSet::survey_defaults().check_all(&closed, &reopened);
    assert!(violations
        .iter()
        .any(|(name, _)| name == "status only moves forward"));
}

#[test]
fn test_snapshot_matches_contract_views() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 2, 4);
    harness.publish(&[5, 3]);
    let alice = harness.respond(&[5, 1]);
    harness.respond(&[2, 3]);

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.total_respondents, 2);
    assert_eq!(snapshot.transitions, 1);
    assert_eq!(snapshot.questions[0].total, 7);
    assert_eq!(snapshot.questions[0].sum_squares, 29);
    assert_eq!(snapshot.questions[1].frequencies, std::vec![1, 0, 1]);
    assert_eq!(harness.answers_of(&alice), std::vec![5, 1]);
}

// ═════════════════════════════════════════════════════════════════════════════
//  Explorer Tests
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn test_explorer_coverage_tracking() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 1, 2);
    let users = env.generate_addresses(2);

    let actions = std::vec![
        SurveyAction::UpdateTitle,
        SurveyAction::Publish,
        SurveyAction::Submit { user_index: 0, ratings: std::vec![3] },
        SurveyAction::GrantOwner { question: 0 },
        SurveyAction::Close,
        SurveyAction::GrantOwner { question: 0 },
        SurveyAction::GrantRespondent { user_index: 0, question: 0 },
        SurveyAction::Delete,
        SurveyAction::AdvanceTime { delta: 60 },
    ];

    let mut explorer = StateExplorer::new(
        &harness,
        InvariantSet::survey_defaults(),
        TransitionInvariantSet::survey_defaults(),
        ExplorerConfig { max_steps: 20, fail_fast: false, record_snapshots: true },
        users,
        std::vec![4],
    );
    let result = explorer.explore(&actions);

    assert!(result.passed(), "{:?}", result.summary.invariant_violations);
    assert_eq!(result.summary.actions_executed, 9);
    assert_eq!(result.summary.transitions_observed, 2);
    assert_eq!(result.snapshots.len(), 10);
    assert_eq!(result.last().map(|s| s.status), Some(SurveyStatus::Closed));
    assert!(result.summary.entry_point_coverage(SURVEY_ENTRY_POINTS.len()) >= 1.0);

    let outcomes: Vec<_> = result.action_log.iter().map(|(_, o)| o.clone()).collect();
    assert!(matches!(outcomes[3], ActionOutcome::ExpectedError(e) if e == SurveyError::NotClosed as u32));
    assert!(outcomes[5].is_ok());
    assert!(matches!(outcomes[7], ActionOutcome::ExpectedError(e) if e == SurveyError::AlreadyActive as u32));
}

#[test]
fn test_explorer_delete_draft_blocks_everything() {
    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, 2, 3);
    let users = env.generate_addresses(1);

    let mut explorer = StateExplorer::with_defaults(&harness, users, std::vec![5, 5]);
    let result = explorer.explore(&pattern_to_actions(&SurveyPattern::DeleteDraft, 2, 3));

    assert!(result.passed());
    assert_eq!(harness.status(), SurveyStatus::Trashed);
    assert!(!result.action_log[2].1.is_ok());
    assert_eq!(harness.total_respondents(), 0);
}

// ═════════════════════════════════════════════════════════════════════════════
//  Scenario Tests
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn test_scenario_single_respondent_closes_survey() {
    Scenario::new("limit of one closes on the first response")
        .with_questions(3)
        .with_limit(1)
        .given(|ctx| ctx.harness.publish(&[5, 3, 4]))
        .when("one respondent submits [3, 2, 4]", |ctx| {
            ctx.respond(&[3, 2, 4]);
            let closed_with = ctx.harness.closed_with().expect("close event");
            ctx.store("closed_with", closed_with);
        })
        .with_invariants(InvariantSet::survey_defaults())
        .then("the survey closed itself in that call", |ctx| {
            let h = ctx.harness;
            assert_eq!(ctx.load("closed_with"), 1);
            assert_eq!(h.total_respondents(), 1);
            assert_eq!(h.status(), SurveyStatus::Closed);

            let log = h.survey.get_transition_log();
            let last = log.last().unwrap();
            assert_eq!(last.action, LifecycleAction::Close);
            assert_eq!(last.to_status, SurveyStatus::Closed);
            assert_eq!(last.actor, h.survey.address);
        })
        .then("a later submission is refused as not active", |ctx| {
            let other = ctx.harness.env.generate_address();
            assert_contract_error!(
                ctx.harness.try_respond_as(&other, &[1, 1, 1]),
                SurveyError::NotActive
            );
            assert_eq!(ctx.harness.total_respondents(), 1);
        })
        .run();
}

#[test]
fn test_scenario_five_respondents_owner_decrypts_histogram() {
    Scenario::new("five respondents, owner grant, histogram decrypt")
        .with_questions(2)
        .with_limit(5)
        .given(|ctx| ctx.harness.publish(&[5, 10]))
        .when("five distinct addresses respond", |ctx| {
            for row in [[1u8, 10], [5, 7], [3, 7], [3, 2], [4, 9]] {
                ctx.respond(&row);
                let open = ctx.respondents.len() < 5;
                assert_eq!(ctx.harness.status() == SurveyStatus::Active, open);
            }
        })
        .when("the owner is granted both questions", |ctx| {
            for q in 0..2 {
                ctx.harness.survey.grant_owner_decrypt(&ctx.harness.owner, &q);
            }
            let q0 = ctx.harness.question(0);
            ctx.store("q0_total", q0.total);
            ctx.store("q0_sum_squares", q0.sum_squares);
        })
        .with_invariants(InvariantSet::survey_defaults())
        .then("every aggregate is readable by the owner", |ctx| {
            let h = ctx.harness;
            for q in 0..2 {
                let stats = h.survey.get_question_statistics(&q);
                for handle in [stats.total, stats.sum_squares, stats.min_score, stats.max_score] {
                    assert!(h.executor.is_allowed(&handle, &h.owner));
                }
                for handle in h.survey.get_question_frequencies(&q).iter() {
                    assert!(h.executor.is_allowed(&handle, &h.owner));
                }
            }
        })
        .then("frequencies sum to five", |ctx| {
            let q0 = ctx.harness.question(0);
            let q1 = ctx.harness.question(1);
            assert_eq!(q0.respondents(), 5);
            assert_eq!(q1.respondents(), 5);
            assert_eq!(q0.frequencies, std::vec![1, 0, 2, 1, 1]);
            assert_eq!((q1.min, q1.max), (2, 10));
            assert_eq!(ctx.harness.total_respondents(), 5);
        })
        .then("mean and variance follow from the aggregates", |ctx| {
            let n = ctx.harness.total_respondents() as f64;
            let mean = ctx.load("q0_total") as f64 / n;
            let variance = ctx.load("q0_sum_squares") as f64 / n - mean * mean;
            assert_within_tolerance!(mean, 3.2, 0.01);
            assert_within_tolerance!(variance, 1.76, 0.01);
        })
        .run();
}

#[test]
fn test_scenario_respondent_sees_only_own_answer() {
    Scenario::new("respondent grant is scoped to the respondent")
        .with_questions(2)
        .with_limit(2)
        .given(|ctx| ctx.harness.publish(&[4, 4]))
        .when("two respondents answer and the survey closes", |ctx| {
            ctx.respond(&[4, 1]);
            ctx.respond(&[2, 2]);
        })
        .when("the first respondent is granted question 1", |ctx| {
            let alice = ctx.respondents[0].clone();
            ctx.harness.survey.grant_respondent_decrypt(&alice, &1);
        })
        .then("only that answer is allowed", |ctx| {
            let h = ctx.harness;
            let alice = &ctx.respondents[0];
            let bob = &ctx.respondents[1];
            let mine = h.survey.get_respondent(alice).unwrap();
            let theirs = h.survey.get_respondent(bob).unwrap();
            assert!(h.executor.is_allowed(&mine.answers.get(1).unwrap(), alice));
            assert!(!h.executor.is_allowed(&mine.answers.get(0).unwrap(), alice));
            assert!(!h.executor.is_allowed(&theirs.answers.get(1).unwrap(), alice));

            let stats = h.survey.get_question_statistics(&1);
            assert!(!h.executor.is_allowed(&stats.total, alice));
        })
        .run();
}

#[test]
fn test_scenario_outsider_cannot_request_respondent_grant() {
    Scenario::new("grant for a non-respondent")
        .with_limit(1)
        .given(|ctx| ctx.harness.publish(&[3]))
        .when("the survey fills", |ctx| {
            ctx.respond(&[2]);
        })
        .then("an outsider is refused", |ctx| {
            let outsider: Address = ctx.harness.env.generate_address();
            assert_contract_error!(
                ctx.harness.survey.try_grant_respondent_decrypt(&outsider, &0),
                SurveyError::NotRespondent
            );
        })
        .run();
}

#[test]
fn test_run_scenarios_reports_failures() {
    let scenarios = std::vec![
        Scenario::new("passes").given(|ctx| ctx.harness.publish(&[2])),
        Scenario::new("fails").then("always panics", |_| panic!("expected failure")),
    ];
    let (passed, failed) = run_scenarios(scenarios);
    assert_eq!((passed, failed), (1, 1));
}
