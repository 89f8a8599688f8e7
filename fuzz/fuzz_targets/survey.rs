#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::{Bytes, String, Vec as SorobanVec};
use survey::SurveyStatus;
use test_framework::invariants::{InvariantSet, TransitionInvariantSet};
use test_framework::{SurveyTestHarness, TestEnv};

const QUESTIONS: u32 = 2;
const MAX_SCORES: [u32; 2] = [5, 3];

/// Actions modelling every survey entry point.
///
/// Ratings are raw `u8`s so the clamp sees the full input range; `SubmitRaw`
/// sends attested but otherwise arbitrary ciphertext bytes.
#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Publish,
    Submit { user: u8, ratings: [u8; 2] },
    SubmitRaw { user: u8, bytes: Vec<u8> },
    Close,
    Delete,
    UpdateTitle,
    GrantOwner { question: u8 },
    GrantRespondent { user: u8, question: u8 },
    AdvanceTime { delta: u16 },
}

fuzz_target!(|input: (u8, Vec<FuzzAction>)| {
    let (limit, actions) = input;
    let limit = (limit % 6) as u32 + 1;

    let env = TestEnv::new();
    let harness = SurveyTestHarness::new(&env, QUESTIONS, limit);
    let users = env.generate_addresses(4);
    let invariants = InvariantSet::survey_defaults();
    let transitions = TransitionInvariantSet::survey_defaults();

    let mut before = harness.snapshot();

    for action in actions.into_iter().take(24) {
        let user = |i: u8| &users[i as usize % users.len()];
        match action {
            FuzzAction::Publish => {
                let _ = harness.try_publish(&MAX_SCORES);
            }
            FuzzAction::Submit { user: u, ratings } => {
                let _ = harness.try_respond_as(user(u), &ratings);
            }
            FuzzAction::SubmitRaw { user: u, bytes } => {
                let respondent = user(u);
                let ct = Bytes::from_slice(&env.env, &bytes);
                let proof = harness.attest(respondent, &ct);
                let answers = SorobanVec::from_array(&env.env, [ct.clone(), ct]);
                let proofs = SorobanVec::from_array(&env.env, [proof.clone(), proof]);
                let _ = harness
                    .survey
                    .try_submit_responses(respondent, &answers, &proofs);
            }
            FuzzAction::Close => {
                let _ = harness.try_close();
            }
            FuzzAction::Delete => {
                let _ = harness.try_delete();
            }
            FuzzAction::UpdateTitle => {
                let _ = harness
                    .survey
                    .try_update_title(&harness.owner, &String::from_str(&env.env, "t"));
            }
            FuzzAction::GrantOwner { question } => {
                let _ = harness
                    .survey
                    .try_grant_owner_decrypt(&harness.owner, &(question as u32));
            }
            FuzzAction::GrantRespondent { user: u, question } => {
                let _ = harness
                    .survey
                    .try_grant_respondent_decrypt(user(u), &(question as u32));
            }
            FuzzAction::AdvanceTime { delta } => env.advance_time(delta as u64),
        }

        // ── Post-action invariant checks ──
        let after = harness.snapshot();
        invariants.assert_all(&after);
        transitions.assert_all(&before, &after);
        if after.status == SurveyStatus::Trashed {
            assert_eq!(after.total_respondents, 0, "INVARIANT VIOLATION: trashed survey has responses");
        }
        before = after;
    }
});
