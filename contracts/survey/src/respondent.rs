use common::set_persistent;
use soroban_sdk::{Address, BytesN, Env, Vec};

use crate::fhe::Fhe;
use crate::types::{DataKey, RespondentRecord, SurveyError};

pub fn get(env: &Env, respondent: &Address) -> Option<RespondentRecord> {
    env.storage()
        .persistent()
        .get(&DataKey::Respondent(respondent.clone()))
}

pub fn has_responded(env: &Env, respondent: &Address) -> bool {
    get(env, respondent).map(|r| r.has_responded).unwrap_or(false)
}

pub fn require_fresh(env: &Env, respondent: &Address) -> Result<(), SurveyError> {
    if has_responded(env, respondent) {
        return Err(SurveyError::AlreadyResponded);
    }
    Ok(())
}

/// Build and persist the record for `answers` along with the respondent's
/// own encrypted extrema.
pub fn store(
    env: &Env,
    fhe: &Fhe,
    respondent: &Address,
    answers: Vec<BytesN<32>>,
) -> RespondentRecord {
    let (min_score, max_score) = fhe.extrema(&answers);

    let record = RespondentRecord {
        has_responded: true,
        answers,
        min_score,
        max_score,
        submitted_at: env.ledger().timestamp(),
    };
    set_persistent(env, &DataKey::Respondent(respondent.clone()), &record);
    record
}

pub fn total(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::TotalRespondents)
        .unwrap_or(0)
}

pub fn increment_total(env: &Env) -> u32 {
    let next = total(env).saturating_add(1);
    env.storage()
        .instance()
        .set(&DataKey::TotalRespondents, &next);
    next
}
