//! On-chain half of the decryption grants.
//!
//! Owner and respondent grants cover disjoint ciphertext sets: the owner gets
//! a question's aggregates, a respondent gets only their own answer.

use soroban_sdk::{Address, BytesN, Env, Vec};

use crate::fhe::Fhe;
use crate::statistics;
use crate::types::{RespondentRecord, SurveyError};

/// Every aggregate handle of question `index`, buckets last.
pub fn aggregate_handles(env: &Env, index: u32) -> Result<Vec<BytesN<32>>, SurveyError> {
    let stats = statistics::load(env, index)?;
    let mut handles = Vec::new(env);
    handles.push_back(stats.total);
    handles.push_back(stats.sum_squares);
    handles.push_back(stats.min_score);
    handles.push_back(stats.max_score);
    for bucket in statistics::frequencies(env, index)?.iter() {
        handles.push_back(bucket);
    }
    Ok(handles)
}

pub fn grant_aggregates(
    env: &Env,
    fhe: &Fhe,
    index: u32,
    owner: &Address,
) -> Result<u32, SurveyError> {
    let handles = aggregate_handles(env, index)?;
    for handle in handles.iter() {
        fhe.allow(&handle, owner);
    }
    Ok(handles.len())
}

pub fn grant_own_answer(
    fhe: &Fhe,
    record: &RespondentRecord,
    index: u32,
    respondent: &Address,
) -> Result<BytesN<32>, SurveyError> {
    let answer = record.answers.get(index).ok_or(SurveyError::BadIndex)?;
    fhe.allow(&answer, respondent);
    Ok(answer)
}
