//! Encrypted per-question aggregates.
//!
//! A rating is folded by the executor's `accumulate` circuit, which touches
//! every bucket. Nothing here branches on a rating.

use soroban_sdk::{BytesN, Env, Vec};

use common::{set_persistent, FheType, Tally};

use crate::fhe::Fhe;
use crate::types::{DataKey, QuestionStatistics, SurveyError};

const RATING: FheType = FheType::Uint8;
const COUNT: FheType = FheType::Uint16;
const SQUARES: FheType = FheType::Uint32;

/// Fresh aggregates for one question: zero sums, empty buckets, and extrema
/// seeded so the first rating replaces both.
pub fn allocate(env: &Env, fhe: &Fhe, index: u32, max_score_bound: u32) {
    let zero_count = fhe.constant(0, COUNT);
    let stats = QuestionStatistics {
        total: zero_count.clone(),
        sum_squares: fhe.constant(0, SQUARES),
        min_score: fhe.constant(RATING.max_value(), RATING),
        max_score: fhe.constant(0, RATING),
        max_score_bound,
    };
    let mut buckets = Vec::new(env);
    for _ in 0..max_score_bound {
        buckets.push_back(zero_count.clone());
    }
    set_persistent(env, &DataKey::Stats(index), &stats);
    set_persistent(env, &DataKey::Frequencies(index), &buckets);
}

pub fn load(env: &Env, index: u32) -> Result<QuestionStatistics, SurveyError> {
    env.storage()
        .persistent()
        .get(&DataKey::Stats(index))
        .ok_or(SurveyError::BadIndex)
}

pub fn frequencies(env: &Env, index: u32) -> Result<Vec<BytesN<32>>, SurveyError> {
    env.storage()
        .persistent()
        .get(&DataKey::Frequencies(index))
        .ok_or(SurveyError::BadIndex)
}

/// Clamp `rating` into the question's scale and fold it into question
/// `index`. Returns the clamped rating.
pub fn record(
    env: &Env,
    fhe: &Fhe,
    index: u32,
    rating: &BytesN<32>,
) -> Result<BytesN<32>, SurveyError> {
    let mut stats = load(env, index)?;
    let tally = Tally {
        total: stats.total.clone(),
        sum_squares: stats.sum_squares.clone(),
        min: stats.min_score.clone(),
        max: stats.max_score.clone(),
        buckets: frequencies(env, index)?,
    };

    let update = fhe.accumulate(&tally, rating, stats.max_score_bound);
    stats.total = update.tally.total;
    stats.sum_squares = update.tally.sum_squares;
    stats.min_score = update.tally.min;
    stats.max_score = update.tally.max;

    set_persistent(env, &DataKey::Stats(index), &stats);
    set_persistent(env, &DataKey::Frequencies(index), &update.tally.buckets);
    Ok(update.rating)
}
