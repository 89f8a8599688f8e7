#![no_std]

//! # Confidential Survey
//!
//! One contract instance per survey. Ratings arrive as executor ciphertexts
//! and are folded into encrypted per-question aggregates; plaintext never
//! touches contract storage.
//!
//! - **Lifecycle**: `Created → Active → Closed`, or `Created → Trashed`.
//!   Metadata is editable only while `Created`; responses are accepted only
//!   while `Active`; the survey closes itself when the respondent limit is
//!   reached.
//! - **Statistics**: sum, sum of squares, min, max and a frequency histogram
//!   per question, updated with oblivious selects only.
//! - **Grants**: once `Closed`, the owner may be allowed to decrypt a
//!   question's aggregates and each respondent their own answer.

pub mod access;
pub mod events;
pub mod fhe;
pub mod lifecycle;
pub mod respondent;
pub mod statistics;
pub mod types;


use fhe::Fhe;
use lifecycle::{LifecycleAction, TransitionRecord};
use soroban_sdk::{contract, contractimpl, Address, Bytes, BytesN, Env, String, Vec};
pub use types::*;

#[contract]
pub struct SurveyContract;

#[contractimpl]
impl SurveyContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Create the survey in `Created`.
    ///
    /// * `executor` — FHE executor every ciphertext operation is sent to.
    /// * `respondent_limit` — `1..=MAX_RESPONDENTS`; reaching it closes the
    ///   survey.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        owner: Address,
        executor: Address,
        title: String,
        metadata_cid: String,
        questions_cid: String,
        total_questions: u32,
        respondent_limit: u32,
    ) -> Result<(), SurveyError> {
        if env.storage().instance().has(&DataKey::Survey) {
            return Err(SurveyError::AlreadyInitialized);
        }
        owner.require_auth();

        if total_questions == 0 {
            return Err(SurveyError::ZeroQuestions);
        }
        if respondent_limit == 0 || respondent_limit > MAX_RESPONDENTS {
            return Err(SurveyError::BadRespondentLimit);
        }

        let survey = Survey {
            owner: owner.clone(),
            title,
            metadata_cid,
            questions_cid,
            total_questions,
            respondent_limit,
            status: SurveyStatus::Created,
            created_at: env.ledger().timestamp(),
        };
        env.storage().instance().set(&DataKey::Executor, &executor);
        env.storage().instance().set(&DataKey::TotalRespondents, &0u32);
        Self::save(&env, &survey);

        events::publish_survey_created(&env, &owner, total_questions, respondent_limit);
        Ok(())
    }

    // ── Editing (Created only) ────────────────────────────────────────────────

    pub fn update_survey_metadata(
        env: Env,
        caller: Address,
        metadata_cid: String,
    ) -> Result<(), SurveyError> {
        let mut survey = Self::editable(&env, &caller)?;
        survey.metadata_cid = metadata_cid.clone();
        Self::save(&env, &survey);
        events::publish_metadata_updated(&env, &metadata_cid);
        Ok(())
    }

    pub fn update_questions(
        env: Env,
        caller: Address,
        questions_cid: String,
        total_questions: u32,
    ) -> Result<(), SurveyError> {
        let mut survey = Self::editable(&env, &caller)?;
        if total_questions == 0 {
            return Err(SurveyError::ZeroQuestions);
        }
        survey.questions_cid = questions_cid;
        survey.total_questions = total_questions;
        Self::save(&env, &survey);
        events::publish_questions_updated(&env, total_questions);
        Ok(())
    }

    pub fn update_title(env: Env, caller: Address, title: String) -> Result<(), SurveyError> {
        let mut survey = Self::editable(&env, &caller)?;
        survey.title = title.clone();
        Self::save(&env, &survey);
        events::publish_title_updated(&env, &title);
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Open the survey for responses and allocate the encrypted aggregates.
    ///
    /// `question_indices[i]` gets scale `1..=max_scores[i]`. Every question
    /// must be listed exactly once.
    pub fn publish_survey(
        env: Env,
        caller: Address,
        question_indices: Vec<u32>,
        max_scores: Vec<u32>,
    ) -> Result<(), SurveyError> {
        let mut survey = Self::owned(&env, &caller)?;
        lifecycle::require_status(&survey, SurveyStatus::Created)?;

        if question_indices.len() != max_scores.len() {
            return Err(SurveyError::LengthMismatch);
        }
        if question_indices.len() != survey.total_questions {
            return Err(SurveyError::QuestionCountMismatch);
        }
        for max_score in max_scores.iter() {
            if !(MIN_MAX_SCORE..=MAX_MAX_SCORE).contains(&max_score) {
                return Err(SurveyError::MaxScoreInvalid);
            }
        }
        for (pos, index) in question_indices.iter().enumerate() {
            if index >= survey.total_questions {
                return Err(SurveyError::BadIndex);
            }
            if question_indices.iter().take(pos).any(|seen| seen == index) {
                return Err(SurveyError::DuplicateQuestion);
            }
        }

        let fhe = Fhe::load(&env)?;
        for (index, max_score) in question_indices.iter().zip(max_scores.iter()) {
            statistics::allocate(&env, &fhe, index, max_score);
        }

        lifecycle::apply_transition(&env, &mut survey, LifecycleAction::Publish, &caller)?;
        Self::save(&env, &survey);
        events::publish_survey_published(&env, survey.total_questions);
        Ok(())
    }

    /// Record one respondent's encrypted ratings, one per question in index
    /// order. Closes the survey when this response fills the last slot.
    pub fn submit_responses(
        env: Env,
        respondent: Address,
        answers: Vec<Bytes>,
        proofs: Vec<BytesN<64>>,
    ) -> Result<(), SurveyError> {
        let mut survey = Self::load(&env)?;
        respondent.require_auth();
        lifecycle::require_status(&survey, SurveyStatus::Active)?;

        if answers.len() != survey.total_questions {
            return Err(SurveyError::WrongResponsesLen);
        }
        if proofs.len() != survey.total_questions {
            return Err(SurveyError::WrongProofsLen);
        }
        respondent::require_fresh(&env, &respondent)?;

        let fhe = Fhe::load(&env)?;

        // admit every ciphertext before any aggregate moves
        let mut ratings = Vec::new(&env);
        for (answer, proof) in answers.iter().zip(proofs.iter()) {
            ratings.push_back(fhe.ingest_rating(&respondent, &answer, &proof)?);
        }

        let mut counted = Vec::new(&env);
        for (index, rating) in ratings.iter().enumerate() {
            counted.push_back(statistics::record(&env, &fhe, index as u32, &rating)?);
        }
        respondent::store(&env, &fhe, &respondent, counted);

        let total = respondent::increment_total(&env);
        events::publish_response_recorded(&env, &respondent, total);

        if total == survey.respondent_limit {
            let this = env.current_contract_address();
            Self::close(&env, &mut survey, &this, total)?;
        }
        Ok(())
    }

    pub fn close_survey(env: Env, caller: Address) -> Result<(), SurveyError> {
        let mut survey = Self::owned(&env, &caller)?;
        let total = respondent::total(&env);
        Self::close(&env, &mut survey, &caller, total)
    }

    pub fn delete_survey(env: Env, caller: Address) -> Result<(), SurveyError> {
        let mut survey = Self::owned(&env, &caller)?;
        lifecycle::apply_transition(&env, &mut survey, LifecycleAction::Delete, &caller)?;
        Self::save(&env, &survey);
        events::publish_survey_deleted(&env, &caller);
        Ok(())
    }

    // ── Decryption grants (Closed only) ───────────────────────────────────────

    /// Allow the owner to decrypt every aggregate of question `index`.
    pub fn grant_owner_decrypt(env: Env, caller: Address, index: u32) -> Result<(), SurveyError> {
        let survey = Self::owned(&env, &caller)?;
        lifecycle::require_status(&survey, SurveyStatus::Closed)?;
        if index >= survey.total_questions {
            return Err(SurveyError::BadIndex);
        }

        let fhe = Fhe::load(&env)?;
        let granted = access::grant_aggregates(&env, &fhe, index, &survey.owner)?;
        events::publish_owner_grant(&env, &survey.owner, index, granted);
        Ok(())
    }

    /// Allow a respondent to decrypt their own answer to question `index`.
    pub fn grant_respondent_decrypt(
        env: Env,
        caller: Address,
        index: u32,
    ) -> Result<(), SurveyError> {
        let survey = Self::load(&env)?;
        caller.require_auth();
        lifecycle::require_status(&survey, SurveyStatus::Closed)?;

        let record = respondent::get(&env, &caller)
            .filter(|r| r.has_responded)
            .ok_or(SurveyError::NotRespondent)?;
        if index >= survey.total_questions {
            return Err(SurveyError::BadIndex);
        }

        let fhe = Fhe::load(&env)?;
        let answer = access::grant_own_answer(&fhe, &record, index, &caller)?;
        events::publish_respondent_grant(&env, &caller, index, &answer);
        Ok(())
    }

    // ── View functions ────────────────────────────────────────────────────────

    pub fn survey(env: Env) -> Result<Survey, SurveyError> {
        Self::load(&env)
    }

    pub fn status(env: Env) -> Result<SurveyStatus, SurveyError> {
        Self::load(&env).map(|s| s.status)
    }

    pub fn total_respondents(env: Env) -> u32 {
        respondent::total(&env)
    }

    /// Encrypted aggregate handles; meaningless without a grant.
    pub fn get_question_statistics(env: Env, index: u32) -> Result<QuestionStatistics, SurveyError> {
        statistics::load(&env, index)
    }

    /// Bucket `k - 1` counts ratings equal to `k`.
    pub fn get_question_frequencies(env: Env, index: u32) -> Result<Vec<BytesN<32>>, SurveyError> {
        statistics::frequencies(&env, index)
    }

    pub fn max_score_of(env: Env, index: u32) -> Result<u32, SurveyError> {
        statistics::load(&env, index).map(|s| s.max_score_bound)
    }

    pub fn has_responded(env: Env, account: Address) -> bool {
        respondent::has_responded(&env, &account)
    }

    pub fn get_respondent(env: Env, account: Address) -> Option<RespondentRecord> {
        respondent::get(&env, &account)
    }

    pub fn get_transition_log(env: Env) -> Vec<TransitionRecord> {
        lifecycle::transition_log(&env)
    }

    pub fn executor(env: Env) -> Result<Address, SurveyError> {
        env.storage()
            .instance()
            .get(&DataKey::Executor)
            .ok_or(SurveyError::NotInitialized)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn load(env: &Env) -> Result<Survey, SurveyError> {
        env.storage()
            .instance()
            .get(&DataKey::Survey)
            .ok_or(SurveyError::NotInitialized)
    }

    fn save(env: &Env, survey: &Survey) {
        env.storage().instance().set(&DataKey::Survey, survey);
    }

    /// Authenticated owner check. Runs before any state check.
    fn owned(env: &Env, caller: &Address) -> Result<Survey, SurveyError> {
        let survey = Self::load(env)?;
        caller.require_auth();
        if *caller != survey.owner {
            return Err(SurveyError::NotOwner);
        }
        Ok(survey)
    }

    fn editable(env: &Env, caller: &Address) -> Result<Survey, SurveyError> {
        let survey = Self::owned(env, caller)?;
        lifecycle::require_status(&survey, SurveyStatus::Created)?;
        Ok(survey)
    }

    fn close(
        env: &Env,
        survey: &mut Survey,
        actor: &Address,
        total_respondents: u32,
    ) -> Result<(), SurveyError> {
        lifecycle::apply_transition(env, survey, LifecycleAction::Close, actor)?;
        Self::save(env, survey);
        events::publish_survey_closed(env, total_respondents);
        Ok(())
    }
}
