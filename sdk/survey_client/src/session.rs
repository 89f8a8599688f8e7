//! Survey workflows as a client sees them.
//!
//! Decryption is two-phase: an on-chain grant, then a confirmation written to
//! the [`AccessStore`]. Decrypt calls check the confirmation first and refuse
//! locally with [`ClientError::GrantAccessFirst`]; the oracle independently
//! refuses anything the executor ACL does not cover.

use ed25519_dalek::SigningKey;
use soroban_sdk::{Address, BytesN, Env, String as SorobanString, Vec as SorobanVec};
use survey::{SurveyContractClient, SurveyError, SurveyStatus};
use tracing::{info, instrument};

use crate::access::{account_id, AccessStore, FsAccessStore, GrantKind};
use crate::config::ClientConfig;
use crate::content::{Cid, ContentStore, FsContentStore, QuestionSet, SurveyMetadata};
use crate::decrypt::{DecryptionOracle, DecryptionRequest};
use crate::error::{flatten, ClientError, Result};
use crate::keys::InputEncryptor;
use crate::stats::DecryptedStatistics;

pub struct SurveySession<'a, C: ContentStore, A: AccessStore> {
    env: &'a Env,
    survey: SurveyContractClient<'a>,
    content: C,
    access: A,
    oracle: DecryptionOracle<'a>,
    config: ClientConfig,
}

impl<'a, C: ContentStore, A: AccessStore> SurveySession<'a, C, A> {
    pub fn new(
        env: &'a Env,
        survey: &Address,
        content: C,
        access: A,
        oracle: DecryptionOracle<'a>,
        config: ClientConfig,
    ) -> Self {
        Self {
            env,
            survey: SurveyContractClient::new(env, survey),
            content,
            access,
            oracle,
            config,
        }
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    fn contract_id(&self) -> std::string::String {
        account_id(self.env, &self.survey.address)
    }

    // ── Documents ─────────────────────────────────────────────────────────────

    /// Store the metadata and question documents, returning their CIDs.
    pub fn store_documents(
        &self,
        metadata: &SurveyMetadata,
        questions: &QuestionSet,
        owner: &Address,
    ) -> Result<(Cid, Cid)> {
        if questions.is_empty() {
            return Err(ClientError::InvalidDocument("survey has no questions".into()));
        }
        let owner_id = account_id(self.env, owner);
        let metadata_cid = self.content.put_typed(metadata, Some(&owner_id))?;
        let questions_cid = self.content.put_typed(questions, Some(&owner_id))?;
        Ok((metadata_cid, questions_cid))
    }

    /// Question set referenced by the survey's current `questions_cid`.
    pub fn questions(&self) -> Result<QuestionSet> {
        let survey = flatten(self.survey.try_survey())?;
        let cid = Cid::parse(&soroban_to_std(&survey.questions_cid))?;
        self.content.get_typed(&cid)
    }

    pub fn metadata(&self) -> Result<SurveyMetadata> {
        let survey = flatten(self.survey.try_survey())?;
        let cid = Cid::parse(&soroban_to_std(&survey.metadata_cid))?;
        self.content.get_typed(&cid)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Publish with the scales declared in the stored question set.
    #[instrument(skip(self, owner))]
    pub fn publish(&self, owner: &Address) -> Result<()> {
        let questions = self.questions()?;
        let indices = SorobanVec::from_slice(self.env, &questions.question_indices());
        let scores = SorobanVec::from_slice(self.env, &questions.max_scores());
        flatten(self.survey.try_publish_survey(owner, &indices, &scores))?;
        info!(questions = questions.len(), "survey published");
        Ok(())
    }

    /// Encrypt and submit one rating per question. Returns whether this
    /// response closed the survey.
    #[instrument(skip(self, respondent, encryptor, ratings))]
    pub fn submit(
        &self,
        respondent: &Address,
        encryptor: &mut InputEncryptor,
        ratings: &[u8],
    ) -> Result<bool> {
        let input =
            encryptor.encrypt_ratings(self.env, &self.survey.address, respondent, ratings);
        flatten(
            self.survey
                .try_submit_responses(respondent, &input.answers, &input.proofs),
        )?;
        let closed = flatten(self.survey.try_status())? == SurveyStatus::Closed;
        info!(closed, "response submitted");
        Ok(closed)
    }

    // ── Grants ────────────────────────────────────────────────────────────────

    /// On-chain owner grant for question `index`, then local confirmation.
    #[instrument(skip(self, owner))]
    pub fn grant_owner_access(&self, owner: &Address, index: u32) -> Result<()> {
        flatten(self.survey.try_grant_owner_decrypt(owner, &index))?;
        self.access.grant(
            &self.contract_id(),
            &account_id(self.env, owner),
            index,
            GrantKind::Owner,
        )
    }

    #[instrument(skip(self, respondent))]
    pub fn grant_respondent_access(&self, respondent: &Address, index: u32) -> Result<()> {
        flatten(self.survey.try_grant_respondent_decrypt(respondent, &index))?;
        self.access.grant(
            &self.contract_id(),
            &account_id(self.env, respondent),
            index,
            GrantKind::Respondent,
        )
    }

    pub fn has_access(&self, account: &Address, index: u32, kind: GrantKind) -> Result<bool> {
        self.access
            .check(&self.contract_id(), &account_id(self.env, account), index, kind)
    }

    // ── Decryption ────────────────────────────────────────────────────────────

    fn require_access(&self, account: &Address, index: u32, kind: GrantKind) -> Result<()> {
        if !self.has_access(account, index, kind)? {
            return Err(ClientError::GrantAccessFirst);
        }
        Ok(())
    }

    fn open(
        &self,
        requester: &Address,
        key: &SigningKey,
        handles: &[BytesN<32>],
        now: u64,
    ) -> Result<std::vec::Vec<u32>> {
        let request = DecryptionRequest::sign(
            self.env,
            &self.survey.address,
            requester,
            handles,
            key,
            now,
            self.config.request_validity_secs,
        )?;
        let values = self.oracle.decrypt(&request, requester, now)?;
        Ok(values.into_iter().map(|v| v.value).collect())
    }

    /// Decrypt every aggregate of question `index` for `owner`.
    #[instrument(skip(self, owner, key))]
    pub fn decrypt_statistics(
        &self,
        owner: &Address,
        key: &SigningKey,
        index: u32,
        now: u64,
    ) -> Result<DecryptedStatistics> {
        self.require_access(owner, index, GrantKind::Owner)?;

        let stats = flatten(self.survey.try_get_question_statistics(&index))?;
        let buckets = flatten(self.survey.try_get_question_frequencies(&index))?;
        let mut handles = std::vec![
            stats.total,
            stats.sum_squares,
            stats.min_score,
            stats.max_score,
        ];
        handles.extend(buckets.iter());

        let values = self.open(owner, key, &handles, now)?;
        match values.as_slice() {
            [total, sum_squares, min, max, frequencies @ ..] => Ok(DecryptedStatistics {
                total: *total,
                sum_squares: *sum_squares,
                min: *min,
                max: *max,
                frequencies: frequencies.to_vec(),
            }),
            _ => Err(ClientError::InvalidDocument(
                "aggregate handle list too short".into(),
            )),
        }
    }

    /// Decrypt the respondent's own answer to question `index`.
    pub fn decrypt_own_answer(
        &self,
        respondent: &Address,
        key: &SigningKey,
        index: u32,
        now: u64,
    ) -> Result<u32> {
        self.require_access(respondent, index, GrantKind::Respondent)?;
        let record = flatten(self.survey.try_get_respondent(respondent))?
            .ok_or(ClientError::Survey(SurveyError::NotRespondent))?;
        let answer = record
            .answers
            .get(index)
            .ok_or(ClientError::Survey(SurveyError::BadIndex))?;
        let values = self.open(respondent, key, &[answer], now)?;
        values
            .first()
            .copied()
            .ok_or_else(|| ClientError::InvalidDocument("empty decryption result".into()))
    }
}

impl<'a> SurveySession<'a, FsContentStore, FsAccessStore> {
    /// Session over file-backed stores rooted at the configured directories.
    pub fn from_config(
        env: &'a Env,
        survey: &Address,
        oracle: DecryptionOracle<'a>,
        config: ClientConfig,
    ) -> Result<Self> {
        let content = FsContentStore::open(&config.content_dir)?;
        let access = FsAccessStore::open(&config.access_dir)?;
        info!(
            content_dir = %config.content_dir.display(),
            access_dir = %config.access_dir.display(),
            "stores opened"
        );
        Ok(Self::new(env, survey, content, access, oracle, config))
    }
}

fn soroban_to_std(value: &SorobanString) -> std::string::String {
    let mut buf = std::vec![0u8; value.len() as usize];
    value.copy_into_slice(&mut buf);
    std::string::String::from_utf8_lossy(&buf).into_owned()
}
