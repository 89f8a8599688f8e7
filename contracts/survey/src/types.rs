//! Survey data model, storage keys and error codes.

use soroban_sdk::{contracterror, contracttype, Address, BytesN, String, Vec};

/// Upper bound on `respondent_limit`.
pub const MAX_RESPONDENTS: u32 = 1_000;
/// Inclusive bounds on a question's declared scale ceiling.
pub const MIN_MAX_SCORE: u32 = 2;
pub const MAX_MAX_SCORE: u32 = 10;

// ── Storage keys ─────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Survey,
    Executor,
    TotalRespondents,
    Stats(u32),
    Frequencies(u32),
    Respondent(Address),
    TransitionLog,
    LastTransitionHash,
}

// ── Survey ───────────────────────────────────────────────────────────────────

/// Lifecycle state of a survey.
///
/// ```text
/// Created ──► Active ──► Closed
///    │
///    └──────► Trashed
/// ```
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum SurveyStatus {
    Created = 0,
    Active = 1,
    Closed = 2,
    Trashed = 3,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Survey {
    pub owner: Address,
    pub title: String,
    /// CID of the title/description/instructions document.
    pub metadata_cid: String,
    /// CID of the question text and scale definitions.
    pub questions_cid: String,
    pub total_questions: u32,
    pub respondent_limit: u32,
    pub status: SurveyStatus,
    pub created_at: u64,
}

// ── Encrypted records ────────────────────────────────────────────────────────

/// Running encrypted aggregates for one question.
///
/// Frequency buckets live under their own key, see
/// [`DataKey::Frequencies`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuestionStatistics {
    /// Σ v, euint16.
    pub total: BytesN<32>,
    /// Σ v², euint32.
    pub sum_squares: BytesN<32>,
    /// min v, euint8.
    pub min_score: BytesN<32>,
    /// max v, euint8.
    pub max_score: BytesN<32>,
    /// Plaintext scale ceiling; ratings are `1..=max_score_bound`.
    pub max_score_bound: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RespondentRecord {
    pub has_responded: bool,
    /// One euint8 per question, as counted.
    pub answers: Vec<BytesN<32>>,
    pub min_score: BytesN<32>,
    pub max_score: BytesN<32>,
    pub submitted_at: u64,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum SurveyError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    /// "not owner"
    NotOwner = 10,
    /// "not respondent"
    NotRespondent = 11,
    /// "bad respondentLimit"
    BadRespondentLimit = 30,
    /// "totalQuestions = 0"
    ZeroQuestions = 31,
    /// "length mismatch"
    LengthMismatch = 32,
    /// "maxScore invalid"
    MaxScoreInvalid = 33,
    /// "bad index"
    BadIndex = 34,
    DuplicateQuestion = 35,
    QuestionCountMismatch = 36,
    /// "wrong responses len"
    WrongResponsesLen = 37,
    /// "wrong proofs len"
    WrongProofsLen = 38,
    InvalidCiphertext = 39,
    /// "immutable state"
    ImmutableState = 40,
    /// "not active"
    NotActive = 41,
    /// "not closed"
    NotClosed = 42,
    /// "already active"
    AlreadyActive = 43,
    /// "already responded"
    AlreadyResponded = 44,
}
