use common::ExecutorError;
use survey::SurveyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("survey contract rejected the call: {0:?}")]
    Survey(SurveyError),

    #[error("executor rejected the call: {0:?}")]
    Executor(ExecutorError),

    /// The host aborted the invocation or returned a value of the wrong
    /// shape. Replaying the same call aborts the same way.
    #[error("ledger invocation aborted: {0}")]
    Aborted(String),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    #[error("grant access first")]
    GrantAccessFirst,

    #[error("decryption refused for handle {handle}")]
    DecryptionRefused { handle: String },

    #[error("decryption request expired at {expired_at}")]
    RequestExpired { expired_at: u64 },

    #[error("decryption request signature does not verify")]
    BadSignature,

    #[error("no decryption key registered for {0}")]
    UnknownDecryptKey(String),

    #[error("content {0} not found")]
    ContentNotFound(String),

    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Transient failures worth retrying unchanged. Contract rejections,
    /// host aborts and protocol violations fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Io(_))
    }
}

impl From<SurveyError> for ClientError {
    fn from(e: SurveyError) -> Self {
        ClientError::Survey(e)
    }
}

impl From<ExecutorError> for ClientError {
    fn from(e: ExecutorError) -> Self {
        ClientError::Executor(e)
    }
}

/// Host error surfaced by entry points that do not return a contract error.
impl From<soroban_sdk::Error> for ClientError {
    fn from(e: soroban_sdk::Error) -> Self {
        ClientError::Aborted(format!("{e:?}"))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Flatten a generated `try_*` client result into a [`ClientError`].
pub(crate) fn flatten<T, C, E, I>(
    result: std::result::Result<std::result::Result<T, C>, std::result::Result<E, I>>,
) -> Result<T>
where
    C: core::fmt::Debug,
    E: Into<ClientError>,
    I: core::fmt::Debug,
{
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(conversion)) => Err(ClientError::Aborted(format!("{conversion:?}"))),
        Err(Ok(contract)) => Err(contract.into()),
        Err(Err(invoke)) => Err(ClientError::Aborted(format!("{invoke:?}"))),
    }
}
