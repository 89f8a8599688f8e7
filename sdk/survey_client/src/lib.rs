//! Off-chain client for confidential surveys.
//!
//! - [`content`] — content-addressed metadata and question documents.
//! - [`access`] — confirmation records for on-chain decryption grants.
//! - [`keys`] — rating encryption in the executor's input format.
//! - [`decrypt`] — signed decryption requests and the oracle serving them.
//! - [`session`] — publish, submit, grant and decrypt workflows.

pub mod access;
pub mod config;
pub mod content;
pub mod decrypt;
pub mod error;
pub mod keys;
pub mod session;
pub mod stats;


pub use access::{
    account_id, AccessGrant, AccessStore, FsAccessStore, GrantKind, MemoryAccessStore,
};
pub use config::ClientConfig;
pub use content::{
    Cid, ContentStore, FsContentStore, MemoryContentStore, Question, QuestionSet, SurveyMetadata,
};
pub use decrypt::{DecryptedValue, DecryptionOracle, DecryptionRequest};
pub use error::{ClientError, Result};
pub use keys::{EncryptedInput, InputEncryptor, NetworkKeys};
pub use session::SurveySession;
pub use stats::DecryptedStatistics;
