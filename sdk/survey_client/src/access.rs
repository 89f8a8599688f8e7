//! Off-chain confirmation that a decryption grant landed on the ledger.
//!
//! Records are keyed by `(contract, account, question, kind)` and never
//! revoked. An owner grant and a respondent grant on the same question are
//! distinct records.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use soroban_sdk::{xdr::ToXdr, Address, Env};
use tracing::info;

use crate::error::{ClientError, Result};

/// Stable textual id of a ledger address: hex of its XDR encoding.
pub fn account_id(env: &Env, address: &Address) -> String {
    let xdr = address.clone().to_xdr(env);
    hex::encode(xdr.iter().collect::<Vec<u8>>())
}

/// Which on-chain grant a confirmation stands for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Every aggregate of the question, granted to the survey owner.
    Owner,
    /// The respondent's own answer to the question.
    Respondent,
}

impl GrantKind {
    fn tag(self) -> u8 {
        match self {
            GrantKind::Owner => 1,
            GrantKind::Respondent => 2,
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub contract: String,
    pub account: String,
    pub question: u32,
    pub kind: GrantKind,
}

impl AccessGrant {
    pub fn new(contract: &str, account: &str, question: u32, kind: GrantKind) -> Self {
        Self {
            contract: contract.to_string(),
            account: account.to_string(),
            question,
            kind,
        }
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.contract.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.account.as_bytes());
        hasher.update(self.question.to_be_bytes());
        hasher.update([self.kind.tag()]);
        hex::encode(hasher.finalize())
    }
}

pub trait AccessStore {
    fn grant(&self, contract: &str, account: &str, question: u32, kind: GrantKind) -> Result<()>;
    fn check(&self, contract: &str, account: &str, question: u32, kind: GrantKind)
        -> Result<bool>;
}

#[derive(Default)]
pub struct MemoryAccessStore {
    grants: RwLock<HashSet<AccessGrant>>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccessStore for MemoryAccessStore {
    fn grant(&self, contract: &str, account: &str, question: u32, kind: GrantKind) -> Result<()> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| ClientError::Poisoned("access store"))?;
        if grants.insert(AccessGrant::new(contract, account, question, kind)) {
            info!(contract, account, question, ?kind, "access confirmed");
        }
        Ok(())
    }

    fn check(
        &self,
        contract: &str,
        account: &str,
        question: u32,
        kind: GrantKind,
    ) -> Result<bool> {
        let grants = self
            .grants
            .read()
            .map_err(|_| ClientError::Poisoned("access store"))?;
        Ok(grants.contains(&AccessGrant::new(contract, account, question, kind)))
    }
}

/// One JSON marker file per grant under `root`.
pub struct FsAccessStore {
    root: PathBuf,
}

impl FsAccessStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_of(&self, grant: &AccessGrant) -> PathBuf {
        self.root.join(format!("{}.json", grant.digest()))
    }
}

impl AccessStore for FsAccessStore {
    fn grant(&self, contract: &str, account: &str, question: u32, kind: GrantKind) -> Result<()> {
        let grant = AccessGrant::new(contract, account, question, kind);
        let path = self.path_of(&grant);
        if !path.exists() {
            fs::write(&path, serde_json::to_vec(&grant)?)?;
            info!(contract, account, question, ?kind, "access confirmed");
        }
        Ok(())
    }

    fn check(
        &self,
        contract: &str,
        account: &str,
        question: u32,
        kind: GrantKind,
    ) -> Result<bool> {
        let grant = AccessGrant::new(contract, account, question, kind);
        let path = self.path_of(&grant);
        if !path.exists() {
            return Ok(false);
        }
        let stored: AccessGrant = serde_json::from_slice(&fs::read(path)?)?;
        Ok(stored == grant)
    }
}
