//! Content-addressed storage for survey metadata and question sets.
//!
//! A [`Cid`] is the lowercase hex SHA-256 of a document's canonical JSON
//! encoding (object keys sorted, no whitespace), so equal documents share an
//! identifier and writing one twice is a no-op.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ClientError, Result};

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Cid(String);

impl Cid {
    pub fn of(content: &Value) -> Result<Self> {
        let bytes = serde_json::to_vec(content)?;
        Ok(Cid(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == 64
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(ClientError::InvalidCid(raw.to_string()));
        }
        Ok(Cid(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait ContentStore {
    fn get(&self, cid: &Cid) -> Result<Value>;

    /// Store `content` and return its identifier. `owner` is recorded for
    /// auditing only and does not affect the identifier.
    fn put(&self, content: &Value, owner: Option<&str>) -> Result<Cid>;

    fn get_typed<T: for<'de> Deserialize<'de>>(&self, cid: &Cid) -> Result<T> {
        let value = self.get(cid)?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidDocument(e.to_string()))
    }

    fn put_typed<T: Serialize>(&self, content: &T, owner: Option<&str>) -> Result<Cid> {
        self.put(&serde_json::to_value(content)?, owner)
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<Cid, Value>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, cid: &Cid) -> Result<Value> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| ClientError::Poisoned("content store"))?;
        blobs
            .get(cid)
            .cloned()
            .ok_or_else(|| ClientError::ContentNotFound(cid.to_string()))
    }

    fn put(&self, content: &Value, owner: Option<&str>) -> Result<Cid> {
        let cid = Cid::of(content)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| ClientError::Poisoned("content store"))?;
        if blobs.contains_key(&cid) {
            debug!(%cid, "content already present");
        } else {
            blobs.insert(cid.clone(), content.clone());
            info!(%cid, owner = owner.unwrap_or("-"), "stored content");
        }
        Ok(cid)
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// One `<cid>.json` file per document under `root`.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_of(&self, cid: &Cid) -> PathBuf {
        self.root.join(format!("{cid}.json"))
    }
}

impl ContentStore for FsContentStore {
    fn get(&self, cid: &Cid) -> Result<Value> {
        let path = self.path_of(cid);
        if !path.exists() {
            return Err(ClientError::ContentNotFound(cid.to_string()));
        }
        let raw = fs::read(&path)?;
        let value: Value = serde_json::from_slice(&raw)?;
        if Cid::of(&value)? != *cid {
            return Err(ClientError::InvalidDocument(format!(
                "{} does not hash to its name",
                path.display()
            )));
        }
        Ok(value)
    }

    fn put(&self, content: &Value, owner: Option<&str>) -> Result<Cid> {
        let cid = Cid::of(content)?;
        let path = self.path_of(&cid);
        if path.exists() {
            debug!(%cid, "content already present");
            return Ok(cid);
        }
        fs::write(&path, serde_json::to_vec(content)?)?;
        info!(%cid, owner = owner.unwrap_or("-"), path = %path.display(), "stored content");
        Ok(cid)
    }
}

// ── Documents ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub max_score: u32,
    #[serde(default)]
    pub min_label: String,
    #[serde(default)]
    pub max_label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn len(&self) -> u32 {
        self.questions.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question_indices(&self) -> Vec<u32> {
        (0..self.len()).collect()
    }

    pub fn max_scores(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.max_score).collect()
    }
}
