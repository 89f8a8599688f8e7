//! Signed decryption requests and the service that answers them.
//!
//! A requester signs a [`DecryptionRequest`] naming the handles it wants
//! opened with the ed25519 key it registered on the executor. The
//! [`DecryptionOracle`] checks the signature against that registration, the
//! validity window, and the executor ACL of every handle before unsealing
//! anything. One unauthorized handle refuses the whole request.

use common::{unseal, FheExecutorClient, FheType};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use soroban_sdk::{Address, BytesN, Env};
use tracing::{info, warn};

use crate::access::account_id;
use crate::error::{ClientError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub contract: String,
    pub requester: String,
    pub handles: Vec<String>,
    pub public_key: String,
    pub issued_at: u64,
    pub valid_for: u64,
    pub signature: String,
}

#[derive(Serialize)]
struct SignedFields<'a> {
    contract: &'a str,
    requester: &'a str,
    handles: &'a [String],
    public_key: &'a str,
    issued_at: u64,
    valid_for: u64,
}

impl DecryptionRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        env: &Env,
        contract: &Address,
        requester: &Address,
        handles: &[BytesN<32>],
        key: &SigningKey,
        issued_at: u64,
        valid_for: u64,
    ) -> Result<Self> {
        let mut request = DecryptionRequest {
            contract: account_id(env, contract),
            requester: account_id(env, requester),
            handles: handles.iter().map(|h| hex::encode(h.to_array())).collect(),
            public_key: hex::encode(key.verifying_key().to_bytes()),
            issued_at,
            valid_for,
            signature: String::new(),
        };
        let digest = request.digest()?;
        request.signature = hex::encode(key.sign(&digest).to_bytes());
        Ok(request)
    }

    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.valid_for)
    }

    fn digest(&self) -> Result<[u8; 32]> {
        let fields = SignedFields {
            contract: &self.contract,
            requester: &self.requester,
            handles: &self.handles,
            public_key: &self.public_key,
            issued_at: self.issued_at,
            valid_for: self.valid_for,
        };
        Ok(Sha256::digest(serde_json::to_vec(&fields)?).into())
    }

    fn verify(&self, registered: &[u8; 32]) -> Result<()> {
        if hex::encode(registered) != self.public_key {
            return Err(ClientError::BadSignature);
        }
        let key = VerifyingKey::from_bytes(registered).map_err(|_| ClientError::BadSignature)?;
        let raw = decode_fixed::<64>(&self.signature).ok_or(ClientError::BadSignature)?;
        let signature = Signature::from_bytes(&raw);
        key.verify(&self.digest()?, &signature)
            .map_err(|_| ClientError::BadSignature)
    }
}

fn decode_fixed<const N: usize>(raw: &str) -> Option<[u8; N]> {
    hex::decode(raw).ok()?.try_into().ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedValue {
    pub handle: BytesN<32>,
    pub fhe_type: FheType,
    pub value: u32,
}

pub struct DecryptionOracle<'a> {
    env: &'a Env,
    executor: FheExecutorClient<'a>,
    network_key: [u8; 32],
}

impl<'a> DecryptionOracle<'a> {
    pub fn new(env: &'a Env, executor: &Address, network_key: [u8; 32]) -> Self {
        Self {
            env,
            executor: FheExecutorClient::new(env, executor),
            network_key,
        }
    }

    pub fn decrypt(
        &self,
        request: &DecryptionRequest,
        requester: &Address,
        now: u64,
    ) -> Result<Vec<DecryptedValue>> {
        if account_id(self.env, requester) != request.requester {
            return Err(ClientError::BadSignature);
        }
        if now > request.expires_at() {
            return Err(ClientError::RequestExpired {
                expired_at: request.expires_at(),
            });
        }

        let registered = self
            .executor
            .decrypt_key(requester)
            .ok_or_else(|| ClientError::UnknownDecryptKey(request.requester.clone()))?;
        request.verify(&registered.to_array())?;

        let key = BytesN::from_array(self.env, &self.network_key);
        let mut values = Vec::with_capacity(request.handles.len());
        for raw in &request.handles {
            let bytes = decode_fixed::<32>(raw)
                .ok_or_else(|| ClientError::InvalidDocument(format!("bad handle {raw}")))?;
            let handle = BytesN::from_array(self.env, &bytes);

            if !self.executor.is_allowed(&handle, requester) {
                warn!(handle = %raw, "decryption refused: not on ACL");
                return Err(ClientError::DecryptionRefused {
                    handle: raw.clone(),
                });
            }
            let ct = self
                .executor
                .ciphertext(&handle)
                .ok_or_else(|| ClientError::DecryptionRefused {
                    handle: raw.clone(),
                })?;
            values.push(DecryptedValue {
                value: unseal(self.env, &key, &handle, ct.masked),
                fhe_type: ct.fhe_type,
                handle,
            });
        }

        info!(handles = values.len(), "decryption request served");
        Ok(values)
    }
}
