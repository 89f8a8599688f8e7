//! Client-side input encryption.
//!
//! Ratings are encrypted under the network key in the executor's input wire
//! format and paired with the input verifier's attestation binding each
//! ciphertext to the survey contract and the respondent.

use common::{encode_input, input_digest, FheType, INPUT_NONCE_LEN};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use soroban_sdk::{Address, Bytes, BytesN, Env, Vec};
use tracing::debug;

/// Key material published by the executor network.
#[derive(Clone)]
pub struct NetworkKeys {
    pub network_key: [u8; 32],
    pub input_verifier: SigningKey,
}

impl NetworkKeys {
    pub fn new(network_key: [u8; 32], verifier_seed: [u8; 32]) -> Self {
        Self {
            network_key,
            input_verifier: SigningKey::from_bytes(&verifier_seed),
        }
    }

    pub fn verifier_public_key(&self) -> [u8; 32] {
        self.input_verifier.verifying_key().to_bytes()
    }
}

/// Ciphertexts and proofs ready for `submit_responses`.
pub struct EncryptedInput {
    pub answers: Vec<Bytes>,
    pub proofs: Vec<BytesN<64>>,
}

pub struct InputEncryptor {
    keys: NetworkKeys,
    rng: StdRng,
}

impl InputEncryptor {
    pub fn new(keys: NetworkKeys) -> Self {
        Self {
            keys,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic nonces, for reproducible runs.
    pub fn with_seed(keys: NetworkKeys, seed: u64) -> Self {
        Self {
            keys,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn encrypt(
        &mut self,
        env: &Env,
        contract: &Address,
        user: &Address,
        fhe_type: FheType,
        value: u32,
    ) -> (Bytes, BytesN<64>) {
        let mut nonce = [0u8; INPUT_NONCE_LEN];
        self.rng.fill_bytes(&mut nonce);

        let key = BytesN::from_array(env, &self.keys.network_key);
        let ciphertext = encode_input(env, &key, fhe_type, &nonce, value);
        let digest = input_digest(env, &ciphertext, contract, user);
        let signature = self.keys.input_verifier.sign(&digest.to_array());
        (ciphertext, BytesN::from_array(env, &signature.to_bytes()))
    }

    /// Encrypt one rating per question, in question order.
    pub fn encrypt_ratings(
        &mut self,
        env: &Env,
        contract: &Address,
        respondent: &Address,
        ratings: &[u8],
    ) -> EncryptedInput {
        let mut answers = Vec::new(env);
        let mut proofs = Vec::new(env);
        for rating in ratings {
            let (ct, proof) = self.encrypt(env, contract, respondent, FheType::Uint8, *rating as u32);
            answers.push_back(ct);
            proofs.push_back(proof);
        }
        debug!(questions = ratings.len(), "encrypted ratings");
        EncryptedInput { answers, proofs }
    }
}
