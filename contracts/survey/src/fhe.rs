//! Thin binding of the executor client to this contract.
//!
//! Every executor call names the survey contract as `caller`, so the ACL of
//! each derived ciphertext includes the survey and it can later grant
//! decryption on anything it computed.

use common::{FheExecutorClient, FheType, Tally, TallyUpdate};
use soroban_sdk::{Address, Bytes, BytesN, Env, Vec};

use crate::types::{DataKey, SurveyError};

pub struct Fhe<'a> {
    client: FheExecutorClient<'a>,
    this: Address,
}

impl<'a> Fhe<'a> {
    pub fn load(env: &'a Env) -> Result<Self, SurveyError> {
        let executor: Address = env
            .storage()
            .instance()
            .get(&DataKey::Executor)
            .ok_or(SurveyError::NotInitialized)?;
        Ok(Self {
            client: FheExecutorClient::new(env, &executor),
            this: env.current_contract_address(),
        })
    }

    /// Admit a respondent's rating. Anything other than a well-formed,
    /// verifier-signed `Uint8` is rejected.
    pub fn ingest_rating(
        &self,
        respondent: &Address,
        ciphertext: &Bytes,
        proof: &BytesN<64>,
    ) -> Result<BytesN<32>, SurveyError> {
        let handle = match self
            .client
            .try_verify_input(&self.this, respondent, ciphertext, proof)
        {
            Ok(Ok(handle)) => handle,
            _ => return Err(SurveyError::InvalidCiphertext),
        };
        match self.client.try_fhe_type(&handle) {
            Ok(Ok(FheType::Uint8)) => Ok(handle),
            _ => Err(SurveyError::InvalidCiphertext),
        }
    }

    pub fn constant(&self, value: u32, fhe_type: FheType) -> BytesN<32> {
        self.client.trivial_encrypt(&self.this, &value, &fhe_type)
    }

    /// Clamp `rating` into `1..=bound` and fold it into `tally`.
    pub fn accumulate(&self, tally: &Tally, rating: &BytesN<32>, bound: u32) -> TallyUpdate {
        self.client.accumulate(&self.this, tally, rating, &bound)
    }

    /// Encrypted `(min, max)` of `values`.
    pub fn extrema(&self, values: &Vec<BytesN<32>>) -> (BytesN<32>, BytesN<32>) {
        self.client.extrema(&self.this, values)
    }

    pub fn allow(&self, handle: &BytesN<32>, account: &Address) {
        self.client.allow(&self.this, handle, account);
    }
}
