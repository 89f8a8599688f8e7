#![no_std]

//! # FHE Executor
//!
//! On-ledger stand-in for an FHE coprocessor. Contracts hand it ciphertext
//! handles and get new handles back; nothing it returns is plaintext.
//!
//! - **Ingestion**: `verify_input` checks the input verifier's ed25519 proof
//!   binding a client ciphertext to the ingesting contract and user.
//! - **Operations**: `trivial_encrypt`, `cast`, `add`, `mul`, `eq`, `lt`,
//!   `gt`, `select`, plus the fused `accumulate` and `extrema` circuits that
//!   keep their intermediates in memory.
//! - **ACL**: the caller of an operation must be allowed on every operand and
//!   is allowed on the result, so derived ciphertexts can always be shared by
//!   the contract that computed them.
//! - **Decryption support**: sealed bodies, ACL lookups and registered
//!   decryption keys are readable by the off-chain decryption service.

pub mod acl;
pub mod engine;
pub mod events;


use common::{decode_input, input_digest, Ciphertext, ExecutorError, FheType, Tally, TallyUpdate};
use engine::Opcode;
use soroban_sdk::{contract, contractimpl, contracttype, Address, Bytes, BytesN, Env, Vec};

// ── Storage keys ─────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    NetworkKey,
    InputVerifier,
    Nonce,
    /// Every ciphertext one call produced, see [`engine::Slot`].
    Batch(BytesN<32>),
    DecryptKey(Address),
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct FheExecutorContract;

#[contractimpl]
impl FheExecutorContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Bootstrap the executor.
    ///
    /// * `network_key`    — symmetric key the ciphertext bodies are sealed under.
    /// * `input_verifier` — ed25519 public key whose signatures make client
    ///                      ciphertexts admissible.
    pub fn initialize(
        env: Env,
        admin: Address,
        network_key: BytesN<32>,
        input_verifier: BytesN<32>,
    ) -> Result<(), ExecutorError> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(ExecutorError::AlreadyInitialized);
        }
        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::NetworkKey, &network_key);
        env.storage()
            .instance()
            .set(&DataKey::InputVerifier, &input_verifier);
        Ok(())
    }

    pub fn rotate_input_verifier(
        env: Env,
        caller: Address,
        input_verifier: BytesN<32>,
    ) -> Result<(), ExecutorError> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;
        env.storage()
            .instance()
            .set(&DataKey::InputVerifier, &input_verifier);
        events::publish_verifier_rotated(&env, &input_verifier);
        Ok(())
    }

    /// Register the ed25519 key the account signs decryption requests with.
    pub fn register_decrypt_key(
        env: Env,
        account: Address,
        public_key: BytesN<32>,
    ) -> Result<(), ExecutorError> {
        Self::require_initialized(&env)?;
        account.require_auth();
        common::set_persistent(&env, &DataKey::DecryptKey(account.clone()), &public_key);
        events::publish_decrypt_key_registered(&env, &account);
        Ok(())
    }

    // ── Ingestion ─────────────────────────────────────────────────────────────

    /// Admit a client ciphertext and return its handle.
    ///
    /// The proof is an ed25519 signature by the input verifier over
    /// `sha256(ciphertext || caller XDR || user XDR)`. A signature that does
    /// not verify aborts the invocation.
    pub fn verify_input(
        env: Env,
        caller: Address,
        user: Address,
        ciphertext: Bytes,
        proof: BytesN<64>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        let key = engine::network_key(&env)?;
        let verifier: BytesN<32> = env
            .storage()
            .instance()
            .get(&DataKey::InputVerifier)
            .ok_or(ExecutorError::NotInitialized)?;

        let (fhe_type, value) = decode_input(&env, &key, &ciphertext)?;

        let digest = input_digest(&env, &ciphertext, &caller, &user);
        env.crypto()
            .ed25519_verify(&verifier, &Bytes::from(digest.clone()), &proof);

        let mut batch = engine::Batch::derive(&env, key, &caller, Opcode::Input, &[&digest]);
        let handle = batch.push(fhe_type, value);
        batch.commit();

        events::publish_input_verified(&env, &handle, &user, fhe_type);
        Ok(handle)
    }

    // ── Operations ────────────────────────────────────────────────────────────

    pub fn trivial_encrypt(
        env: Env,
        caller: Address,
        value: u32,
        fhe_type: FheType,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::trivial(&env, &caller, value, fhe_type)
    }

    pub fn cast(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        to: FheType,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::cast(&env, &caller, &a, to)
    }

    pub fn add(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        b: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::binary(&env, &caller, Opcode::Add, &a, &b)
    }

    pub fn mul(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        b: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::binary(&env, &caller, Opcode::Mul, &a, &b)
    }

    pub fn eq(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        b: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::binary(&env, &caller, Opcode::Eq, &a, &b)
    }

    pub fn lt(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        b: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::binary(&env, &caller, Opcode::Lt, &a, &b)
    }

    pub fn gt(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        b: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::binary(&env, &caller, Opcode::Gt, &a, &b)
    }

    /// Oblivious choice between two ciphertexts of the same type.
    pub fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError> {
        caller.require_auth();
        engine::select(&env, &caller, &cond, &if_true, &if_false)
    }

    /// Fold one rating into a tally. Only the clamped rating and the new
    /// aggregates are stored, all in a single entry.
    pub fn accumulate(
        env: Env,
        caller: Address,
        tally: Tally,
        rating: BytesN<32>,
        bound: u32,
    ) -> Result<TallyUpdate, ExecutorError> {
        caller.require_auth();
        engine::accumulate(&env, &caller, &tally, &rating, bound)
    }

    pub fn extrema(
        env: Env,
        caller: Address,
        values: Vec<BytesN<32>>,
    ) -> Result<(BytesN<32>, BytesN<32>), ExecutorError> {
        caller.require_auth();
        engine::extrema(&env, &caller, &values)
    }

    // ── Access control ────────────────────────────────────────────────────────

    /// Extend the ACL of `handle` to `account`. Only an account already on the
    /// list may do so.
    pub fn allow(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
        account: Address,
    ) -> Result<(), ExecutorError> {
        caller.require_auth();
        engine::load(&env, &handle)?;
        acl::require_allowed(&env, &handle, &caller)?;
        acl::allow(&env, &handle, &account)?;
        events::publish_access_granted(&env, &handle, &account);
        Ok(())
    }

    // ── View functions ────────────────────────────────────────────────────────

    pub fn is_allowed(env: Env, handle: BytesN<32>, account: Address) -> bool {
        acl::is_allowed(&env, &handle, &account)
    }

    pub fn ciphertext(env: Env, handle: BytesN<32>) -> Option<Ciphertext> {
        engine::load(&env, &handle).ok()
    }

    pub fn fhe_type(env: Env, handle: BytesN<32>) -> Result<FheType, ExecutorError> {
        engine::load(&env, &handle).map(|ct| ct.fhe_type)
    }

    pub fn decrypt_key(env: Env, account: Address) -> Option<BytesN<32>> {
        env.storage()
            .persistent()
            .get(&DataKey::DecryptKey(account))
    }

    pub fn input_verifier(env: Env) -> Result<BytesN<32>, ExecutorError> {
        env.storage()
            .instance()
            .get(&DataKey::InputVerifier)
            .ok_or(ExecutorError::NotInitialized)
    }

    pub fn get_admin(env: Env) -> Result<Address, ExecutorError> {
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(ExecutorError::NotInitialized)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn require_initialized(env: &Env) -> Result<(), ExecutorError> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(ExecutorError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), ExecutorError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(ExecutorError::NotInitialized)?;
        if *caller != admin {
            return Err(ExecutorError::Unauthorized);
        }
        Ok(())
    }
}
