//! Ciphertext types shared by the FHE executor and the contracts that call it.
//!
//! A ciphertext is only ever referenced by its [`Handle`]. The executor keeps
//! the sealed body; callers pass handles around and ask the executor to
//! compute on them.

#![allow(clippy::arithmetic_side_effects)]

use soroban_sdk::{
    contractclient, contracterror, contracttype, xdr::ToXdr, Address, Bytes, BytesN, Env, Vec,
};

/// Opaque reference to an encrypted value.
pub type Handle = BytesN<32>;

/// `[type tag: 1][nonce: 8][masked value: 4]`
pub const INPUT_CIPHERTEXT_LEN: u32 = 13;
pub const INPUT_NONCE_LEN: usize = 8;

const DOMAIN_INPUT: u8 = b'I';
const DOMAIN_STORE: u8 = b'S';

// ── Types ────────────────────────────────────────────────────────────────────

/// Encrypted integer widths understood by the executor.
///
/// Discriminants double as the one-byte type tag of the input wire format.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum FheType {
    Bool = 0,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
}

impl FheType {
    pub fn tag(self) -> u8 {
        self as u32 as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
        }
    }

    pub fn max_value(self) -> u32 {
        match self.bits() {
            32 => u32::MAX,
            bits => (1u32 << bits) - 1,
        }
    }

    /// Reduce `value` modulo 2^bits.
    pub fn wrap(self, value: u64) -> u32 {
        (value & self.max_value() as u64) as u32
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, FheType::Bool)
    }

    /// Result width of a binary integer operation.
    pub fn wider(self, other: FheType) -> FheType {
        if other.bits() > self.bits() {
            other
        } else {
            self
        }
    }
}

/// Sealed ciphertext body as stored by the executor.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ciphertext {
    pub fhe_type: FheType,
    /// Plaintext XOR a keystream bound to the handle.
    pub masked: u32,
}

/// Encrypted running aggregates of a `1..=bound` rating scale.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tally {
    /// Σ v
    pub total: BytesN<32>,
    /// Σ v²
    pub sum_squares: BytesN<32>,
    pub min: BytesN<32>,
    pub max: BytesN<32>,
    /// `buckets[k - 1]` counts ratings equal to `k`.
    pub buckets: Vec<BytesN<32>>,
}

/// Outcome of folding one rating into a [`Tally`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TallyUpdate {
    /// The rating after clamping into `1..=bound`.
    pub rating: BytesN<32>,
    pub tally: Tally,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ExecutorError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    UnknownHandle = 4,
    AccessDenied = 5,
    TypeMismatch = 6,
    MalformedCiphertext = 7,
    UnsupportedType = 8,
    ValueOutOfRange = 9,
    ShapeMismatch = 10,
}

// ── Cross-contract interface ─────────────────────────────────────────────────

/// Entry points of the FHE executor that other contracts call.
///
/// Every operation takes the calling contract as `caller`; the executor
/// requires its auth, checks it is allowed on each operand, and allows it on
/// the result.
#[contractclient(name = "FheExecutorClient")]
pub trait FheExecutorInterface {
    fn verify_input(
        env: Env,
        caller: Address,
        user: Address,
        ciphertext: Bytes,
        proof: BytesN<64>,
    ) -> Result<BytesN<32>, ExecutorError>;

    fn trivial_encrypt(
        env: Env,
        caller: Address,
        value: u32,
        fhe_type: FheType,
    ) -> Result<BytesN<32>, ExecutorError>;

    fn cast(
        env: Env,
        caller: Address,
        a: BytesN<32>,
        to: FheType,
    ) -> Result<BytesN<32>, ExecutorError>;

    fn add(env: Env, caller: Address, a: BytesN<32>, b: BytesN<32>)
        -> Result<BytesN<32>, ExecutorError>;

    fn mul(env: Env, caller: Address, a: BytesN<32>, b: BytesN<32>)
        -> Result<BytesN<32>, ExecutorError>;

    fn eq(env: Env, caller: Address, a: BytesN<32>, b: BytesN<32>)
        -> Result<BytesN<32>, ExecutorError>;

    fn lt(env: Env, caller: Address, a: BytesN<32>, b: BytesN<32>)
        -> Result<BytesN<32>, ExecutorError>;

    fn gt(env: Env, caller: Address, a: BytesN<32>, b: BytesN<32>)
        -> Result<BytesN<32>, ExecutorError>;

    fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> Result<BytesN<32>, ExecutorError>;

    /// Clamp `rating` into `1..=bound` and fold it into `tally` in one step.
    fn accumulate(
        env: Env,
        caller: Address,
        tally: Tally,
        rating: BytesN<32>,
        bound: u32,
    ) -> Result<TallyUpdate, ExecutorError>;

    /// Encrypted `(min, max)` over a non-empty list of same-typed values.
    fn extrema(
        env: Env,
        caller: Address,
        values: Vec<BytesN<32>>,
    ) -> Result<(BytesN<32>, BytesN<32>), ExecutorError>;

    fn allow(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
        account: Address,
    ) -> Result<(), ExecutorError>;

    fn is_allowed(env: Env, handle: BytesN<32>, account: Address) -> bool;

    fn ciphertext(env: Env, handle: BytesN<32>) -> Option<Ciphertext>;

    fn fhe_type(env: Env, handle: BytesN<32>) -> Result<FheType, ExecutorError>;

    fn decrypt_key(env: Env, account: Address) -> Option<BytesN<32>>;
}

// ── Sealing ──────────────────────────────────────────────────────────────────

/// First four bytes of `sha256(domain || key || salt)` as a big-endian word.
pub fn keystream(env: &Env, key: &BytesN<32>, domain: u8, salt: &Bytes) -> u32 {
    let mut payload = Bytes::new(env);
    payload.push_back(domain);
    payload.append(&Bytes::from(key.clone()));
    payload.append(salt);
    let digest: BytesN<32> = env.crypto().sha256(&payload).into();
    let d = digest.to_array();
    u32::from_be_bytes([d[0], d[1], d[2], d[3]])
}

/// Seal a stored value under the network key, bound to its handle.
pub fn seal(env: &Env, key: &BytesN<32>, handle: &BytesN<32>, value: u32) -> u32 {
    value ^ keystream(env, key, DOMAIN_STORE, &Bytes::from(handle.clone()))
}

pub fn unseal(env: &Env, key: &BytesN<32>, handle: &BytesN<32>, masked: u32) -> u32 {
    masked ^ keystream(env, key, DOMAIN_STORE, &Bytes::from(handle.clone()))
}

/// Encode a client-side input ciphertext in the executor's wire format.
pub fn encode_input(
    env: &Env,
    key: &BytesN<32>,
    fhe_type: FheType,
    nonce: &[u8; INPUT_NONCE_LEN],
    value: u32,
) -> Bytes {
    let salt = Bytes::from_array(env, nonce);
    let masked = value ^ keystream(env, key, DOMAIN_INPUT, &salt);

    let mut out = Bytes::new(env);
    out.push_back(fhe_type.tag());
    out.append(&salt);
    out.append(&Bytes::from_array(env, &masked.to_be_bytes()));
    out
}

/// Decode an input ciphertext, returning its declared type and value.
pub fn decode_input(
    env: &Env,
    key: &BytesN<32>,
    ciphertext: &Bytes,
) -> Result<(FheType, u32), ExecutorError> {
    if ciphertext.len() != INPUT_CIPHERTEXT_LEN {
        return Err(ExecutorError::MalformedCiphertext);
    }
    let mut raw = [0u8; INPUT_CIPHERTEXT_LEN as usize];
    ciphertext.copy_into_slice(&mut raw);

    let fhe_type = FheType::from_tag(raw[0]).ok_or(ExecutorError::UnsupportedType)?;
    let salt = Bytes::from_slice(env, &raw[1..1 + INPUT_NONCE_LEN]);
    let masked = u32::from_be_bytes([raw[9], raw[10], raw[11], raw[12]]);
    let value = masked ^ keystream(env, key, DOMAIN_INPUT, &salt);

    if value > fhe_type.max_value() {
        return Err(ExecutorError::ValueOutOfRange);
    }
    Ok((fhe_type, value))
}

/// Message signed by the input verifier: binds a ciphertext to the contract
/// that will ingest it and the user submitting it.
pub fn input_digest(env: &Env, ciphertext: &Bytes, contract: &Address, user: &Address) -> BytesN<32> {
    let mut payload = Bytes::new(env);
    payload.append(ciphertext);
    payload.append(&contract.clone().to_xdr(env));
    payload.append(&user.clone().to_xdr(env));
    env.crypto().sha256(&payload).into()
}
