//! Evaluation of encrypted operations.
//!
//! Operands are unsealed, combined, and the results resealed under fresh
//! handles. The arithmetic itself is branch-free so it mirrors how the same
//! circuit evaluates over real ciphertexts: `select` is a masked blend and the
//! comparisons are computed from subtraction borrows.
//!
//! A handle is `[batch id: 28][slot: 4]`. Everything one call derives lands in
//! a single batch entry together with each slot's ACL, so a call writes one
//! ledger entry however many ciphertexts it produces.

#![allow(clippy::arithmetic_side_effects)]

use common::{seal, set_persistent, unseal, Ciphertext, ExecutorError, FheType, Tally, TallyUpdate};
use soroban_sdk::{contracttype, vec, Address, Bytes, BytesN, Env, Map, Vec};

use crate::{acl, DataKey};

const SLOT_OFFSET: usize = 28;

/// Operation codes mixed into batch derivation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Opcode {
    Input = 1,
    Trivial = 2,
    Cast = 3,
    Add = 4,
    Mul = 5,
    Eq = 6,
    Lt = 7,
    Gt = 8,
    Select = 9,
    Accumulate = 10,
    Extrema = 11,
}

impl Opcode {
    fn is_comparison(self) -> bool {
        matches!(self, Opcode::Eq | Opcode::Lt | Opcode::Gt)
    }
}

/// A stored ciphertext and the accounts allowed on it.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub ciphertext: Ciphertext,
    pub acl: Vec<Address>,
}

// ── Plaintext circuit ────────────────────────────────────────────────────────

/// Evaluate a binary integer operation at the given result width.
pub fn evaluate(op: Opcode, lhs: u32, rhs: u32, width: FheType) -> u32 {
    let (l, r) = (lhs as u64, rhs as u64);
    match op {
        Opcode::Add => width.wrap(l + r),
        Opcode::Mul => width.wrap(l * r),
        // borrow bit of (l - r) is set exactly when l < r
        Opcode::Lt => (l.wrapping_sub(r) >> 63) as u32,
        Opcode::Gt => (r.wrapping_sub(l) >> 63) as u32,
        Opcode::Eq => {
            let diff = l ^ r;
            (((diff | diff.wrapping_neg()) >> 63) ^ 1) as u32
        }
        _ => 0,
    }
}

/// `cond ? if_true : if_false` without branching on `cond`.
pub fn blend(cond: u32, if_true: u32, if_false: u32) -> u32 {
    let mask = 0u32.wrapping_sub(cond & 1);
    if_false ^ ((if_true ^ if_false) & mask)
}

/// Force `value` into `1..=bound` without branching on it.
pub fn clamp(value: u32, bound: u32) -> u32 {
    let raised = blend(evaluate(Opcode::Gt, value, 1, FheType::Uint32), value, 1);
    blend(
        evaluate(Opcode::Lt, raised, bound, FheType::Uint32),
        raised,
        bound,
    )
}

// ── Handles ──────────────────────────────────────────────────────────────────

/// Batch id and slot index of `handle`.
pub(crate) fn split(env: &Env, handle: &BytesN<32>) -> (BytesN<32>, u32) {
    let mut bytes = handle.to_array();
    let mut slot = [0u8; 4];
    slot.copy_from_slice(&bytes[SLOT_OFFSET..]);
    bytes[SLOT_OFFSET..].fill(0);
    (BytesN::from_array(env, &bytes), u32::from_be_bytes(slot))
}

fn handle_at(env: &Env, batch: &BytesN<32>, slot: u32) -> BytesN<32> {
    let mut bytes = batch.to_array();
    bytes[SLOT_OFFSET..].copy_from_slice(&slot.to_be_bytes());
    BytesN::from_array(env, &bytes)
}

fn batch_id(env: &Env, payload: &Bytes) -> BytesN<32> {
    let digest: BytesN<32> = env.crypto().sha256(payload).into();
    handle_at(env, &digest, 0)
}

fn next_nonce(env: &Env) -> u64 {
    let nonce: u64 = env
        .storage()
        .instance()
        .get(&DataKey::Nonce)
        .unwrap_or(0u64)
        .saturating_add(1);
    env.storage().instance().set(&DataKey::Nonce, &nonce);
    nonce
}

// ── Storage ──────────────────────────────────────────────────────────────────

pub(crate) fn network_key(env: &Env) -> Result<BytesN<32>, ExecutorError> {
    env.storage()
        .instance()
        .get(&DataKey::NetworkKey)
        .ok_or(ExecutorError::NotInitialized)
}

pub(crate) fn load_batch(env: &Env, id: &BytesN<32>) -> Option<Vec<Slot>> {
    env.storage().persistent().get(&DataKey::Batch(id.clone()))
}

pub(crate) fn save_batch(env: &Env, id: &BytesN<32>, slots: &Vec<Slot>) {
    set_persistent(env, &DataKey::Batch(id.clone()), slots);
}

pub(crate) fn load_slot(env: &Env, handle: &BytesN<32>) -> Result<Slot, ExecutorError> {
    let (id, index) = split(env, handle);
    load_batch(env, &id)
        .and_then(|slots| slots.get(index))
        .ok_or(ExecutorError::UnknownHandle)
}

pub(crate) fn load(env: &Env, handle: &BytesN<32>) -> Result<Ciphertext, ExecutorError> {
    load_slot(env, handle).map(|slot| slot.ciphertext)
}

/// Results of one call, persisted together by [`Batch::commit`].
pub(crate) struct Batch<'a> {
    env: &'a Env,
    key: BytesN<32>,
    id: BytesN<32>,
    owner: Address,
    slots: Vec<Slot>,
}

impl<'a> Batch<'a> {
    fn new(env: &'a Env, key: BytesN<32>, id: BytesN<32>, owner: &Address) -> Self {
        Self {
            env,
            key,
            id,
            owner: owner.clone(),
            slots: Vec::new(env),
        }
    }

    /// Fresh batch id: `sha256(op || operands || nonce)`.
    pub(crate) fn derive(
        env: &'a Env,
        key: BytesN<32>,
        owner: &Address,
        op: Opcode,
        operands: &[&BytesN<32>],
    ) -> Self {
        let mut payload = Bytes::new(env);
        payload.push_back(op as u8);
        for operand in operands {
            payload.append(&Bytes::from((*operand).clone()));
        }
        payload.append(&Bytes::from_array(env, &next_nonce(env).to_be_bytes()));
        Self::new(env, key, batch_id(env, &payload), owner)
    }

    /// Seal `value` into the next slot, allowed to the batch owner.
    pub(crate) fn push(&mut self, fhe_type: FheType, value: u32) -> BytesN<32> {
        let handle = handle_at(self.env, &self.id, self.slots.len());
        self.slots.push_back(Slot {
            ciphertext: Ciphertext {
                fhe_type,
                masked: seal(self.env, &self.key, &handle, value),
            },
            acl: vec![self.env, self.owner.clone()],
        });
        handle
    }

    pub(crate) fn commit(self) {
        save_batch(self.env, &self.id, &self.slots);
    }
}

/// Unseals operands on behalf of `caller`, loading each batch once.
pub(crate) struct Reader<'a> {
    env: &'a Env,
    key: BytesN<32>,
    caller: &'a Address,
    batches: Map<BytesN<32>, Vec<Slot>>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(env: &'a Env, caller: &'a Address) -> Result<Self, ExecutorError> {
        Ok(Self {
            env,
            key: network_key(env)?,
            caller,
            batches: Map::new(env),
        })
    }

    pub(crate) fn output(&self, op: Opcode, operands: &[&BytesN<32>]) -> Batch<'a> {
        Batch::derive(self.env, self.key.clone(), self.caller, op, operands)
    }

    /// Type and plaintext of `handle`; the caller must be on its ACL.
    pub(crate) fn read(&mut self, handle: &BytesN<32>) -> Result<(FheType, u32), ExecutorError> {
        let (id, index) = split(self.env, handle);
        let slots = match self.batches.get(id.clone()) {
            Some(slots) => slots,
            None => {
                let slots = load_batch(self.env, &id).ok_or(ExecutorError::UnknownHandle)?;
                self.batches.set(id, slots.clone());
                slots
            }
        };
        let slot = slots.get(index).ok_or(ExecutorError::UnknownHandle)?;
        if !slot.acl.contains(self.caller) {
            return Err(ExecutorError::AccessDenied);
        }
        let value = unseal(self.env, &self.key, handle, slot.ciphertext.masked);
        Ok((slot.ciphertext.fhe_type, value))
    }

    pub(crate) fn integer(&mut self, handle: &BytesN<32>) -> Result<(FheType, u32), ExecutorError> {
        let (fhe_type, value) = self.read(handle)?;
        if !fhe_type.is_integer() {
            return Err(ExecutorError::TypeMismatch);
        }
        Ok((fhe_type, value))
    }
}

fn single(
    reader: &Reader,
    op: Opcode,
    operands: &[&BytesN<32>],
    fhe_type: FheType,
    value: u32,
) -> BytesN<32> {
    let mut batch = reader.output(op, operands);
    let handle = batch.push(fhe_type, value);
    batch.commit();
    handle
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Trivial encryptions of the same constant share one handle.
pub(crate) fn trivial(
    env: &Env,
    caller: &Address,
    value: u32,
    fhe_type: FheType,
) -> Result<BytesN<32>, ExecutorError> {
    if value > fhe_type.max_value() {
        return Err(ExecutorError::ValueOutOfRange);
    }
    let key = network_key(env)?;

    let mut payload = Bytes::new(env);
    payload.push_back(Opcode::Trivial as u8);
    payload.push_back(fhe_type.tag());
    payload.append(&Bytes::from_array(env, &value.to_be_bytes()));
    let id = batch_id(env, &payload);

    if load_batch(env, &id).is_some() {
        let handle = handle_at(env, &id, 0);
        acl::allow(env, &handle, caller)?;
        return Ok(handle);
    }
    let mut batch = Batch::new(env, key, id, caller);
    let handle = batch.push(fhe_type, value);
    batch.commit();
    Ok(handle)
}

pub(crate) fn cast(
    env: &Env,
    caller: &Address,
    a: &BytesN<32>,
    to: FheType,
) -> Result<BytesN<32>, ExecutorError> {
    let mut reader = Reader::new(env, caller)?;
    let (_, value) = reader.read(a)?;

    let result = match to {
        FheType::Bool => evaluate(Opcode::Eq, value, 0, to) ^ 1,
        _ => to.wrap(value as u64),
    };
    Ok(single(&reader, Opcode::Cast, &[a], to, result))
}

pub(crate) fn binary(
    env: &Env,
    caller: &Address,
    op: Opcode,
    a: &BytesN<32>,
    b: &BytesN<32>,
) -> Result<BytesN<32>, ExecutorError> {
    let mut reader = Reader::new(env, caller)?;
    let (ty_a, lhs) = reader.read(a)?;
    let (ty_b, rhs) = reader.read(b)?;

    if !ty_a.is_integer() || !ty_b.is_integer() {
        return Err(ExecutorError::TypeMismatch);
    }

    let width = ty_a.wider(ty_b);
    let result_type = if op.is_comparison() {
        FheType::Bool
    } else {
        width
    };
    let result = evaluate(op, lhs, rhs, width);
    Ok(single(&reader, op, &[a, b], result_type, result))
}

pub(crate) fn select(
    env: &Env,
    caller: &Address,
    cond: &BytesN<32>,
    if_true: &BytesN<32>,
    if_false: &BytesN<32>,
) -> Result<BytesN<32>, ExecutorError> {
    let mut reader = Reader::new(env, caller)?;
    let (ty_c, c) = reader.read(cond)?;
    let (ty_t, t) = reader.read(if_true)?;
    let (ty_f, f) = reader.read(if_false)?;

    if ty_c != FheType::Bool || ty_t != ty_f {
        return Err(ExecutorError::TypeMismatch);
    }
    Ok(single(
        &reader,
        Opcode::Select,
        &[cond, if_true, if_false],
        ty_t,
        blend(c, t, f),
    ))
}

/// Clamp, then fold into every aggregate of `tally` in one circuit.
///
/// Slot 0 of the output batch is the clamped rating, followed by total,
/// sum of squares, min, max and the buckets in order.
pub(crate) fn accumulate(
    env: &Env,
    caller: &Address,
    tally: &Tally,
    rating: &BytesN<32>,
    bound: u32,
) -> Result<TallyUpdate, ExecutorError> {
    let mut reader = Reader::new(env, caller)?;
    let (rating_type, raw) = reader.integer(rating)?;
    let (total_type, total) = reader.integer(&tally.total)?;
    let (squares_type, squares) = reader.integer(&tally.sum_squares)?;
    let (min_type, min) = reader.integer(&tally.min)?;
    let (max_type, max) = reader.integer(&tally.max)?;

    if min_type != rating_type || max_type != rating_type {
        return Err(ExecutorError::TypeMismatch);
    }
    if bound == 0 || bound > rating_type.max_value() || tally.buckets.len() != bound {
        return Err(ExecutorError::ShapeMismatch);
    }

    let value = clamp(raw, bound);
    let square = evaluate(Opcode::Mul, value, value, squares_type);

    let mut batch = reader.output(Opcode::Accumulate, &[rating]);
    let clamped = batch.push(rating_type, value);
    let total = batch.push(total_type, evaluate(Opcode::Add, total, value, total_type));
    let sum_squares = batch.push(
        squares_type,
        evaluate(Opcode::Add, squares, square, squares_type),
    );
    let min = batch.push(
        min_type,
        blend(evaluate(Opcode::Lt, value, min, min_type), value, min),
    );
    let max = batch.push(
        max_type,
        blend(evaluate(Opcode::Gt, value, max, max_type), value, max),
    );

    // every bucket is rewritten so the chosen one stays hidden
    let mut buckets = Vec::new(env);
    for (slot, bucket) in tally.buckets.iter().enumerate() {
        let (bucket_type, count) = reader.integer(&bucket)?;
        let hit = evaluate(Opcode::Eq, value, slot as u32 + 1, bucket_type);
        buckets.push_back(batch.push(
            bucket_type,
            evaluate(Opcode::Add, count, hit, bucket_type),
        ));
    }
    batch.commit();

    Ok(TallyUpdate {
        rating: clamped,
        tally: Tally {
            total,
            sum_squares,
            min,
            max,
            buckets,
        },
    })
}

/// `(min, max)` of `values`, seeded with the type's full range.
pub(crate) fn extrema(
    env: &Env,
    caller: &Address,
    values: &Vec<BytesN<32>>,
) -> Result<(BytesN<32>, BytesN<32>), ExecutorError> {
    let first = values.first().ok_or(ExecutorError::ShapeMismatch)?;
    let mut reader = Reader::new(env, caller)?;
    let (fhe_type, _) = reader.integer(&first)?;

    let mut min = fhe_type.max_value();
    let mut max = 0;
    for handle in values.iter() {
        let (ty, value) = reader.integer(&handle)?;
        if ty != fhe_type {
            return Err(ExecutorError::TypeMismatch);
        }
        min = blend(evaluate(Opcode::Lt, value, min, ty), value, min);
        max = blend(evaluate(Opcode::Gt, value, max, ty), value, max);
    }

    let mut batch = reader.output(Opcode::Extrema, &[&first]);
    let min = batch.push(fhe_type, min);
    let max = batch.push(fhe_type, max);
    batch.commit();
    Ok((min, max))
}
