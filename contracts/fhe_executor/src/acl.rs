//! Per-handle access control list.
//!
//! An account listed on a handle may compute on it, extend the list, and ask
//! the decryption service for its plaintext. Entries are never removed. The
//! list lives in the handle's batch slot next to the ciphertext.

use common::ExecutorError;
use soroban_sdk::{Address, BytesN, Env};

use crate::engine;

pub(crate) fn allow(env: &Env, handle: &BytesN<32>, account: &Address) -> Result<(), ExecutorError> {
    let (id, index) = engine::split(env, handle);
    let mut slots = engine::load_batch(env, &id).ok_or(ExecutorError::UnknownHandle)?;
    let mut slot = slots.get(index).ok_or(ExecutorError::UnknownHandle)?;
    if slot.acl.contains(account) {
        return Ok(());
    }
    slot.acl.push_back(account.clone());
    slots.set(index, slot);
    engine::save_batch(env, &id, &slots);
    Ok(())
}

pub(crate) fn is_allowed(env: &Env, handle: &BytesN<32>, account: &Address) -> bool {
    engine::load_slot(env, handle)
        .map(|slot| slot.acl.contains(account))
        .unwrap_or(false)
}

pub(crate) fn require_allowed(
    env: &Env,
    handle: &BytesN<32>,
    account: &Address,
) -> Result<(), ExecutorError> {
    if !is_allowed(env, handle, account) {
        return Err(ExecutorError::AccessDenied);
    }
    Ok(())
}
