//! Structured event publishing for the FHE executor.

#![allow(deprecated)]

use common::FheType;
use soroban_sdk::{symbol_short, Address, BytesN, Env};

pub fn publish_input_verified(env: &Env, handle: &BytesN<32>, user: &Address, fhe_type: FheType) {
    env.events().publish(
        (symbol_short!("CT_NEW"), handle.clone()),
        (user.clone(), fhe_type),
    );
}

pub fn publish_access_granted(env: &Env, handle: &BytesN<32>, account: &Address) {
    env.events().publish(
        (symbol_short!("ACL_GRNT"), handle.clone()),
        account.clone(),
    );
}

pub fn publish_decrypt_key_registered(env: &Env, account: &Address) {
    env.events()
        .publish((symbol_short!("DKEY_SET"),), account.clone());
}

pub fn publish_verifier_rotated(env: &Env, key: &BytesN<32>) {
    env.events()
        .publish((symbol_short!("VRF_ROT"),), key.clone());
}
