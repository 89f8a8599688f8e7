//! TTL policy for persistent entries.

use soroban_sdk::{Env, IntoVal, Val};

// ~60 days at 5s/ledger
pub const TTL_THRESHOLD: u32 = 1_036_800;
pub const TTL_EXTEND_TO: u32 = 2_073_600;

/// Write a persistent entry and push its TTL out to [`TTL_EXTEND_TO`].
pub fn set_persistent<K, V>(env: &Env, key: &K, value: &V)
where
    K: IntoVal<Env, Val>,
    V: IntoVal<Env, Val>,
{
    env.storage().persistent().set(key, value);
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}
