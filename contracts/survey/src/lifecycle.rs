//! Survey lifecycle state machine.
//!
//! Every status change goes through [`apply_transition`], which consults a
//! single transition table and appends a hash-chained [`TransitionRecord`].
//! No edge re-enters `Created` or leaves `Closed`/`Trashed`.

#![allow(clippy::arithmetic_side_effects)]

use common::set_persistent;
use soroban_sdk::{contracttype, Address, Bytes, BytesN, Env, Vec};

use crate::types::{DataKey, Survey, SurveyError, SurveyStatus};

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum LifecycleAction {
    Publish = 1,
    Close = 2,
    Delete = 3,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransitionRecord {
    pub from_status: SurveyStatus,
    pub to_status: SurveyStatus,
    pub action: LifecycleAction,
    pub actor: Address,
    pub timestamp: u64,
    pub prev_hash: BytesN<32>,
    pub transition_hash: BytesN<32>,
}

/// Transition table: current status × action → next status.
///
/// The rejection for each action names the status it expected.
pub fn next_status(
    from: SurveyStatus,
    action: LifecycleAction,
) -> Result<SurveyStatus, SurveyError> {
    match (from, action) {
        (SurveyStatus::Created, LifecycleAction::Publish) => Ok(SurveyStatus::Active),
        (SurveyStatus::Active, LifecycleAction::Close) => Ok(SurveyStatus::Closed),
        (SurveyStatus::Created, LifecycleAction::Delete) => Ok(SurveyStatus::Trashed),
        (_, LifecycleAction::Publish) => Err(SurveyError::ImmutableState),
        (_, LifecycleAction::Close) => Err(SurveyError::NotActive),
        (_, LifecycleAction::Delete) => Err(SurveyError::AlreadyActive),
    }
}

/// Reject unless the survey is in `expected`, with the matching error.
pub fn require_status(survey: &Survey, expected: SurveyStatus) -> Result<(), SurveyError> {
    if survey.status == expected {
        return Ok(());
    }
    Err(match expected {
        SurveyStatus::Created => SurveyError::ImmutableState,
        SurveyStatus::Active => SurveyError::NotActive,
        SurveyStatus::Closed => SurveyError::NotClosed,
        SurveyStatus::Trashed => SurveyError::AlreadyActive,
    })
}

fn status_tag(status: SurveyStatus) -> u32 {
    status as u32
}

fn hash_transition(
    env: &Env,
    from: SurveyStatus,
    to: SurveyStatus,
    actor: &Address,
    timestamp: u64,
    prev_hash: &BytesN<32>,
) -> BytesN<32> {
    let mut payload = Bytes::new(env);
    payload.append(&Bytes::from_slice(env, &timestamp.to_be_bytes()));
    payload.append(&actor.to_string().to_bytes());
    payload.append(&Bytes::from_slice(env, &status_tag(from).to_be_bytes()));
    payload.append(&Bytes::from_slice(env, &status_tag(to).to_be_bytes()));
    payload.append(&Bytes::from_slice(env, &prev_hash.to_array()));
    env.crypto().sha256(&payload).into()
}

/// Move `survey` along the table and log the transition. The caller persists
/// the survey itself.
pub fn apply_transition(
    env: &Env,
    survey: &mut Survey,
    action: LifecycleAction,
    actor: &Address,
) -> Result<TransitionRecord, SurveyError> {
    let from = survey.status;
    let to = next_status(from, action)?;

    let prev_hash: BytesN<32> = env
        .storage()
        .persistent()
        .get(&DataKey::LastTransitionHash)
        .unwrap_or(BytesN::from_array(env, &[0u8; 32]));
    let now = env.ledger().timestamp();
    let transition_hash = hash_transition(env, from, to, actor, now, &prev_hash);

    let record = TransitionRecord {
        from_status: from,
        to_status: to,
        action,
        actor: actor.clone(),
        timestamp: now,
        prev_hash,
        transition_hash: transition_hash.clone(),
    };

    let mut log = transition_log(env);
    log.push_back(record.clone());
    set_persistent(env, &DataKey::TransitionLog, &log);
    set_persistent(env, &DataKey::LastTransitionHash, &transition_hash);

    survey.status = to;
    Ok(record)
}

pub fn transition_log(env: &Env) -> Vec<TransitionRecord> {
    env.storage()
        .persistent()
        .get(&DataKey::TransitionLog)
        .unwrap_or(Vec::new(env))
}
