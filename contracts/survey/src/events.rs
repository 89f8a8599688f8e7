#![allow(deprecated)]

use soroban_sdk::{symbol_short, Address, BytesN, Env, String};

pub fn publish_survey_created(env: &Env, owner: &Address, total_questions: u32, limit: u32) {
    env.events().publish(
        (symbol_short!("SRV_NEW"), owner.clone()),
        (total_questions, limit),
    );
}

pub fn publish_metadata_updated(env: &Env, cid: &String) {
    env.events()
        .publish((symbol_short!("SRV_META"),), cid.clone());
}

pub fn publish_questions_updated(env: &Env, total_questions: u32) {
    env.events()
        .publish((symbol_short!("SRV_QST"),), total_questions);
}

pub fn publish_title_updated(env: &Env, title: &String) {
    env.events()
        .publish((symbol_short!("SRV_TTL"),), title.clone());
}

pub fn publish_survey_published(env: &Env, total_questions: u32) {
    env.events()
        .publish((symbol_short!("SRV_PUB"),), total_questions);
}

pub fn publish_response_recorded(env: &Env, respondent: &Address, total_respondents: u32) {
    env.events().publish(
        (symbol_short!("RESP_NEW"), respondent.clone()),
        total_respondents,
    );
}

pub fn publish_survey_closed(env: &Env, total_respondents: u32) {
    env.events()
        .publish((symbol_short!("SRV_CLS"),), total_respondents);
}

pub fn publish_survey_deleted(env: &Env, owner: &Address) {
    env.events()
        .publish((symbol_short!("SRV_DEL"),), owner.clone());
}

pub fn publish_owner_grant(env: &Env, owner: &Address, index: u32, handles: u32) {
    env.events().publish(
        (symbol_short!("GRNT_OWN"), owner.clone()),
        (index, handles),
    );
}

pub fn publish_respondent_grant(env: &Env, respondent: &Address, index: u32, answer: &BytesN<32>) {
    env.events().publish(
        (symbol_short!("GRNT_RSP"), respondent.clone()),
        (index, answer.clone()),
    );
}
