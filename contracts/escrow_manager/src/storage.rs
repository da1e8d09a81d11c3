//! # Storage
//!
//! Provides typed helpers over Soroban's two storage tiers used by the manager:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key              | Type               | Description                          |
//! |------------------|--------------------|--------------------------------------|
//! | `Config`         | `ManagerConfig`    | Admin, token, gate, capability       |
//! | `Template`       | `StrategyTemplate` | Template cloned into new strategies  |
//! | `ProfileNonce`   | `u64`              | Nonce mixed into every profile ID    |
//! | `StrategyCount`  | `u64`              | Strategy instance ID counter         |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                    | Type             | Description                        |
//! |------------------------|------------------|------------------------------------|
//! | `ProfConfig(id)`       | `ProfileConfig`  | Immutable profile configuration    |
//! | `ProfStatus(id)`       | `ProfileStatus`  | Mutable profile status             |
//! | `Pool(id)`             | `PoolState`      | Pool balance and dispersal flag    |
//! | `Suppliers(id)`        | `Vec<Address>`   | Suppliers in first-contribution order |
//! | `Contribution(id, a)`  | `i128`           | Cumulative contribution of `a`     |
//! | `Strategy(id)`         | `StrategyRecord` | Strategy instance bound to `id`    |
//! | `Vote(id, a)`          | `VoteChoice`     | Current vote of `a`                |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//!
//! Every per-profile entry is keyed by the profile ID, so two profiles never
//! share a mutable entry.

use soroban_sdk::{contracttype, Address, BytesN, Env, Vec};

use crate::types::{
    ManagerConfig, PoolState, Profile, ProfileConfig, ProfileStatus, StrategyRecord,
    StrategyTemplate, VoteChoice,
};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    Template,
    ProfileNonce,
    StrategyCount,
    ProfConfig(BytesN<32>),
    ProfStatus(BytesN<32>),
    Pool(BytesN<32>),
    Suppliers(BytesN<32>),
    Contribution(BytesN<32>, Address),
    Strategy(BytesN<32>),
    Vote(BytesN<32>, Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

/// Extend instance storage TTL if it falls below the threshold.
fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn save_config(env: &Env, config: &ManagerConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

pub fn load_config(env: &Env) -> Result<ManagerConfig, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn save_template(env: &Env, template: &StrategyTemplate) {
    env.storage().instance().set(&DataKey::Template, template);
    bump_instance(env);
}

pub fn load_template(env: &Env) -> Option<StrategyTemplate> {
    bump_instance(env);
    env.storage().instance().get(&DataKey::Template)
}

/// Reads, increments, and stores the profile nonce.
/// Returns the nonce to use for the *current* profile (pre-increment value).
pub fn next_profile_nonce(env: &Env) -> u64 {
    bump_instance(env);
    let current: u64 = env
        .storage()
        .instance()
        .get(&DataKey::ProfileNonce)
        .unwrap_or(0);
    env.storage()
        .instance()
        .set(&DataKey::ProfileNonce, &(current + 1));
    current
}

/// Like [`next_profile_nonce`] for strategy IDs, but reports exhaustion
/// instead of wrapping.
pub fn next_strategy_id(env: &Env) -> Option<u64> {
    bump_instance(env);
    let current: u64 = env
        .storage()
        .instance()
        .get(&DataKey::StrategyCount)
        .unwrap_or(0);
    let next = current.checked_add(1)?;
    env.storage().instance().set(&DataKey::StrategyCount, &next);
    Some(current)
}

// ── Persistent Storage Helpers ───────────────────────────────────────

/// Extend the TTL for a persistent storage key.
fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

fn read<T>(env: &Env, key: &DataKey) -> Option<T>
where
    T: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    let value = env.storage().persistent().get(key);
    if value.is_some() {
        bump_persistent(env, key);
    }
    value
}

fn write<T>(env: &Env, key: &DataKey, value: &T)
where
    T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
{
    env.storage().persistent().set(key, value);
    bump_persistent(env, key);
}

pub fn profile_exists(env: &Env, id: &BytesN<32>) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::ProfConfig(id.clone()))
}

/// Save the immutable config and the initial status of a new profile.
pub fn save_profile(env: &Env, profile: &Profile) {
    let config = ProfileConfig {
        id: profile.id.clone(),
        nonce: profile.nonce,
        owner: profile.owner.clone(),
        target_amount: profile.target_amount,
        reference_code: profile.reference_code,
        name: profile.name.clone(),
        metadata: profile.metadata.clone(),
        recipient: profile.recipient.clone(),
        description: profile.description.clone(),
    };
    write(env, &DataKey::ProfConfig(profile.id.clone()), &config);
    write(env, &DataKey::ProfStatus(profile.id.clone()), &profile.status);
}

/// Load the full `Profile` by combining config and status.
pub fn load_profile(env: &Env, id: &BytesN<32>) -> Result<Profile, Error> {
    let config = load_profile_config(env, id)?;
    let status = load_profile_status(env, id)?;
    Ok(Profile {
        id: config.id,
        nonce: config.nonce,
        owner: config.owner,
        target_amount: config.target_amount,
        reference_code: config.reference_code,
        name: config.name,
        metadata: config.metadata,
        recipient: config.recipient,
        description: config.description,
        status,
    })
}

pub fn load_profile_config(env: &Env, id: &BytesN<32>) -> Result<ProfileConfig, Error> {
    read(env, &DataKey::ProfConfig(id.clone())).ok_or(Error::NotFound)
}

pub fn load_profile_status(env: &Env, id: &BytesN<32>) -> Result<ProfileStatus, Error> {
    read(env, &DataKey::ProfStatus(id.clone())).ok_or(Error::NotFound)
}

pub fn save_profile_status(env: &Env, id: &BytesN<32>, status: ProfileStatus) {
    write(env, &DataKey::ProfStatus(id.clone()), &status);
}

pub fn load_pool(env: &Env, id: &BytesN<32>) -> Result<PoolState, Error> {
    read(env, &DataKey::Pool(id.clone())).ok_or(Error::NotFound)
}

pub fn save_pool(env: &Env, id: &BytesN<32>, pool: &PoolState) {
    write(env, &DataKey::Pool(id.clone()), pool);
}

pub fn load_suppliers(env: &Env, id: &BytesN<32>) -> Vec<Address> {
    read(env, &DataKey::Suppliers(id.clone())).unwrap_or_else(|| Vec::new(env))
}

/// Stores the supplier list, dropping the entry once it is empty.
pub fn save_suppliers(env: &Env, id: &BytesN<32>, suppliers: &Vec<Address>) {
    let key = DataKey::Suppliers(id.clone());
    if suppliers.is_empty() {
        env.storage().persistent().remove(&key);
    } else {
        write(env, &key, suppliers);
    }
}

pub fn load_contribution(env: &Env, id: &BytesN<32>, supplier: &Address) -> i128 {
    read(env, &DataKey::Contribution(id.clone(), supplier.clone())).unwrap_or(0)
}

pub fn save_contribution(env: &Env, id: &BytesN<32>, supplier: &Address, amount: i128) {
    write(env, &DataKey::Contribution(id.clone(), supplier.clone()), &amount);
}

pub fn remove_contribution(env: &Env, id: &BytesN<32>, supplier: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Contribution(id.clone(), supplier.clone()));
}

pub fn strategy_exists(env: &Env, id: &BytesN<32>) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Strategy(id.clone()))
}

pub fn load_strategy(env: &Env, id: &BytesN<32>) -> Result<StrategyRecord, Error> {
    read(env, &DataKey::Strategy(id.clone())).ok_or(Error::NotFound)
}

pub fn save_strategy(env: &Env, record: &StrategyRecord) {
    write(env, &DataKey::Strategy(record.profile_id.clone()), record);
}

pub fn load_vote(env: &Env, id: &BytesN<32>, voter: &Address) -> Option<VoteChoice> {
    read(env, &DataKey::Vote(id.clone(), voter.clone()))
}

pub fn save_vote(env: &Env, id: &BytesN<32>, voter: &Address, choice: VoteChoice) {
    write(env, &DataKey::Vote(id.clone(), voter.clone()), &choice);
}
