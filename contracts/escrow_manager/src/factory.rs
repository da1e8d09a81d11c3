//! # Strategy factory
//!
//! Instantiates one strategy record per profile from the stored
//! [`StrategyTemplate`]. The record owns a private copy of the template and
//! its own tally; vote entries are keyed by profile ID, so instances never
//! alias each other's state.

use soroban_sdk::{BytesN, Env};

use crate::storage;
use crate::types::{DispersalState, StrategyRecord, StrategyStatus, Tally};
use crate::Error;

/// Build a fresh, unsaved strategy record bound to `profile_id`.
///
/// Fails with [`Error::InstantiationFailed`] when no template is stored, the
/// strategy ID space is exhausted, or `profile_id` already has a strategy.
/// The caller persists the record only after every other registration check
/// has passed.
pub fn create_strategy(env: &Env, profile_id: &BytesN<32>) -> Result<StrategyRecord, Error> {
    if storage::strategy_exists(env, profile_id) {
        return Err(Error::InstantiationFailed);
    }
    let template = storage::load_template(env).ok_or(Error::InstantiationFailed)?;
    let strategy_id = storage::next_strategy_id(env).ok_or(Error::InstantiationFailed)?;

    Ok(StrategyRecord {
        strategy_id,
        profile_id: profile_id.clone(),
        template,
        status: StrategyStatus::Open,
        tally: Tally::default(),
        votes_cast: 0,
        dispersal: DispersalState::Pending,
    })
}
