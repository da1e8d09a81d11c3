//! # Escrow ledger
//!
//! Owns every profile's pool: the balance, the ordered supplier list and the
//! per-supplier contributions.
//!
//! Conservation: `balance == Σ contributions` after every call, including a
//! refund that only partially went through (refunded suppliers are removed
//! together with their share of the balance).
//!
//! [`disperse`] is crate-private and only called from the strategy module;
//! no entry point reaches it without a resolved strategy.

use soroban_sdk::{token, Address, BytesN, Env, Vec};

use crate::storage;
use crate::types::{PoolState, StrategyStatus};
use crate::Error;

/// Create the empty pool of a freshly registered profile.
pub fn open_pool(env: &Env, profile_id: &BytesN<32>) {
    storage::save_pool(
        env,
        profile_id,
        &PoolState {
            balance: 0,
            dispersed: false,
        },
    );
}

/// Credit `amount` to the pool and to `supplier`'s contribution.
///
/// The first contribution appends `supplier` to the ordered supplier list;
/// later ones accumulate. Returns the supplier's new cumulative contribution.
pub fn supply(
    env: &Env,
    profile_id: &BytesN<32>,
    supplier: &Address,
    amount: i128,
) -> Result<i128, Error> {
    if amount <= 0 {
        return Err(Error::InvalidParameters);
    }
    let mut pool = storage::load_pool(env, profile_id)?;
    if pool.dispersed {
        return Err(Error::ClosedForFunding);
    }

    let current = storage::load_contribution(env, profile_id, supplier);
    let contribution = current
        .checked_add(amount)
        .ok_or(Error::InvalidParameters)?;
    pool.balance = pool
        .balance
        .checked_add(amount)
        .ok_or(Error::InvalidParameters)?;

    if current == 0 {
        let mut suppliers = storage::load_suppliers(env, profile_id);
        suppliers.push_back(supplier.clone());
        storage::save_suppliers(env, profile_id, &suppliers);
    }
    storage::save_contribution(env, profile_id, supplier, contribution);
    storage::save_pool(env, profile_id, &pool);
    Ok(contribution)
}

/// Current pool balance.
pub fn balance(env: &Env, profile_id: &BytesN<32>) -> Result<i128, Error> {
    Ok(storage::load_pool(env, profile_id)?.balance)
}

/// Suppliers in first-contribution order.
pub fn suppliers(env: &Env, profile_id: &BytesN<32>) -> Result<Vec<Address>, Error> {
    storage::load_pool(env, profile_id)?;
    Ok(storage::load_suppliers(env, profile_id))
}

/// Cumulative contribution of `supplier`, `0` if it never contributed.
pub fn contribution_of(
    env: &Env,
    profile_id: &BytesN<32>,
    supplier: &Address,
) -> Result<i128, Error> {
    storage::load_pool(env, profile_id)?;
    Ok(storage::load_contribution(env, profile_id, supplier))
}

/// Move the pool out according to `outcome`.
///
/// * `Approved`: the whole balance goes to `recipient` in one transfer.
/// * `Rejected`: each supplier gets back exactly its own contribution.
///
/// Returns the amount moved. A pool that was already dispersed fails with
/// [`Error::AlreadyResolved`] and moves nothing.
///
/// When a transfer fails the call returns [`Error::DispersalFailed`] *after*
/// persisting whatever did move: refunded suppliers are dropped from the pool,
/// the others keep their entries so a retry pays exactly the remainder.
pub(crate) fn disperse(
    env: &Env,
    profile_id: &BytesN<32>,
    outcome: StrategyStatus,
    recipient: &Address,
) -> Result<i128, Error> {
    let mut pool = storage::load_pool(env, profile_id)?;
    if pool.dispersed {
        return Err(Error::AlreadyResolved);
    }
    let config = storage::load_config(env)?;
    let token = token::Client::new(env, &config.token);
    let vault = env.current_contract_address();
    let suppliers = storage::load_suppliers(env, profile_id);

    let moved = match outcome {
        StrategyStatus::Open => return Err(Error::StillOpen),
        StrategyStatus::Approved => {
            let amount = pool.balance;
            if amount > 0 && !matches!(token.try_transfer(&vault, recipient, &amount), Ok(Ok(())))
            {
                return Err(Error::DispersalFailed);
            }
            for supplier in suppliers.iter() {
                storage::remove_contribution(env, profile_id, &supplier);
            }
            storage::save_suppliers(env, profile_id, &Vec::new(env));
            amount
        }
        StrategyStatus::Rejected => {
            let mut outstanding = Vec::new(env);
            let mut refunded: i128 = 0;
            for supplier in suppliers.iter() {
                let amount = storage::load_contribution(env, profile_id, &supplier);
                if amount > 0
                    && !matches!(token.try_transfer(&vault, &supplier, &amount), Ok(Ok(())))
                {
                    outstanding.push_back(supplier);
                    continue;
                }
                storage::remove_contribution(env, profile_id, &supplier);
                refunded += amount;
            }
            storage::save_suppliers(env, profile_id, &outstanding);
            refunded
        }
    };

    pool.balance -= moved;
    pool.dispersed = storage::load_suppliers(env, profile_id).is_empty();
    storage::save_pool(env, profile_id, &pool);

    if !pool.dispersed {
        return Err(Error::DispersalFailed);
    }
    Ok(moved)
}
