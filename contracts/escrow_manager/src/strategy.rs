//! # Strategy: vote tally and dispersal
//!
//! Suppliers vote on their profile's strategy instance. The tally is
//! recomputed from the recorded votes on every cast and every contribution,
//! so weights always reflect current contributions. Once a side wins the
//! instance becomes terminal, the profile is marked `Resolved` and the pool
//! is dispersed exactly once.
//!
//! A failed dispersal does not undo the resolution: the record keeps its
//! terminal status with `DispersalState::Failed` and the pool keeps the
//! undispersed value until [`retry_dispersal`] succeeds.

use soroban_sdk::{Address, BytesN, Env};

use crate::escrow;
use crate::events::{self, DispersalFailed, ProjectResolved, VoteCast};
use crate::storage;
use crate::types::{
    DispersalState, ProfileStatus, RevotePolicy, StrategyRecord, StrategyStatus, Tally,
    VoteChoice, VoteReceipt, VoteWeighting, BPS_DENOMINATOR,
};
use crate::Error;

/// Record `voter`'s choice and resolve the strategy if the tally allows it.
pub fn cast_vote(
    env: &Env,
    profile_id: &BytesN<32>,
    voter: &Address,
    choice: VoteChoice,
) -> Result<VoteReceipt, Error> {
    let mut record = storage::load_strategy(env, profile_id)?;
    if record.status.is_terminal() {
        return Err(Error::Closed);
    }
    if storage::load_contribution(env, profile_id, voter) <= 0 {
        return Err(Error::NotEligible);
    }
    let previous = storage::load_vote(env, profile_id, voter);
    if previous.is_some() && record.template.revote == RevotePolicy::Reject {
        return Err(Error::AlreadyVoted);
    }

    storage::save_vote(env, profile_id, voter, choice);
    if previous.is_none() {
        record.votes_cast += 1;
    }
    events::emit_vote_cast(
        env,
        VoteCast {
            profile_id: profile_id.clone(),
            voter: voter.clone(),
            choice,
        },
    );

    settle(env, &mut record)?;
    storage::save_strategy(env, &record);

    Ok(VoteReceipt {
        status: record.status,
        dispersal: record.dispersal,
        tally: record.tally,
    })
}

/// Re-evaluate an open strategy after its pool changed.
///
/// A top-up from a supplier who already voted can carry that side past the
/// threshold; the strategy then resolves inside the funding call.
pub fn reassess(env: &Env, profile_id: &BytesN<32>) -> Result<StrategyStatus, Error> {
    let mut record = storage::load_strategy(env, profile_id)?;
    if record.status.is_terminal() {
        return Ok(record.status);
    }
    settle(env, &mut record)?;
    storage::save_strategy(env, &record);
    Ok(record.status)
}

/// Refresh the stored tally and resolve if the vote is decided.
fn settle(env: &Env, record: &mut StrategyRecord) -> Result<(), Error> {
    let profile_id = record.profile_id.clone();
    record.tally = tally(env, &profile_id, record.template.weighting);
    let supplier_count = storage::load_suppliers(env, &profile_id).len();
    if let Some(outcome) = decide(
        &record.tally,
        record.template.threshold_bps,
        record.votes_cast,
        supplier_count,
    ) {
        resolve(env, record, outcome)?;
    }
    Ok(())
}

/// Retry the dispersal of a resolved strategy whose first attempt failed.
///
/// Returns the amount moved by this attempt. Fails with
/// [`Error::AlreadyResolved`] once the pool is empty and with
/// [`Error::DispersalFailed`] if value still cannot move.
pub fn retry_dispersal(env: &Env, profile_id: &BytesN<32>) -> Result<i128, Error> {
    let mut record = storage::load_strategy(env, profile_id)?;
    if !record.status.is_terminal() {
        return Err(Error::StillOpen);
    }
    let recipient = storage::load_profile_config(env, profile_id)?.recipient;
    let amount = escrow::disperse(env, profile_id, record.status, &recipient)?;

    record.dispersal = DispersalState::Completed;
    storage::save_strategy(env, &record);
    events::emit_project_resolved(
        env,
        ProjectResolved {
            profile_id: profile_id.clone(),
            outcome: record.status,
            amount,
        },
    );
    Ok(amount)
}

/// Weighted totals over every supplier of the pool.
fn tally(env: &Env, profile_id: &BytesN<32>, weighting: VoteWeighting) -> Tally {
    let mut tally = Tally::default();
    for supplier in storage::load_suppliers(env, profile_id).iter() {
        let weight = match weighting {
            VoteWeighting::PerSupplier => 1,
            VoteWeighting::ByContribution => {
                storage::load_contribution(env, profile_id, &supplier)
            }
        };
        tally.total += weight;
        match storage::load_vote(env, profile_id, &supplier) {
            Some(VoteChoice::Approve) => tally.approve += weight,
            Some(VoteChoice::Reject) => tally.reject += weight,
            None => {}
        }
    }
    tally
}

/// Outcome for `tally`, or `None` while the vote is still open.
///
/// A side wins when its weight strictly exceeds `threshold_bps` of the total.
/// If both sides clear a low threshold, or every supplier has voted without
/// either clearing it, the heavier side wins and a tie rejects.
pub fn decide(
    tally: &Tally,
    threshold_bps: u32,
    votes_cast: u32,
    supplier_count: u32,
) -> Option<StrategyStatus> {
    if tally.total <= 0 {
        return None;
    }
    let clears = |side: i128| exceeds_share(side, tally.total, threshold_bps);
    let heavier = if tally.approve > tally.reject {
        StrategyStatus::Approved
    } else {
        StrategyStatus::Rejected
    };

    match (clears(tally.approve), clears(tally.reject)) {
        (true, true) => Some(heavier),
        (true, false) => Some(StrategyStatus::Approved),
        (false, true) => Some(StrategyStatus::Rejected),
        (false, false) if votes_cast >= supplier_count => Some(heavier),
        (false, false) => None,
    }
}

/// `side / total > bps / 10_000` without overflowing on very large pools.
fn exceeds_share(side: i128, total: i128, bps: u32) -> bool {
    let bps = bps as i128;
    let denominator = BPS_DENOMINATOR as i128;
    if let (Some(lhs), Some(rhs)) = (side.checked_mul(denominator), total.checked_mul(bps)) {
        return lhs > rhs;
    }
    // total = q * 10_000 + r, so the bar is q * bps plus r * bps / 10_000.
    // Comparing against the floor of the bar is exact for integer `side`.
    let q = total / denominator;
    let r = total % denominator;
    side > q * bps + (r * bps) / denominator
}

fn resolve(env: &Env, record: &mut StrategyRecord, outcome: StrategyStatus) -> Result<(), Error> {
    let profile_id = record.profile_id.clone();
    let recipient = storage::load_profile_config(env, &profile_id)?.recipient;

    record.status = outcome;
    storage::save_profile_status(env, &profile_id, ProfileStatus::Resolved);

    match escrow::disperse(env, &profile_id, outcome, &recipient) {
        Ok(amount) => {
            record.dispersal = DispersalState::Completed;
            events::emit_project_resolved(
                env,
                ProjectResolved {
                    profile_id,
                    outcome,
                    amount,
                },
            );
        }
        Err(Error::DispersalFailed) => {
            record.dispersal = DispersalState::Failed;
            let outstanding = escrow::balance(env, &profile_id)?;
            events::emit_dispersal_failed(
                env,
                DispersalFailed {
                    profile_id,
                    outcome,
                    outstanding,
                },
            );
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
