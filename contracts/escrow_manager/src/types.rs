//! # Types
//!
//! Shared data structures used across all modules of the escrow manager.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A `Profile` is internally stored as two separate ledger entries:
//!
//! - [`ProfileConfig`]: written once at registration; never mutated.
//! - [`ProfileStatus`]: rewritten on the first contribution and on resolution.
//!
//! The public API exposes the reconstructed [`Profile`] struct for convenience.
//!
//! ### Status as a Finite-State Machine
//!
//! ```text
//! ProfileStatus:   Active ──► Funding ──► Resolved
//!                     └──────────────────►┘
//!
//! StrategyStatus:  Open ──► Approved
//!                     └───► Rejected
//!
//! DispersalState:  Pending ──► Completed
//!                     └──► Failed ──► Completed   (retry_dispersal)
//! ```
//!
//! Backward transitions and transitions out of terminal states are rejected
//! by the entry points that own them.

use soroban_sdk::{contracttype, Address, BytesN, String};

/// Basis-point denominator used by [`StrategyTemplate::threshold_bps`].
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Lifecycle status of a profile.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileStatus {
    /// Registered, no contribution yet.
    Active,
    /// At least one supplier has contributed.
    Funding,
    /// The strategy reached a terminal state; funding is closed.
    Resolved,
}

/// Opaque metadata pointer: a protocol tag plus a payload reference
/// (e.g. `1` + an IPFS CID).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Metadata {
    pub protocol: u32,
    pub pointer: String,
}

/// Immutable profile configuration, written once at registration.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileConfig {
    pub id: BytesN<32>,
    pub nonce: u64,
    pub owner: Address,
    pub target_amount: i128,
    pub reference_code: u64,
    pub name: String,
    pub metadata: Metadata,
    pub recipient: Address,
    pub description: String,
}

/// Full representation of a funding profile.
///
/// Used as the public API return type; reconstructed internally from
/// the split `ProfileConfig` + `ProfileStatus` storage entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    /// Deterministic ID: hash of the creation parameters and the nonce.
    pub id: BytesN<32>,
    /// Registry nonce consumed by this profile.
    pub nonce: u64,
    /// Address that registered the profile.
    pub owner: Address,
    /// Target funding amount.
    pub target_amount: i128,
    /// External reference code supplied by the registrant.
    pub reference_code: u64,
    /// Display name.
    pub name: String,
    /// Opaque metadata pointer.
    pub metadata: Metadata,
    /// Receives the pool when suppliers approve.
    pub recipient: Address,
    /// Free-text description.
    pub description: String,
    /// Current lifecycle status.
    pub status: ProfileStatus,
}

/// Escrow pool header. Per-supplier contributions live in their own entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    pub balance: i128,
    pub dispersed: bool,
}

/// A supplier's vote. Reject keeps its historical wire code `2`.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum VoteChoice {
    Approve = 1,
    Reject = 2,
}

/// How a vote is weighted in the tally.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteWeighting {
    /// One vote per supplier.
    PerSupplier,
    /// Weight equals the supplier's cumulative contribution.
    ByContribution,
}

/// What happens when a supplier votes a second time.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevotePolicy {
    /// The second vote fails with `AlreadyVoted`.
    Reject,
    /// The second vote replaces the first.
    Overwrite,
}

/// Voting rules copied into every strategy instance at creation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StrategyTemplate {
    /// A side wins once its weight strictly exceeds this share of the total.
    pub threshold_bps: u32,
    pub weighting: VoteWeighting,
    pub revote: RevotePolicy,
}

impl StrategyTemplate {
    /// Simple majority of contributed value, one vote per supplier.
    pub fn majority_by_contribution() -> Self {
        StrategyTemplate {
            threshold_bps: BPS_DENOMINATOR / 2,
            weighting: VoteWeighting::ByContribution,
            revote: RevotePolicy::Reject,
        }
    }

    /// A threshold of 100% or more could never be strictly exceeded.
    pub fn is_valid(&self) -> bool {
        self.threshold_bps < BPS_DENOMINATOR
    }
}

/// Lifecycle of a strategy instance.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrategyStatus {
    Open,
    Approved,
    Rejected,
}

impl StrategyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StrategyStatus::Open)
    }
}

/// Progress of the pool dispersal that follows resolution.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispersalState {
    /// The strategy is still open.
    Pending,
    /// All value left the pool.
    Completed,
    /// Resolution happened but at least one transfer failed; retryable.
    Failed,
}

/// Weighted vote totals.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    pub approve: i128,
    pub reject: i128,
    pub total: i128,
}

/// Per-profile strategy instance.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StrategyRecord {
    pub strategy_id: u64,
    pub profile_id: BytesN<32>,
    /// Private copy of the template in force at creation.
    pub template: StrategyTemplate,
    pub status: StrategyStatus,
    pub tally: Tally,
    pub votes_cast: u32,
    pub dispersal: DispersalState,
}

/// Returned by `cast_vote`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteReceipt {
    pub status: StrategyStatus,
    pub dispersal: DispersalState,
    pub tally: Tally,
}

/// Contract-wide configuration written by `init`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagerConfig {
    /// May replace the strategy template (subject to the capability gate).
    pub admin: Address,
    /// Token contract holding escrowed value.
    pub token: Address,
    /// Capability gate contract.
    pub gate: Address,
    /// Capability the manager must hold to perform privileged operations.
    pub capability: u128,
}
