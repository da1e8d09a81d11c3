//! # Escrow Manager Contract
//!
//! A crowdfunding escrow with supplier voting. Profiles are registered
//! through the manager, suppliers fund a per-profile pool, and each profile's
//! strategy instance decides whether the pool goes to the recipient or back to
//! the suppliers.
//!
//! | Phase        | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Bootstrap    | [`EscrowManager::init`]                                     |
//! | Admin        | `set_strategy_template`                                     |
//! | Registration | [`EscrowManager::register_project`]                         |
//! | Funding      | [`EscrowManager::supply_project`]                           |
//! | Voting       | [`EscrowManager::cast_vote`], `retry_dispersal`             |
//! | Queries      | `get_profile`, `get_project_supply`, `get_project_suppliers`, `get_project_supplier_by_id`, `get_project_strategy`, `get_strategy`, `get_vote`, `get_config`, `get_strategy_template` |
//!
//! ## Architecture
//!
//! Privileged calls are checked by [`gate`] before any write. Pools live in
//! [`escrow`], strategy instances are created by [`factory`] and driven by
//! [`strategy`]. Storage access is fully delegated to `storage`. This file
//! contains only the public entry points and input validation.
//!
//! Every entry point returns `Result`; an `Err` aborts the invocation and the
//! host discards all of its writes, transfers and events.

#![no_std]

#[cfg(test)]
extern crate std;

use soroban_sdk::{
    contract, contracterror, contractimpl, token, xdr::ToXdr, Address, BytesN, Env, String, Vec,
};

pub mod escrow;
pub mod events;
pub mod factory;
pub mod gate;
mod storage;
pub mod strategy;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_voting;

use events::{ProjectFunded, ProjectRegistered, TemplateUpdated};
pub use gate::{CapabilityGate, CapabilityGateClient};
pub use types::{
    DispersalState, ManagerConfig, Metadata, PoolState, Profile, ProfileStatus, RevotePolicy,
    StrategyRecord, StrategyStatus, StrategyTemplate, Tally, VoteChoice, VoteReceipt,
    VoteWeighting,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    InvalidParameters   = 1,
    NotFound            = 2,
    Unauthorized        = 3,
    ClosedForFunding    = 4,
    Closed              = 5,
    AmountMismatch      = 6,
    NotEligible         = 7,
    AlreadyVoted        = 8,
    AlreadyResolved     = 9,
    DispersalFailed     = 10,
    InstantiationFailed = 11,
    AlreadyInitialized  = 12,
    NotInitialized      = 13,
    StillOpen           = 14,
}

#[contract]
pub struct EscrowManager;

#[contractimpl]
impl EscrowManager {
    // ─────────────────────────────────────────────────────────
    // Initialisation and administration
    // ─────────────────────────────────────────────────────────

    /// Initialise the manager.
    ///
    /// Must be called exactly once immediately after deployment.
    /// Subsequent calls fail with `Error::AlreadyInitialized`.
    ///
    /// - `token` is the asset escrowed by every pool.
    /// - `gate` and `capability` identify the capability the manager itself
    ///   must hold for privileged operations.
    /// - `template` is cloned into every strategy created afterwards.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        gate: Address,
        capability: u128,
        template: StrategyTemplate,
    ) -> Result<(), Error> {
        admin.require_auth();
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        if !template.is_valid() {
            return Err(Error::InvalidParameters);
        }
        storage::save_config(
            &env,
            &ManagerConfig {
                admin,
                token,
                gate,
                capability,
            },
        );
        storage::save_template(&env, &template);
        Ok(())
    }

    /// Replace the template used for strategies created from now on.
    ///
    /// Existing strategy instances keep their own copy.
    pub fn set_strategy_template(
        env: Env,
        admin: Address,
        template: StrategyTemplate,
    ) -> Result<(), Error> {
        admin.require_auth();
        let config = storage::load_config(&env)?;
        if admin != config.admin {
            return Err(Error::Unauthorized);
        }
        gate::require_capability(&env, &config)?;
        if !template.is_valid() {
            return Err(Error::InvalidParameters);
        }

        storage::save_template(&env, &template);
        events::emit_template_updated(&env, TemplateUpdated { admin, template });
        Ok(())
    }

    pub fn get_config(env: Env) -> Result<ManagerConfig, Error> {
        storage::load_config(&env)
    }

    pub fn get_strategy_template(env: Env) -> Result<StrategyTemplate, Error> {
        storage::load_config(&env)?;
        storage::load_template(&env).ok_or(Error::NotInitialized)
    }

    // ─────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────

    /// Register a new funding profile and return its ID.
    ///
    /// Requires the manager to hold its capability. The profile, its pool and
    /// its strategy instance are created together; if the factory fails
    /// nothing is stored.
    #[allow(clippy::too_many_arguments)]
    pub fn register_project(
        env: Env,
        owner: Address,
        target_amount: i128,
        reference_code: u64,
        name: String,
        metadata: Metadata,
        recipient: Address,
        description: String,
    ) -> Result<BytesN<32>, Error> {
        owner.require_auth();
        let config = storage::load_config(&env)?;
        gate::require_capability(&env, &config)?;

        if target_amount <= 0
            || name.len() == 0
            || description.len() == 0
            || metadata.pointer.len() == 0
            || recipient == env.current_contract_address()
        {
            return Err(Error::InvalidParameters);
        }

        let nonce = storage::next_profile_nonce(&env);
        let id = derive_profile_id(
            &env,
            nonce,
            &owner,
            target_amount,
            reference_code,
            &name,
            &recipient,
        );
        if storage::profile_exists(&env, &id) {
            return Err(Error::InstantiationFailed);
        }
        let strategy = factory::create_strategy(&env, &id)?;

        let profile = Profile {
            id: id.clone(),
            nonce,
            owner: owner.clone(),
            target_amount,
            reference_code,
            name,
            metadata,
            recipient: recipient.clone(),
            description,
            status: ProfileStatus::Active,
        };
        storage::save_profile(&env, &profile);
        escrow::open_pool(&env, &id);
        storage::save_strategy(&env, &strategy);

        events::emit_project_registered(
            &env,
            ProjectRegistered {
                profile_id: id.clone(),
                owner,
                recipient,
                target_amount,
                strategy_id: strategy.strategy_id,
            },
        );
        Ok(id)
    }

    /// Retrieve a profile by its ID.
    pub fn get_profile(env: Env, profile_id: BytesN<32>) -> Result<Profile, Error> {
        storage::load_profile(&env, &profile_id)
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Contribute `amount` of the escrow token to a profile's pool.
    ///
    /// The tokens are pulled from `supplier` into the manager and the value
    /// actually received is compared to `amount`. On a mismatch the call fails
    /// and the transfer is reverted with it.
    ///
    /// The strategy tally is refreshed afterwards, so a top-up that carries an
    /// already-cast side past the threshold resolves the strategy here.
    pub fn supply_project(
        env: Env,
        profile_id: BytesN<32>,
        supplier: Address,
        amount: i128,
    ) -> Result<(), Error> {
        supplier.require_auth();
        let config = storage::load_config(&env)?;
        let status = storage::load_profile_status(&env, &profile_id)?;
        if status == ProfileStatus::Resolved
            || storage::load_strategy(&env, &profile_id)?.status.is_terminal()
        {
            return Err(Error::ClosedForFunding);
        }
        if amount <= 0 {
            return Err(Error::InvalidParameters);
        }

        let token = token::Client::new(&env, &config.token);
        let vault = env.current_contract_address();
        let before = token.balance(&vault);
        token.transfer(&supplier, &vault, &amount);
        if token.balance(&vault) - before != amount {
            return Err(Error::AmountMismatch);
        }

        escrow::supply(&env, &profile_id, &supplier, amount)?;
        if status == ProfileStatus::Active {
            storage::save_profile_status(&env, &profile_id, ProfileStatus::Funding);
        }

        events::emit_project_funded(
            &env,
            ProjectFunded {
                profile_id: profile_id.clone(),
                supplier,
                amount,
            },
        );
        strategy::reassess(&env, &profile_id)?;
        Ok(())
    }

    /// Total value currently held in the profile's pool.
    pub fn get_project_supply(env: Env, profile_id: BytesN<32>) -> Result<i128, Error> {
        escrow::balance(&env, &profile_id)
    }

    /// Suppliers of the profile in first-contribution order.
    pub fn get_project_suppliers(env: Env, profile_id: BytesN<32>) -> Result<Vec<Address>, Error> {
        escrow::suppliers(&env, &profile_id)
    }

    /// Cumulative contribution of `supplier`; `0` if it never contributed.
    pub fn get_project_supplier_by_id(
        env: Env,
        profile_id: BytesN<32>,
        supplier: Address,
    ) -> Result<i128, Error> {
        escrow::contribution_of(&env, &profile_id, &supplier)
    }

    // ─────────────────────────────────────────────────────────
    // Strategy
    // ─────────────────────────────────────────────────────────

    /// ID of the strategy instance bound to the profile.
    pub fn get_project_strategy(env: Env, profile_id: BytesN<32>) -> Result<u64, Error> {
        Ok(storage::load_strategy(&env, &profile_id)?.strategy_id)
    }

    pub fn get_strategy(env: Env, profile_id: BytesN<32>) -> Result<StrategyRecord, Error> {
        storage::load_strategy(&env, &profile_id)
    }

    pub fn get_vote(
        env: Env,
        profile_id: BytesN<32>,
        voter: Address,
    ) -> Result<Option<VoteChoice>, Error> {
        storage::load_strategy(&env, &profile_id)?;
        Ok(storage::load_vote(&env, &profile_id, &voter))
    }

    /// Vote on the profile's strategy. Only suppliers may vote.
    ///
    /// A vote that resolves the strategy also disperses the pool. If the
    /// dispersal cannot complete the vote still commits and the receipt
    /// reports `DispersalState::Failed`.
    pub fn cast_vote(
        env: Env,
        profile_id: BytesN<32>,
        voter: Address,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, Error> {
        voter.require_auth();
        strategy::cast_vote(&env, &profile_id, &voter, choice)
    }

    /// Retry a dispersal that failed at resolution. Returns the amount moved.
    pub fn retry_dispersal(env: Env, profile_id: BytesN<32>) -> Result<i128, Error> {
        strategy::retry_dispersal(&env, &profile_id)
    }
}

/// `sha256` over the XDR of the creation parameters and the registry nonce.
fn derive_profile_id(
    env: &Env,
    nonce: u64,
    owner: &Address,
    target_amount: i128,
    reference_code: u64,
    name: &String,
    recipient: &Address,
) -> BytesN<32> {
    let seed = (
        nonce,
        owner.clone(),
        target_amount,
        reference_code,
        name.clone(),
        recipient.clone(),
    );
    env.crypto().sha256(&seed.to_xdr(env)).to_bytes()
}
