//! # Events
//!
//! Every state change observable from outside the contract is published here.
//! Topics are `(symbol, profile_id)` so indexers can filter by profile; the
//! data payload is one of the structs below.
//!
//! | Topic        | Data                 |
//! |--------------|----------------------|
//! | `created`    | [`ProjectRegistered`] |
//! | `funded`     | [`ProjectFunded`]     |
//! | `voted`      | [`VoteCast`]          |
//! | `resolved`   | [`ProjectResolved`]   |
//! | `disp_fail`  | [`DispersalFailed`]   |
//! | `tmpl_set`   | [`TemplateUpdated`] (topic has no profile ID) |

use soroban_sdk::{contracttype, symbol_short, Address, BytesN, Env};

use crate::types::{StrategyStatus, StrategyTemplate, VoteChoice};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectRegistered {
    pub profile_id: BytesN<32>,
    pub owner: Address,
    pub recipient: Address,
    pub target_amount: i128,
    pub strategy_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectFunded {
    pub profile_id: BytesN<32>,
    pub supplier: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteCast {
    pub profile_id: BytesN<32>,
    pub voter: Address,
    pub choice: VoteChoice,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectResolved {
    pub profile_id: BytesN<32>,
    pub outcome: StrategyStatus,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispersalFailed {
    pub profile_id: BytesN<32>,
    pub outcome: StrategyStatus,
    /// Value still held in the pool.
    pub outstanding: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateUpdated {
    pub admin: Address,
    pub template: StrategyTemplate,
}

pub fn emit_project_registered(env: &Env, event: ProjectRegistered) {
    env.events()
        .publish((symbol_short!("created"), event.profile_id.clone()), event);
}

pub fn emit_project_funded(env: &Env, event: ProjectFunded) {
    env.events()
        .publish((symbol_short!("funded"), event.profile_id.clone()), event);
}

pub fn emit_vote_cast(env: &Env, event: VoteCast) {
    env.events()
        .publish((symbol_short!("voted"), event.profile_id.clone()), event);
}

pub fn emit_project_resolved(env: &Env, event: ProjectResolved) {
    env.events()
        .publish((symbol_short!("resolved"), event.profile_id.clone()), event);
}

pub fn emit_dispersal_failed(env: &Env, event: DispersalFailed) {
    env.events()
        .publish((symbol_short!("disp_fail"), event.profile_id.clone()), event);
}

pub fn emit_template_updated(env: &Env, event: TemplateUpdated) {
    env.events().publish((symbol_short!("tmpl_set"),), event);
}
