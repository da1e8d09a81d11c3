//! # Capability gate
//!
//! Privileged registry operations are allowed only while the manager
//! contract itself holds the configured capability. The gate is an external
//! contract consumed through [`CapabilityGateClient`]; both queries are
//! treated as pure oracles.
//!
//! Callers must run [`require_capability`] before their first storage write
//! so a denied call leaves no trace.

use soroban_sdk::{contractclient, Address, Env};

use crate::types::ManagerConfig;
use crate::Error;

/// Interface of the capability-token contract.
#[contractclient(name = "CapabilityGateClient")]
pub trait CapabilityGate {
    /// Whether `subject` is currently allowed to wear `capability`.
    fn is_eligible(env: Env, subject: Address, capability: u128) -> bool;

    /// Whether `account` currently holds `capability`.
    fn is_holder(env: Env, account: Address, capability: u128) -> bool;
}

/// Fails with [`Error::Unauthorized`] unless the manager is both eligible
/// for and holder of the configured capability.
pub fn require_capability(env: &Env, config: &ManagerConfig) -> Result<(), Error> {
    let gate = CapabilityGateClient::new(env, &config.gate);
    let subject = env.current_contract_address();

    if !gate.is_eligible(&subject, &config.capability) {
        return Err(Error::Unauthorized);
    }
    if !gate.is_holder(&subject, &config.capability) {
        return Err(Error::Unauthorized);
    }
    Ok(())
}
