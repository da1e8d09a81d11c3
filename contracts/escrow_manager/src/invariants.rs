use soroban_sdk::BytesN;

use crate::types::{DispersalState, Profile, ProfileStatus, StrategyRecord, StrategyStatus};
use crate::EscrowManagerClient;

/// INV-1: The pool balance equals the sum of all recorded contributions.
pub fn assert_pool_conserved(client: &EscrowManagerClient, profile_id: &BytesN<32>) {
    let balance = client.get_project_supply(profile_id);
    let mut sum: i128 = 0;
    for supplier in client.get_project_suppliers(profile_id).iter() {
        let contribution = client.get_project_supplier_by_id(profile_id, &supplier);
        assert!(
            contribution > 0,
            "INV-1 violated: listed supplier has no contribution"
        );
        sum += contribution;
    }
    assert_eq!(
        balance, sum,
        "INV-1 violated: pool balance {} != sum of contributions {}",
        balance, sum
    );
}

/// INV-2: The pool balance is never negative.
pub fn assert_balance_non_negative(client: &EscrowManagerClient, profile_id: &BytesN<32>) {
    let balance = client.get_project_supply(profile_id);
    assert!(
        balance >= 0,
        "INV-2 violated: negative pool balance ({})",
        balance
    );
}

/// INV-3: Refunds add up to the balance held before dispersal.
pub fn assert_refund_conservation(balance_before: i128, refunds: &[i128]) {
    let refunded: i128 = refunds.iter().sum();
    assert_eq!(
        refunded, balance_before,
        "INV-3 violated: refunded {} out of a pool of {}",
        refunded, balance_before
    );
}

/// INV-4: Profile status only moves forward:
///   Active  -> Funding | Resolved
///   Funding -> Resolved
///   Resolved -> (none)
pub fn assert_valid_status_transition(from: &ProfileStatus, to: &ProfileStatus) {
    let valid = from == to
        || matches!(
            (from, to),
            (ProfileStatus::Active, ProfileStatus::Funding)
                | (ProfileStatus::Active, ProfileStatus::Resolved)
                | (ProfileStatus::Funding, ProfileStatus::Resolved)
        );

    assert!(
        valid,
        "INV-4 violated: invalid status transition from {:?} to {:?}",
        from, to
    );
}

/// INV-5: A terminal strategy has left `Pending`, and a completed dispersal
/// left nothing behind.
pub fn assert_terminal_strategy_settled(record: &StrategyRecord, pool_balance: i128) {
    match record.status {
        StrategyStatus::Open => assert_eq!(
            record.dispersal,
            DispersalState::Pending,
            "INV-5 violated: open strategy has dispersal state {:?}",
            record.dispersal
        ),
        StrategyStatus::Approved | StrategyStatus::Rejected => {
            assert_ne!(
                record.dispersal,
                DispersalState::Pending,
                "INV-5 violated: terminal strategy never attempted dispersal"
            );
            if record.dispersal == DispersalState::Completed {
                assert_eq!(
                    pool_balance, 0,
                    "INV-5 violated: completed dispersal left {} in the pool",
                    pool_balance
                );
            }
        }
    }
}

/// INV-6: Registration fields never change after creation.
pub fn assert_profile_immutable_fields(original: &Profile, current: &Profile) {
    assert_eq!(original.id, current.id, "INV-6 violated: profile id changed");
    assert_eq!(
        original.owner, current.owner,
        "INV-6 violated: profile owner changed"
    );
    assert_eq!(
        original.target_amount, current.target_amount,
        "INV-6 violated: profile target changed"
    );
    assert_eq!(
        original.recipient, current.recipient,
        "INV-6 violated: profile recipient changed"
    );
    assert_eq!(
        original.metadata, current.metadata,
        "INV-6 violated: profile metadata changed"
    );
    assert_eq!(
        original.name, current.name,
        "INV-6 violated: profile name changed"
    );
}

/// Run all per-profile invariants against the live contract.
pub fn assert_all_profile_invariants(client: &EscrowManagerClient, profile_id: &BytesN<32>) {
    assert_balance_non_negative(client, profile_id);
    assert_pool_conserved(client, profile_id);
    let record = client.get_strategy(profile_id);
    assert_terminal_strategy_settled(&record, client.get_project_supply(profile_id));
}
