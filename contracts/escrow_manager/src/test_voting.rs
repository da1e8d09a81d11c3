use soroban_sdk::{testutils::Address as _, Address};

use crate::invariants::{assert_all_profile_invariants, assert_refund_conservation};
use crate::testutils::{Harness, UNIT};
use crate::{
    DispersalState, Error, ProfileStatus, RevotePolicy, StrategyStatus, StrategyTemplate, Tally,
    VoteChoice, VoteReceipt, VoteWeighting,
};

fn template(threshold_bps: u32, weighting: VoteWeighting, revote: RevotePolicy) -> StrategyTemplate {
    StrategyTemplate {
        threshold_bps,
        weighting,
        revote,
    }
}

#[test]
fn test_two_suppliers_reject_and_are_refunded() {
    let h = Harness::new();
    let (id, recipient) = h.register(UNIT);
    let supplier_1 = h.supplier(&id, UNIT / 2);
    let supplier_2 = h.supplier(&id, UNIT / 2);
    assert_eq!(h.manager.get_project_supply(&id), UNIT);

    // Reject keeps its wire code.
    assert_eq!(VoteChoice::Reject as u32, 2);

    let first = h.manager.cast_vote(&id, &supplier_1, &VoteChoice::Reject);
    assert_eq!(first.status, StrategyStatus::Open);
    assert_eq!(first.dispersal, DispersalState::Pending);
    assert_eq!(
        first.tally,
        Tally {
            approve: 0,
            reject: UNIT / 2,
            total: UNIT,
        }
    );

    let second = h.manager.cast_vote(&id, &supplier_2, &VoteChoice::Reject);
    assert_eq!(second.status, StrategyStatus::Rejected);
    assert_eq!(second.dispersal, DispersalState::Completed);

    let refunds = [h.token.balance(&supplier_1), h.token.balance(&supplier_2)];
    assert_eq!(refunds, [UNIT / 2, UNIT / 2]);
    assert_refund_conservation(UNIT, &refunds);

    assert_eq!(h.manager.get_project_supply(&id), 0);
    assert_eq!(h.manager.get_project_suppliers(&id).len(), 0);
    assert_eq!(h.manager.get_project_supplier_by_id(&id, &supplier_1), 0);
    assert_eq!(h.token.balance(&h.manager.address), 0);
    assert_eq!(h.token.balance(&recipient), 0);
    assert_eq!(h.manager.get_profile(&id).status, ProfileStatus::Resolved);
    assert_all_profile_invariants(&h.manager, &id);
}

#[test]
fn test_refund_is_pro_rata_not_equal_split() {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    let small = h.supplier(&id, 1_000);
    let large = h.supplier(&id, 9_000);

    h.manager.cast_vote(&id, &large, &VoteChoice::Reject);

    assert_eq!(h.token.balance(&small), 1_000);
    assert_eq!(h.token.balance(&large), 9_000);
    assert_eq!(h.manager.get_strategy(&id).status, StrategyStatus::Rejected);
}

#[test]
fn test_majority_by_contribution_approves_and_releases() {
    let h = Harness::new();
    let (id, recipient) = h.register(UNIT);
    let whale = h.supplier(&id, 7 * UNIT / 10);
    let minnow = h.supplier(&id, 3 * UNIT / 10);

    let receipt = h.manager.cast_vote(&id, &whale, &VoteChoice::Approve);
    assert_eq!(receipt.status, StrategyStatus::Approved);
    assert_eq!(receipt.dispersal, DispersalState::Completed);

    assert_eq!(h.token.balance(&recipient), UNIT);
    assert_eq!(h.token.balance(&minnow), 0);
    assert_eq!(h.manager.get_project_supply(&id), 0);
    assert_eq!(h.manager.get_project_suppliers(&id).len(), 0);
    assert_all_profile_invariants(&h.manager, &id);
}

#[test]
fn test_per_supplier_weighting_counts_heads() {
    let h = Harness::with_template(template(
        5_000,
        VoteWeighting::PerSupplier,
        RevotePolicy::Reject,
    ));
    let (id, recipient) = h.register(UNIT);
    let whale = h.supplier(&id, 9_000);
    let minnow_1 = h.supplier(&id, 500);
    let minnow_2 = h.supplier(&id, 500);

    let receipt = h.manager.cast_vote(&id, &whale, &VoteChoice::Approve);
    assert_eq!(receipt.status, StrategyStatus::Open);
    assert_eq!(receipt.tally.total, 3);

    h.manager.cast_vote(&id, &minnow_1, &VoteChoice::Reject);
    let receipt = h.manager.cast_vote(&id, &minnow_2, &VoteChoice::Reject);
    assert_eq!(receipt.status, StrategyStatus::Rejected);
    assert_eq!(receipt.tally.reject, 2);

    assert_eq!(h.token.balance(&whale), 9_000);
    assert_eq!(h.token.balance(&recipient), 0);
}

#[test]
fn test_non_contributor_is_not_eligible() {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    h.supplier(&id, UNIT);

    let outsider = Address::generate(&h.env);
    for choice in [VoteChoice::Approve, VoteChoice::Reject] {
        assert_eq!(
            h.manager.try_cast_vote(&id, &outsider, &choice),
            Err(Ok(Error::NotEligible))
        );
    }
    assert_eq!(h.manager.get_vote(&id, &outsider), None);
    assert_eq!(h.manager.get_strategy(&id).votes_cast, 0);
}

#[test]
fn test_supplier_of_another_profile_is_not_eligible() {
    let h = Harness::new();
    let (first, _) = h.register(UNIT);
    let (second, _) = h.register(UNIT);
    let supplier = h.supplier(&first, UNIT);
    h.supplier(&second, UNIT);

    assert_eq!(
        h.manager.try_cast_vote(&second, &supplier, &VoteChoice::Reject),
        Err(Ok(Error::NotEligible))
    );
}

#[test]
fn test_vote_on_unknown_profile() {
    let h = Harness::new();
    let voter = Address::generate(&h.env);
    assert_eq!(
        h.manager
            .try_cast_vote(&h.unknown_profile(), &voter, &VoteChoice::Approve),
        Err(Ok(Error::NotFound))
    );
}

#[test]
fn test_second_vote_rejected_by_default() {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    let supplier_1 = h.supplier(&id, UNIT / 4);
    h.supplier(&id, UNIT / 2);
    h.supplier(&id, UNIT / 4);

    h.manager.cast_vote(&id, &supplier_1, &VoteChoice::Approve);
    assert_eq!(
        h.manager.try_cast_vote(&id, &supplier_1, &VoteChoice::Reject),
        Err(Ok(Error::AlreadyVoted))
    );
    assert_eq!(
        h.manager.get_vote(&id, &supplier_1),
        Some(VoteChoice::Approve)
    );
    let record = h.manager.get_strategy(&id);
    assert_eq!(record.votes_cast, 1);
    assert_eq!(record.tally.approve, UNIT / 4);
    assert_eq!(record.tally.reject, 0);
}

#[test]
fn test_second_vote_overwrites_under_overwrite_policy() {
    let h = Harness::with_template(template(
        5_000,
        VoteWeighting::ByContribution,
        RevotePolicy::Overwrite,
    ));
    let (id, recipient) = h.register(10);
    let a = h.supplier(&id, 3);
    let b = h.supplier(&id, 3);
    let c = h.supplier(&id, 4);

    h.manager.cast_vote(&id, &a, &VoteChoice::Approve);
    let receipt = h.manager.cast_vote(&id, &a, &VoteChoice::Reject);
    assert_eq!(receipt.status, StrategyStatus::Open);
    assert_eq!(
        receipt.tally,
        Tally {
            approve: 0,
            reject: 3,
            total: 10,
        }
    );
    assert_eq!(h.manager.get_strategy(&id).votes_cast, 1);
    assert_eq!(h.manager.get_vote(&id, &a), Some(VoteChoice::Reject));

    let receipt = h.manager.cast_vote(&id, &b, &VoteChoice::Approve);
    assert_eq!(receipt.status, StrategyStatus::Open);

    let receipt = h.manager.cast_vote(&id, &c, &VoteChoice::Reject);
    assert_eq!(receipt.status, StrategyStatus::Rejected);
    assert_eq!(receipt.tally.reject, 7);
    assert_eq!(h.token.balance(&recipient), 0);
    assert_eq!(h.token.balance(&b), 3);
}

#[test]
fn test_tie_after_everyone_voted_rejects() {
    let h = Harness::new();
    let (id, recipient) = h.register(UNIT);
    let a = h.supplier(&id, UNIT / 2);
    let b = h.supplier(&id, UNIT / 2);

    assert_eq!(
        h.manager.cast_vote(&id, &a, &VoteChoice::Approve).status,
        StrategyStatus::Open
    );
    let receipt = h.manager.cast_vote(&id, &b, &VoteChoice::Reject);
    assert_eq!(receipt.status, StrategyStatus::Rejected);
    assert_eq!(h.token.balance(&a), UNIT / 2);
    assert_eq!(h.token.balance(&recipient), 0);
}

#[test]
fn test_high_threshold_resolves_once_everyone_voted() {
    let h = Harness::with_template(template(
        9_000,
        VoteWeighting::ByContribution,
        RevotePolicy::Reject,
    ));
    let (id, recipient) = h.register(UNIT);
    let a = h.supplier(&id, 600);
    let b = h.supplier(&id, 400);

    assert_eq!(
        h.manager.cast_vote(&id, &a, &VoteChoice::Approve).status,
        StrategyStatus::Open
    );
    let receipt = h.manager.cast_vote(&id, &b, &VoteChoice::Reject);
    assert_eq!(receipt.status, StrategyStatus::Approved);
    assert_eq!(h.token.balance(&recipient), 1_000);
}

#[test]
fn test_vote_after_resolution_is_closed() {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    let a = h.supplier(&id, UNIT / 2);
    let b = h.supplier(&id, UNIT / 2);
    let c = h.supplier(&id, 1);

    h.manager.cast_vote(&id, &a, &VoteChoice::Reject);
    h.manager.cast_vote(&id, &b, &VoteChoice::Reject);
    assert_eq!(h.manager.get_strategy(&id).status, StrategyStatus::Rejected);

    for voter in [a, c] {
        assert_eq!(
            h.manager.try_cast_vote(&id, &voter, &VoteChoice::Approve),
            Err(Ok(Error::Closed))
        );
    }
}

#[test]
fn test_strategies_do_not_share_vote_state() {
    let h = Harness::new();
    let (first, _) = h.register(UNIT);
    let (second, _) = h.register(UNIT);
    let supplier = h.funded_account(2 * UNIT);
    h.manager.supply_project(&first, &supplier, &UNIT);
    h.manager.supply_project(&second, &supplier, &(UNIT / 2));
    let other = h.supplier(&second, UNIT / 2);

    h.manager.cast_vote(&first, &supplier, &VoteChoice::Reject);

    assert_eq!(h.manager.get_strategy(&first).status, StrategyStatus::Rejected);
    let untouched = h.manager.get_strategy(&second);
    assert_eq!(untouched.status, StrategyStatus::Open);
    assert_eq!(untouched.votes_cast, 0);
    assert_eq!(
        untouched.tally,
        Tally {
            approve: 0,
            reject: 0,
            total: UNIT,
        }
    );
    assert_eq!(h.manager.get_vote(&second, &supplier), None);
    assert_eq!(h.manager.get_project_supply(&second), UNIT);
    assert_ne!(
        h.manager.get_project_strategy(&first),
        h.manager.get_project_strategy(&second)
    );

    // The second profile still resolves on its own votes.
    h.manager.cast_vote(&second, &supplier, &VoteChoice::Approve);
    let receipt = h.manager.cast_vote(&second, &other, &VoteChoice::Approve);
    assert_eq!(receipt.status, StrategyStatus::Approved);
}

fn replay(votes: &[(usize, VoteChoice)]) -> std::vec::Vec<VoteReceipt> {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    let suppliers = [
        h.supplier(&id, 2_000),
        h.supplier(&id, 3_000),
        h.supplier(&id, 1_500),
        h.supplier(&id, 3_500),
    ];
    votes
        .iter()
        .map(|(who, choice)| h.manager.cast_vote(&id, &suppliers[*who], choice))
        .collect()
}

#[test]
fn test_resolution_is_deterministic() {
    let votes = [
        (0, VoteChoice::Approve),
        (2, VoteChoice::Reject),
        (1, VoteChoice::Approve),
        (3, VoteChoice::Reject),
    ];
    let first = replay(&votes[..3]);
    let second = replay(&votes[..3]);
    assert_eq!(first, second);
    // 2000 + 3000 approve out of 10000 is exactly half: still open.
    assert_eq!(first[2].status, StrategyStatus::Open);

    let full = replay(&votes);
    assert_eq!(full, replay(&votes));
    assert_eq!(full[3].status, StrategyStatus::Rejected);
}

#[test]
fn test_top_up_by_voter_resolves_strategy() {
    let h = Harness::new();
    let (id, recipient) = h.register(UNIT);
    let a = h.supplier(&id, 40);
    h.supplier(&id, 60);

    let receipt = h.manager.cast_vote(&id, &a, &VoteChoice::Approve);
    assert_eq!(receipt.status, StrategyStatus::Open);

    // 70 of 130 now approves; the top-up itself resolves the strategy.
    h.mint(&a, 30);
    h.manager.supply_project(&id, &a, &30);

    let record = h.manager.get_strategy(&id);
    assert_eq!(record.status, StrategyStatus::Approved);
    assert_eq!(record.dispersal, DispersalState::Completed);
    assert_eq!(
        record.tally,
        Tally {
            approve: 70,
            reject: 0,
            total: 130,
        }
    );
    assert_eq!(h.token.balance(&recipient), 130);
    assert_eq!(h.manager.get_project_supply(&id), 0);
    assert_eq!(h.manager.get_profile(&id).status, ProfileStatus::Resolved);
    assert_eq!(
        h.manager.try_cast_vote(&id, &a, &VoteChoice::Approve),
        Err(Ok(Error::Closed))
    );
}

#[test]
fn test_top_up_refreshes_tally_without_resolving() {
    let h = Harness::new();
    let (id, _) = h.register(UNIT);
    let a = h.supplier(&id, 40);
    let b = h.supplier(&id, 60);
    h.manager.cast_vote(&id, &a, &VoteChoice::Approve);

    // A top-up from the silent supplier dilutes the cast side.
    h.mint(&b, 100);
    h.manager.supply_project(&id, &b, &100);

    let record = h.manager.get_strategy(&id);
    assert_eq!(record.status, StrategyStatus::Open);
    assert_eq!(
        record.tally,
        Tally {
            approve: 40,
            reject: 0,
            total: 200,
        }
    );
    assert_all_profile_invariants(&h.manager, &id);
}
