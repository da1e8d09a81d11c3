//! Event shapes published by the escrow manager contract and their indexed form.
//!
//! The topic symbols match `contracts/escrow_manager/src/events.rs`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Every event kind the manager publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `created`: a profile and its strategy were registered.
    Registered,
    /// `funded`: a supplier added value to a pool.
    Funded,
    /// `voted`: a supplier voted on a strategy.
    VoteCast,
    /// `resolved`: a strategy reached an outcome and its pool was dispersed.
    Resolved,
    /// `disp_fail`: an outcome was reached but value could not (fully) move.
    DispersalFailed,
    /// `tmpl_set`: the admin replaced the strategy template.
    TemplateUpdated,
    /// Anything else published under the manager's address.
    Unknown,
}

impl EventKind {
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "created" => Self::Registered,
            "funded" => Self::Funded,
            "voted" => Self::VoteCast,
            "resolved" => Self::Resolved,
            "disp_fail" => Self::DispersalFailed,
            "tmpl_set" => Self::TemplateUpdated,
            _ => Self::Unknown,
        }
    }

    /// Identifier stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "profile_registered",
            Self::Funded => "profile_funded",
            Self::VoteCast => "vote_cast",
            Self::Resolved => "profile_resolved",
            Self::DispersalFailed => "dispersal_failed",
            Self::TemplateUpdated => "template_updated",
            Self::Unknown => "unknown",
        }
    }

    /// Inverse of [`EventKind::as_str`].
    pub fn from_stored(s: &str) -> Self {
        match s {
            "profile_registered" => Self::Registered,
            "profile_funded" => Self::Funded,
            "vote_cast" => Self::VoteCast,
            "profile_resolved" => Self::Resolved,
            "dispersal_failed" => Self::DispersalFailed,
            "template_updated" => Self::TemplateUpdated,
            _ => Self::Unknown,
        }
    }
}

/// A decoded event ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEvent {
    pub event_type: String,
    /// Hex-encoded 32-byte profile ID (absent for `tmpl_set`).
    pub profile_id: Option<String>,
    /// Owner, supplier, voter or admin, depending on the kind.
    pub actor: Option<String>,
    /// Stringified `i128`; target, contribution, dispersed or outstanding amount.
    pub amount: Option<String>,
    /// Vote choice (`approve`/`reject`) or outcome (`approved`/`rejected`).
    pub detail: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    /// Deduplication key; the RPC event ID when present.
    pub event_key: String,
}

/// A row of the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub profile_id: Option<String>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub detail: Option<String>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

/// Aggregate view of one profile, folded from its indexed events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub profile_id: String,
    pub owner: Option<String>,
    pub target_amount: Option<String>,
    pub total_funded: String,
    pub suppliers: usize,
    /// Voters whose latest choice approves.
    pub approve_votes: usize,
    pub reject_votes: usize,
    /// `approved` or `rejected` once a strategy outcome has been observed.
    pub outcome: Option<String>,
    pub dispersed: bool,
    pub event_count: usize,
}

impl ProfileSummary {
    /// Fold a profile's events (ledger order) into a summary.
    ///
    /// Amounts are summed as `i128`; rows with an unparseable amount are skipped.
    pub fn from_events(profile_id: &str, events: &[EventRecord]) -> Self {
        let mut summary = ProfileSummary {
            profile_id: profile_id.to_string(),
            event_count: events.len(),
            ..Default::default()
        };
        let mut total: i128 = 0;
        let mut suppliers = HashSet::new();
        let mut latest_votes: HashMap<String, String> = HashMap::new();

        for ev in events {
            match EventKind::from_stored(&ev.event_type) {
                EventKind::Registered => {
                    summary.owner = ev.actor.clone();
                    summary.target_amount = ev.amount.clone();
                }
                EventKind::Funded => {
                    if let Some(amount) = ev.amount.as_deref().and_then(|a| a.parse::<i128>().ok())
                    {
                        total = total.saturating_add(amount);
                    }
                    if let Some(actor) = &ev.actor {
                        suppliers.insert(actor.clone());
                    }
                }
                EventKind::VoteCast => {
                    // An overwrite publishes another `voted` event; the latest wins.
                    if let (Some(voter), Some(choice)) = (&ev.actor, &ev.detail) {
                        latest_votes.insert(voter.clone(), choice.clone());
                    }
                }
                EventKind::Resolved => {
                    summary.outcome = ev.detail.clone();
                    summary.dispersed = true;
                }
                EventKind::DispersalFailed => {
                    summary.outcome = ev.detail.clone();
                }
                EventKind::TemplateUpdated | EventKind::Unknown => {}
            }
        }

        summary.total_funded = total.to_string();
        summary.suppliers = suppliers.len();
        for choice in latest_votes.values() {
            match choice.as_str() {
                "approve" => summary.approve_votes += 1,
                "reject" => summary.reject_votes += 1,
                _ => {}
            }
        }
        summary
    }
}
