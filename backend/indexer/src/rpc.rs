//! Soroban RPC access: pages through `getEvents` for the manager contract and
//! turns the raw JSON rows into [`EscrowEvent`]s.
//!
//! Transport failures, HTTP 429 and soft JSON-RPC errors are retried with
//! exponential back-off capped at [`MAX_BACKOFF_SECS`]. Malformed requests
//! (`-32600`, `-32601`) are surfaced immediately.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EscrowEvent, EventKind};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn is_fatal(&self) -> bool {
        matches!(self.code, -32600 | -32601)
    }
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub topic: Vec<String>,
    pub value: Value,
    pub contract_id: Option<String>,
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    pub ledger_closed_at: Option<String>,
}

/// One page of `getEvents`.
#[derive(Debug, Default)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    pub latest_ledger: Option<u64>,
}

/// Exponential retry delay.
struct Backoff {
    secs: u64,
}

impl Backoff {
    fn new() -> Self {
        Self {
            secs: INITIAL_BACKOFF_SECS,
        }
    }

    async fn wait(&mut self) {
        tokio::time::sleep(Duration::from_secs(self.secs)).await;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
    }
}

/// Fetch one page of contract events, starting at `start_ledger` or resuming
/// from `cursor` when one is known.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<EventPage> {
    let mut backoff = Backoff::new();
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getEvents",
        "params": build_params(contract_id, start_ledger, cursor, limit),
    });

    loop {
        let resp = match client.post(rpc_url).json(&request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(delay = backoff.secs, "getEvents transport error: {e}");
                backoff.wait().await;
                continue;
            }
        };

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(delay = backoff.secs, "getEvents rate-limited");
            backoff.wait().await;
            continue;
        }

        let body: RpcResponse = resp.json().await?;
        if let Some(err) = body.error {
            if err.is_fatal() {
                return Err(IndexerError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            warn!(
                delay = backoff.secs,
                code = err.code,
                "getEvents soft error: {}",
                err.message
            );
            backoff.wait().await;
            continue;
        }

        let result = body.result.ok_or_else(|| {
            IndexerError::EventParse("getEvents returned no result".to_string())
        })?;
        debug!(
            count = result.events.len(),
            latest_ledger = ?result.latest_ledger,
            "fetched event page"
        );
        return Ok(EventPage {
            events: result.events,
            cursor: result.cursor,
            latest_ledger: result.latest_ledger,
        });
    }
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut pagination = json!({ "limit": limit });
    let mut params = json!({
        "filters": [{ "type": "contract", "contractIds": [contract_id] }],
    });
    match cursor {
        Some(cur) => pagination["cursor"] = json!(cur),
        None => params["startLedger"] = json!(start_ledger),
    }
    params["pagination"] = pagination;
    params
}

/// Decode a page of raw events. Rows without a topic are dropped.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<EscrowEvent> {
    raw.iter()
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<EscrowEvent> {
    let kind = EventKind::from_topic(&topic_symbol(raw.topic.first()?));
    let profile_id = match kind {
        EventKind::TemplateUpdated => None,
        _ => raw.topic.get(1).and_then(|t| topic_bytes_hex(t)),
    };
    let fields = decode_fields(&raw.value, kind);
    let ledger = raw.ledger.unwrap_or(0) as i64;
    let event_key = raw.id.clone().unwrap_or_else(|| {
        format!(
            "{ledger}:{}:{}:{}:{}",
            raw.tx_hash.as_deref().unwrap_or("-"),
            kind.as_str(),
            profile_id.as_deref().unwrap_or("-"),
            fields.actor.as_deref().unwrap_or("-"),
        )
    });

    Some(EscrowEvent {
        event_type: kind.as_str().to_string(),
        profile_id,
        actor: fields.actor,
        amount: fields.amount,
        detail: fields.detail,
        ledger,
        timestamp: raw
            .ledger_closed_at
            .as_deref()
            .and_then(parse_iso_to_unix)
            .unwrap_or(0),
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
        event_key,
    })
}

#[derive(Debug, Default, PartialEq)]
struct Fields {
    actor: Option<String>,
    amount: Option<String>,
    detail: Option<String>,
}

fn decode_fields(value: &Value, kind: EventKind) -> Fields {
    match kind {
        EventKind::Registered => Fields {
            actor: scalar(value, "owner"),
            amount: scalar(value, "target_amount"),
            detail: scalar(value, "strategy_id"),
        },
        EventKind::Funded => Fields {
            actor: scalar(value, "supplier"),
            amount: scalar(value, "amount"),
            detail: None,
        },
        EventKind::VoteCast => Fields {
            actor: scalar(value, "voter"),
            amount: None,
            detail: value.get("choice").and_then(vote_choice),
        },
        EventKind::Resolved => Fields {
            actor: None,
            amount: scalar(value, "amount"),
            detail: value.get("outcome").and_then(outcome),
        },
        EventKind::DispersalFailed => Fields {
            actor: None,
            amount: scalar(value, "outstanding"),
            detail: value.get("outcome").and_then(outcome),
        },
        EventKind::TemplateUpdated => Fields {
            actor: scalar(value, "admin"),
            amount: None,
            detail: value
                .get("template")
                .and_then(|t| scalar(t, "threshold_bps"))
                .map(|bps| format!("threshold_bps={bps}")),
        },
        EventKind::Unknown => Fields::default(),
    }
}

/// A field rendered as a string, whether the RPC gave it as a string, a
/// number, or a `{"type":…,"value":…}` wrapper.
fn scalar(value: &Value, key: &str) -> Option<String> {
    as_text(value.get(key)?)
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("value").and_then(as_text),
        _ => None,
    }
}

/// Unit enum variants arrive as `"Name"`, `["Name"]` or a wrapper of either.
fn variant_name(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => items.first().and_then(variant_name),
        Value::Object(map) => map.get("value").and_then(variant_name),
        other => as_text(other),
    }
}

/// `VoteChoice` is an integer enum on chain: 1 approves, 2 rejects.
fn vote_choice(v: &Value) -> Option<String> {
    let raw = variant_name(v)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "approve" => Some("approve".to_string()),
        "2" | "reject" => Some("reject".to_string()),
        _ => None,
    }
}

fn outcome(v: &Value) -> Option<String> {
    let raw = variant_name(v)?;
    match raw.to_ascii_lowercase().as_str() {
        "approved" => Some("approved".to_string()),
        "rejected" => Some("rejected".to_string()),
        _ => None,
    }
}

/// Leading topic symbol; the RPC may wrap it as `{"type":"symbol","value":…}`.
fn topic_symbol(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get("value").and_then(|x| x.as_str()).map(String::from))
        .unwrap_or_else(|| raw.to_string())
}

/// Profile IDs are `BytesN<32>` topics, normalised to lowercase hex whether
/// the RPC rendered them as hex or base64.
fn topic_bytes_hex(raw: &str) -> Option<String> {
    let text = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| as_text(&v))
        .unwrap_or_else(|| raw.to_string());

    if text.len() == 64 {
        if let Ok(bytes) = hex::decode(&text) {
            return Some(hex::encode(bytes));
        }
    }
    match STANDARD.decode(text.as_bytes()) {
        Ok(bytes) if bytes.len() == 32 => Some(hex::encode(bytes)),
        _ => None,
    }
}

fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}
