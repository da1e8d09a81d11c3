//! Background poller: pulls manager events from the RPC and stores them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::db::{self, Cursor};
use crate::errors::Result;
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Poll until `shutdown` fires. Poll errors are logged and the loop carries on.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!(contract = %state.config.contract_id, "indexer starting");

    let mut cursor = match db::load_cursor(&state.pool).await {
        Ok(saved) => saved,
        Err(e) => {
            error!("could not load cursor, starting fresh: {e}");
            Cursor::default()
        }
    };
    if cursor.last_ledger == 0 {
        cursor.last_ledger = i64::from(state.config.start_ledger);
    }
    info!(ledger = cursor.last_ledger, "resuming");

    loop {
        match poll_once(&state, &cursor).await {
            Ok(next) => cursor = next,
            Err(e) => error!("indexer poll failed: {e}"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("indexer stopping");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }
}

/// One fetch-decode-store round. Returns the cursor to resume from.
async fn poll_once(state: &IndexerState, cursor: &Cursor) -> Result<Cursor> {
    let config = &state.config;
    let start_ledger = u32::try_from(cursor.last_ledger).unwrap_or(config.start_ledger);
    let page = rpc::fetch_events(
        &state.client,
        &config.rpc_url,
        &config.contract_id,
        start_ledger,
        cursor.last_cursor.as_deref(),
        config.events_per_page,
    )
    .await?;

    if !page.events.is_empty() {
        let decoded = rpc::decode_events(&page.events, &config.contract_id);
        let stored = db::insert_events(&state.pool, &decoded).await?;
        info!(fetched = page.events.len(), stored, "indexed event page");
    }

    let next = advance(cursor, page.cursor, page.latest_ledger);
    db::save_cursor(&state.pool, &next).await?;
    Ok(next)
}

/// Keep the RPC paging cursor when one is returned; the ledger only ever
/// moves forward.
fn advance(current: &Cursor, page_cursor: Option<String>, latest_ledger: Option<u64>) -> Cursor {
    let latest = latest_ledger
        .and_then(|l| i64::try_from(l).ok())
        .unwrap_or(current.last_ledger);
    Cursor {
        last_ledger: latest.max(current.last_ledger),
        last_cursor: page_cursor.or_else(|| current.last_cursor.clone()),
    }
}
