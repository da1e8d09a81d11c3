//! SQLite persistence: migrations, the resume cursor, event writes and reads.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::events::{EscrowEvent, EventRecord, ProfileSummary};

const EVENT_COLUMNS: &str = "id, event_type, profile_id, actor, amount, detail, ledger, \
                             timestamp, contract_id, tx_hash, created_at";

/// Open the pool and apply the embedded migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    // `mode=rwc` creates the file on first start.
    let url = if url.contains('?') || url.contains(":memory:") {
        url
    } else {
        format!("{url}?mode=rwc")
    };

    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");
    Ok(pool)
}

/// Saved resume point for the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub last_ledger: i64,
    pub last_cursor: Option<String>,
}

pub async fn load_cursor(pool: &SqlitePool) -> Result<Cursor> {
    let row: Option<(i64, Option<String>)> =
        sqlx::query_as("SELECT last_ledger, last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row
        .map(|(last_ledger, last_cursor)| Cursor {
            last_ledger,
            last_cursor,
        })
        .unwrap_or_default())
}

pub async fn save_cursor(pool: &SqlitePool, cursor: &Cursor) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO indexer_cursor (id, last_ledger, last_cursor) VALUES (1, ?1, ?2)
        ON CONFLICT(id) DO UPDATE SET last_ledger = excluded.last_ledger,
                                      last_cursor = excluded.last_cursor
        "#,
    )
    .bind(cursor.last_ledger)
    .bind(&cursor.last_cursor)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a batch in one transaction. Rows whose `event_key` is already
/// stored are skipped; returns how many were new.
pub async fn insert_events(pool: &SqlitePool, events: &[EscrowEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;
    for ev in events {
        inserted += sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_type, profile_id, actor, amount, detail, ledger, timestamp,
                 contract_id, tx_hash, event_key)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ev.event_type)
        .bind(&ev.profile_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.detail)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .bind(&ev.event_key)
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Events of one profile in ledger order.
pub async fn get_events_for_profile(
    pool: &SqlitePool,
    profile_id: &str,
) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE profile_id = ?1 ORDER BY ledger ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(profile_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// All events, optionally narrowed to one `event_type`.
pub async fn get_all_events(
    pool: &SqlitePool,
    event_type: Option<&str>,
) -> Result<Vec<EventRecord>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events \
         WHERE (?1 IS NULL OR event_type = ?1) ORDER BY ledger ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(event_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Summary of a profile, or `None` if nothing has been indexed for it.
pub async fn profile_summary(
    pool: &SqlitePool,
    profile_id: &str,
) -> Result<Option<ProfileSummary>> {
    let events = get_events_for_profile(pool, profile_id).await?;
    if events.is_empty() {
        return Ok(None);
    }
    Ok(Some(ProfileSummary::from_events(profile_id, &events)))
}
