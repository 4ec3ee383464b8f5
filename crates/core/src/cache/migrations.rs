//! Schema of the durable partition store.
//!
//! `_schema` records every step applied to the file. A store written by a
//! newer build carries steps this build does not know and is refused rather
//! than read with the wrong layout.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

struct Step {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version; a step is never edited once released.
const STEPS: &[Step] =
    &[Step { version: 1, name: "partitions", sql: include_str!("../../migrations/001_partitions.sql") }];

/// Bring the partition and entry tables up to the latest layout.
///
/// Each pending step runs in its own transaction together with its `_schema` row.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _schema (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current = current_version(conn)?;
        let latest = STEPS.last().map_or(0, |step| step.version);
        if current > latest {
            return Err(Error::MigrationFailed(format!(
                "store is at schema version {current}, this build knows up to {latest}"
            )));
        }

        for step in STEPS.iter().filter(|step| step.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} (v{}): {e}", step.name, step.version)))?;
            tx.execute(
                "INSERT INTO _schema (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![step.version, step.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = step.version, step = step.name, "partition store schema updated");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn current_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _schema", [], |row| row.get(0))?)
}
