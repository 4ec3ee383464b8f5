//! SQLite implementation of the partition store.
//!
//! Partitions live in the `partitions` table (creation order = `seq`);
//! entries cascade away when their partition is deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use super::store::{CacheStore, StoredResponse};
use crate::Error;
use crate::http::{Response, ResponseKind};

const ENTRY_COLUMNS: &str =
    "partition, request_key, method, request_url, response_url, status, kind, headers_json, body, stored_at";

/// Row as read from SQLite, before decoding.
struct EntryRow {
    partition: String,
    key: String,
    method: String,
    request_url: String,
    response_url: String,
    status: i64,
    kind: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            partition: row.get(0)?,
            key: row.get(1)?,
            method: row.get(2)?,
            request_url: row.get(3)?,
            response_url: row.get(4)?,
            status: row.get(5)?,
            kind: row.get(6)?,
            headers_json: row.get(7)?,
            body: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<(String, StoredResponse), Error> {
        let parse_url = |s: &str| Url::parse(s).map_err(|e| Error::CorruptEntry(format!("{s}: {e}")));
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let kind =
            ResponseKind::parse(&self.kind).ok_or_else(|| Error::CorruptEntry(format!("kind {}", self.kind)))?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(|e| Error::CorruptEntry(format!("stored_at: {e}")))?
            .with_timezone(&Utc);

        let response = Response {
            url: parse_url(&self.response_url)?,
            status,
            headers: serde_json::from_str(&self.headers_json)?,
            body: self.body.into(),
            kind,
        };

        let entry = StoredResponse {
            key: self.key,
            method: self.method,
            request_url: parse_url(&self.request_url)?,
            response,
            stored_at,
        };

        Ok((self.partition, entry))
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let name = name.to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND request_key = ?2");
                let result = conn.query_row(&sql, params![name, key], EntryRow::from_row);
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(|r| r.decode().map(|(_, entry)| entry)).transpose()
    }

    async fn lookup_any(&self, key: &str) -> Result<Option<(String, StoredResponse)>, Error> {
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT e.partition, e.request_key, e.method, e.request_url, e.response_url,
                            e.status, e.kind, e.headers_json, e.body, e.stored_at
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.request_key = ?1
                     ORDER BY p.seq ASC LIMIT 1",
                    params![key],
                    EntryRow::from_row,
                );
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::decode).transpose()
    }

    async fn put(&self, name: &str, entry: StoredResponse) -> Result<(), Error> {
        let name = name.to_string();
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                        partition, request_key, method, request_url, response_url,
                        status, kind, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(partition, request_key) DO UPDATE SET
                        method = excluded.method,
                        request_url = excluded.request_url,
                        response_url = excluded.response_url,
                        status = excluded.status,
                        kind = excluded.kind,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &name,
                        &entry.key,
                        &entry.method,
                        entry.request_url.as_str(),
                        entry.response.url.as_str(),
                        i64::from(entry.response.status),
                        entry.response.kind.as_str(),
                        &headers_json,
                        entry.response.body.as_ref(),
                        entry.stored_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND request_key = ?2",
                    params![name, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, name: &str) -> Result<Vec<StoredResponse>, Error> {
        let name = name.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 ORDER BY stored_at ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![name], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(|r| r.decode().map(|(_, entry)| entry)).collect()
    }
}
