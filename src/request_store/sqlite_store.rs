//! SQLite-backed song request store.
//!
//! Used when the engine runs next to its own request database instead of the
//! venue backend. Status updates are checked against the request lifecycle, and
//! an update that lost a race with another writer is reported as a conflict.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::schema::REQUEST_STORE_VERSIONED_SCHEMAS;
use super::{RequestStatus, RequestStore, SongRequest, StoreError};
use crate::sqlite_persistence::BASE_DB_VERSION;

pub struct SqliteRequestStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRequestStore {
    /// Open an existing request database or create a new one.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open(&db_path)?
        } else {
            let conn = Connection::open(&db_path)?;
            REQUEST_STORE_VERSIONED_SCHEMAS
                .last()
                .context("No schemas defined")?
                .create(&conn)?;
            info!("Created new song request database at {:?}", db_path.as_ref());
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Song request database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;
        if version >= REQUEST_STORE_VERSIONED_SCHEMAS.len() {
            bail!(
                "Song request database version {} is too new (max supported: {})",
                version,
                REQUEST_STORE_VERSIONED_SCHEMAS.len() - 1
            );
        }

        REQUEST_STORE_VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        REQUEST_STORE_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Song request database lock poisoned"))
    }

    /// Insert a new request.
    pub fn insert_request(&self, request: &SongRequest) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO song_requests
                (id, track_uri, title, artist, status, created_at, image_url, votes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request.id,
                request.track_uri,
                request.title,
                request.artist,
                request.status.as_str(),
                request.created_at.timestamp_millis(),
                request.image_url,
                request.votes,
            ],
        )
        .with_context(|| format!("Failed to insert song request {}", request.id))?;
        Ok(())
    }

    /// Fetch a single request by id.
    pub fn get_request(&self, id: &str) -> Result<Option<SongRequest>> {
        let conn = self.lock()?;
        let request = conn
            .query_row(
                "SELECT id, track_uri, title, artist, status, created_at, image_url, votes
                 FROM song_requests WHERE id = ?1",
                params![id],
                Self::row_to_request,
            )
            .optional()?;
        Ok(request)
    }

    /// Remove a request, as staff do from the dashboard.
    pub fn delete_request(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM song_requests WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<SongRequest> {
        let status: String = row.get(4)?;
        let created_at_ms: i64 = row.get(5)?;
        Ok(SongRequest {
            id: row.get(0)?,
            track_uri: row.get(1)?,
            title: row.get(2)?,
            artist: row.get(3)?,
            status: RequestStatus::from_db_str(&status).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown request status {}", status).into(),
                )
            })?,
            created_at: DateTime::<Utc>::from_timestamp_millis(created_at_ms).unwrap_or_default(),
            image_url: row.get(6)?,
            votes: row.get(7)?,
        })
    }

    fn list_blocking(&self, statuses: &[RequestStatus]) -> Result<Vec<SongRequest>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=statuses.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, track_uri, title, artist, status, created_at, image_url, votes
             FROM song_requests WHERE status IN ({})
             ORDER BY created_at ASC, id ASC",
            placeholders
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let requests = stmt
            .query_map(
                params_from_iter(statuses.iter().map(|s| s.as_str())),
                Self::row_to_request,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    fn update_blocking(&self, id: &str, new_status: RequestStatus) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM song_requests WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(anyhow::Error::from)?;

        let current = match current.as_deref().map(RequestStatus::from_db_str) {
            None => return Err(StoreError::NotFound(id.to_string())),
            Some(None) => {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    reason: "stored status is not recognised".to_string(),
                })
            }
            Some(Some(status)) => status,
        };

        if !current.can_transition_to(new_status) {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                reason: format!("cannot move from {} to {}", current, new_status),
            });
        }

        let updated = tx
            .execute(
                "UPDATE song_requests SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    new_status.as_str(),
                    Utc::now().timestamp_millis(),
                    id,
                    current.as_str()
                ],
            )
            .map_err(anyhow::Error::from)?;
        if updated == 0 {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                reason: "status changed concurrently".to_string(),
            });
        }

        tx.commit().map_err(anyhow::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn list_requests(&self, statuses: &[RequestStatus]) -> Result<Vec<SongRequest>, StoreError> {
        Ok(self.list_blocking(statuses)?)
    }

    async fn update_request_status(
        &self,
        id: &str,
        new_status: RequestStatus,
    ) -> Result<(), StoreError> {
        self.update_blocking(id, new_status)
    }
}
