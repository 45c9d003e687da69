//! SQLite-backed [`SessionStore`].
//!
//! One connection behind a mutex; every call runs on the blocking pool.
//! The partial unique index makes "one active session per fingerprint" a
//! storage invariant rather than a caller convention.

use std::sync::{Arc, Mutex};

use pluto_core::Fingerprint;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use super::{SessionRecord, SessionStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS app_sessions (
    id          TEXT PRIMARY KEY NOT NULL,
    fingerprint TEXT NOT NULL,
    jwt_id      TEXT NOT NULL UNIQUE,
    expires_at  INTEGER NOT NULL,
    revoked     INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS app_sessions_one_active
    ON app_sessions(fingerprint) WHERE revoked = 0;
";

pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open or create the database at `path` and ensure the schema.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("failed to open database: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(format!("failed to create tables: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    async fn with_conn<T, F>(&self, job: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))?;
            job(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }

    /// Revoke a session outside the login flow. `false` if it was not active.
    #[cfg(test)]
    pub(crate) async fn revoke(&self, session_id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE app_sessions SET revoked = 1 WHERE id = ?1 AND revoked = 0",
                    params![session_id.to_string()],
                )
                .map_err(backend)?;
            Ok(rows > 0)
        })
        .await
    }

    #[cfg(test)]
    pub(crate) async fn count_active(&self, fingerprint: &Fingerprint) -> i64 {
        let fp = fingerprint.as_str().to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM app_sessions WHERE fingerprint = ?1 AND revoked = 0",
                params![fp],
                |row| row.get(0),
            )
            .map_err(backend)
        })
        .await
        .unwrap()
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// UNIQUE and PRIMARY KEY violations become `Conflict`. Other constraint
/// failures (NOT NULL, CHECK, triggers) are not races and stay `Backend`.
fn classify_write(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                ) =>
        {
            StoreError::Conflict(e.to_string())
        }
        _ => StoreError::Backend(e.to_string()),
    }
}

fn insert(conn: &Connection, session: &SessionRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO app_sessions (id, fingerprint, jwt_id, expires_at, revoked, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.id.to_string(),
            session.fingerprint.as_str(),
            session.jti,
            session.expires_at,
            session.revoked,
            session.created_at,
        ],
    )
    .map_err(classify_write)?;
    Ok(())
}

fn read_session(row: &Row<'_>) -> rusqlite::Result<(String, String, String, i64, bool, i64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find_active(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let fp = fingerprint.as_str().to_string();
        let row = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT id, fingerprint, jwt_id, expires_at, revoked, created_at
                     FROM app_sessions WHERE fingerprint = ?1 AND revoked = 0",
                    params![fp],
                    read_session,
                )
                .optional()
                .map_err(backend)
            })
            .await?;

        row.map(|(id, fingerprint, jti, expires_at, revoked, created_at)| {
            let id = Uuid::parse_str(&id)
                .map_err(|e| StoreError::Backend(format!("corrupt session id {id}: {e}")))?;
            Ok(SessionRecord {
                id,
                fingerprint: Fingerprint::from_stored(fingerprint),
                jti,
                expires_at,
                revoked,
                created_at,
            })
        })
        .transpose()
    }

    async fn create(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let session = session.clone();
        self.with_conn(move |conn| insert(conn, &session)).await
    }

    async fn rotate(&self, stale: Uuid, next: &SessionRecord) -> Result<(), StoreError> {
        let next = next.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(backend)?;
            let revoked = tx
                .execute(
                    "UPDATE app_sessions SET revoked = 1 WHERE id = ?1 AND revoked = 0",
                    params![stale.to_string()],
                )
                .map_err(backend)?;
            if revoked == 0 {
                // dropping `tx` rolls back
                return Err(StoreError::Conflict(format!(
                    "session {stale} is no longer active"
                )));
            }
            insert(&tx, &next)?;
            tx.commit().map_err(backend)
        })
        .await
    }
}
