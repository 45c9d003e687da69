//! SQLite-backed [`ManifestStore`].
//!
//! One connection behind a mutex; every call runs on the blocking pool.
//! JSON-valued columns (`tags`, `ui`, `actions`, `permissions`) are stored as
//! text and decoded on read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pluto_types::{Author, LocalizationMap, ManifestMeta};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{ManifestStore, NewManifest, StoreError, StoredManifest};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS manifests (
    id           TEXT PRIMARY KEY NOT NULL,
    version      TEXT NOT NULL,
    icon         TEXT NOT NULL,
    category     TEXT NOT NULL,
    tags         TEXT NOT NULL,
    author_name  TEXT NOT NULL,
    author_email TEXT NOT NULL,
    signature    TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS manifests_newest ON manifests(created_at DESC, id DESC);
CREATE TABLE IF NOT EXISTS manifest_content (
    manifest_id TEXT PRIMARY KEY NOT NULL REFERENCES manifests(id) ON DELETE CASCADE,
    ui          TEXT NOT NULL,
    script      TEXT NOT NULL,
    actions     TEXT,
    permissions TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS localizations (
    manifest_id TEXT NOT NULL REFERENCES manifests(id) ON DELETE CASCADE,
    locale      TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    -- Unicode lowercase of `value`; SQLite LIKE only folds ASCII
    value_folded TEXT NOT NULL,
    PRIMARY KEY (manifest_id, locale, key)
);
";

/// Manifest columns plus `title`/`description` resolved to `?1` or `en`.
const META_SELECT: &str = "
SELECT m.id, m.version, m.icon, m.category, m.tags, m.author_name, m.author_email,
       m.created_at,
       COALESCE(lt.value, et.value, ''),
       COALESCE(ld.value, ed.value, '')
FROM manifests m
LEFT JOIN localizations lt ON lt.manifest_id = m.id AND lt.locale = ?1 AND lt.key = 'title'
LEFT JOIN localizations et ON et.manifest_id = m.id AND et.locale = 'en' AND et.key = 'title'
LEFT JOIN localizations ld ON ld.manifest_id = m.id AND ld.locale = ?1 AND ld.key = 'description'
LEFT JOIN localizations ed ON ed.manifest_id = m.id AND ed.locale = 'en' AND ed.key = 'description'
";

pub struct SqliteManifestStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteManifestStore {
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

    /// Hold the connection, stalling every store call until released.
    #[cfg(test)]
    pub(crate) fn lock_for_test(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    #[cfg(test)]
    pub(crate) async fn execute_for_test(&self, sql: &'static str) {
        self.with_conn(move |conn| conn.execute_batch(sql).map_err(backend))
            .await
            .unwrap()
    }

    #[cfg(test)]
    pub(crate) async fn row_counts(&self) -> (i64, i64, i64) {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<i64, StoreError> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                    .map_err(backend)
            };
            Ok((
                count("manifests")?,
                count("manifest_content")?,
                count("localizations")?,
            ))
        })
        .await
        .unwrap()
    }
}

/// Marks a pending write as abandoned when the awaiting future is dropped.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Only UNIQUE and PRIMARY KEY violations are conflicts; foreign key and
/// trigger aborts are backend failures.
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

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(format!("JSON encode: {e}")))
}

fn from_json<T: DeserializeOwned>(raw: &str, column: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("id {raw}: {e}")))
}

/// LIKE pattern matching `query` anywhere, with wildcards escaped.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The transactional write. Checks `abandoned` as the last step before
/// `COMMIT`; an abandoned write is rolled back by dropping the transaction.
fn write_manifest(
    conn: &mut Connection,
    manifest: &NewManifest,
    abandoned: &AtomicBool,
) -> Result<(), StoreError> {
    let id = manifest.id.to_string();
    let tags = to_json(&manifest.tags)?;
    let ui = to_json(&manifest.ui)?;
    let actions = manifest.actions.as_ref().map(to_json).transpose()?;
    let permissions = to_json(&manifest.permissions)?;

    let tx = conn.transaction().map_err(backend)?;
    tx.execute(
        "INSERT INTO manifests
             (id, version, icon, category, tags, author_name, author_email, signature, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            manifest.version,
            manifest.icon,
            manifest.category,
            tags,
            manifest.author.name,
            manifest.author.email,
            manifest.signature,
            manifest.created_at,
        ],
    )
    .map_err(classify_write)?;

    tx.execute(
        "INSERT INTO manifest_content (manifest_id, ui, script, actions, permissions)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, ui, manifest.script_code, actions, permissions],
    )
    .map_err(classify_write)?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO localizations (manifest_id, locale, key, value, value_folded)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(backend)?;
        for (locale, entries) in &manifest.localization {
            for (key, value) in entries {
                stmt.execute(params![id, locale, key, value, value.to_lowercase()])
                    .map_err(classify_write)?;
            }
        }
    }

    if abandoned.load(Ordering::SeqCst) {
        return Err(StoreError::Abandoned);
    }
    tx.commit().map_err(backend)
}

type MetaRow = (String, String, String, String, String, String, String, i64, String, String);

fn read_meta_row(row: &Row<'_>) -> rusqlite::Result<MetaRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn decode_meta(row: MetaRow) -> Result<ManifestMeta, StoreError> {
    let (id, version, icon, category, tags, name, email, created_at, title, description) = row;
    Ok(ManifestMeta {
        id: parse_id(&id)?,
        version,
        icon,
        category,
        tags: from_json(&tags, "tags")?,
        author: Author { name, email },
        created_at,
        title,
        description,
    })
}

struct ContentRow {
    id: String,
    version: String,
    icon: String,
    category: String,
    tags: String,
    author_name: String,
    author_email: String,
    signature: String,
    created_at: i64,
    ui: String,
    script: String,
    actions: Option<String>,
    permissions: String,
}

fn read_content_row(row: &Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok(ContentRow {
        id: row.get(0)?,
        version: row.get(1)?,
        icon: row.get(2)?,
        category: row.get(3)?,
        tags: row.get(4)?,
        author_name: row.get(5)?,
        author_email: row.get(6)?,
        signature: row.get(7)?,
        created_at: row.get(8)?,
        ui: row.get(9)?,
        script: row.get(10)?,
        actions: row.get(11)?,
        permissions: row.get(12)?,
    })
}

fn read_manifest(
    conn: &Connection,
    id: Uuid,
    locale: &str,
) -> Result<Option<StoredManifest>, StoreError> {
    let key = id.to_string();
    let row = conn
        .query_row(
            "SELECT m.id, m.version, m.icon, m.category, m.tags, m.author_name, m.author_email,
                    m.signature, m.created_at, c.ui, c.script, c.actions, c.permissions
             FROM manifests m JOIN manifest_content c ON c.manifest_id = m.id
             WHERE m.id = ?1",
            params![key],
            read_content_row,
        )
        .optional()
        .map_err(backend)?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut localization = LocalizationMap::new();
    let mut stmt = conn
        .prepare(
            "SELECT locale, key, value FROM localizations
             WHERE manifest_id = ?1 AND locale IN (?2, 'en')",
        )
        .map_err(backend)?;
    let entries = stmt
        .query_map(params![key, locale], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })
        .map_err(backend)?;
    for entry in entries {
        let (loc, k, v) = entry.map_err(backend)?;
        localization.entry(loc).or_default().insert(k, v);
    }

    Ok(Some(StoredManifest {
        id: parse_id(&row.id)?,
        version: row.version,
        icon: row.icon,
        category: row.category,
        tags: from_json(&row.tags, "tags")?,
        author: Author {
            name: row.author_name,
            email: row.author_email,
        },
        signature: row.signature,
        created_at: row.created_at,
        ui: from_json(&row.ui, "ui")?,
        script_code: row.script,
        actions: row
            .actions
            .as_deref()
            .map(|raw| from_json(raw, "actions"))
            .transpose()?,
        permissions: from_json(&row.permissions, "permissions")?,
        localization,
    }))
}

fn query_meta(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<ManifestMeta>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(backend)?;
    let rows = stmt.query_map(args, read_meta_row).map_err(backend)?;
    let metas = rows
        .map(|row| decode_meta(row.map_err(backend)?))
        .collect::<Result<Vec<_>, _>>();
    metas
}

#[async_trait::async_trait]
impl ManifestStore for SqliteManifestStore {
    async fn insert(&self, manifest: NewManifest) -> Result<(), StoreError> {
        let abandoned = Arc::new(AtomicBool::new(false));
        let _guard = AbandonOnDrop(Arc::clone(&abandoned));
        self.with_conn(move |conn| write_manifest(conn, &manifest, &abandoned))
            .await
    }

    async fn get(&self, id: Uuid, locale: &str) -> Result<Option<StoredManifest>, StoreError> {
        let locale = locale.to_string();
        self.with_conn(move |conn| read_manifest(conn, id, &locale))
            .await
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
        locale: &str,
    ) -> Result<Vec<ManifestMeta>, StoreError> {
        let locale = locale.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "{META_SELECT} ORDER BY m.created_at DESC, m.id DESC LIMIT ?2 OFFSET ?3"
            );
            query_meta(conn, &sql, params![locale, limit, offset])
        })
        .await
    }

    async fn search(
        &self,
        query: &str,
        locale: &str,
        limit: i64,
    ) -> Result<Vec<ManifestMeta>, StoreError> {
        let locale = locale.to_string();
        let pattern = like_pattern(&query.to_lowercase());
        self.with_conn(move |conn| {
            let sql = format!(
                "{META_SELECT}
                 WHERE EXISTS (
                     SELECT 1 FROM localizations l
                     WHERE l.manifest_id = m.id
                       AND l.locale IN (?1, 'en')
                       AND l.key IN ('title', 'description')
                       AND l.value_folded LIKE ?2 ESCAPE '\\'
                 )
                 ORDER BY m.created_at DESC, m.id DESC LIMIT ?3"
            );
            query_meta(conn, &sql, params![locale, pattern, limit])
        })
        .await
    }
}
