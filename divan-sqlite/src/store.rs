use std::{fmt, time::Duration};

use async_trait::async_trait;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter,
};
use serde_json::Value;
use tracing::info;

use divan_core::{
    backend::{SchemaOp, StoreBackend, StoreBackendBuilder},
    descriptor::{CollectionDescriptor, validate_identifier},
    document::{StoredDocument, WriteResult},
    error::{DivanError, DivanResult},
    query::{Expr, QueryVisitor},
};

use crate::{pool::ConnectionPool, query::SqlQueryTranslator};

/// Engine-side expression producing a fresh unique token for `id`/`rev` values.
const TOKEN_SQL: &str = "lower(hex(randomblob(16)))";

/// Table names SQLite keeps for itself.
const RESERVED_PREFIX: &str = "sqlite_";

/// Reader connections opened for a file database unless configured otherwise.
pub const DEFAULT_READERS: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed relational store.
///
/// Every collection is a table `name(id, rev, <docField>)` whose document column holds JSON text.
/// Ids and revisions are generated inside the engine.
///
/// Statements run on tokio's blocking thread pool. Writes go through a single writer
/// connection; file databases are switched to WAL mode and read through a pool of separate
/// connections, so reads never wait for each other or for a writer. In-memory databases have
/// only the writer.
///
/// Collection names starting with `sqlite_` are reserved by the engine and rejected with
/// [`DivanError::InvalidName`].
pub struct SqliteStore {
    pool: ConnectionPool,
    location: String,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Wraps a single connection used for both reads and writes.
    pub fn new(conn: Connection, location: impl Into<String>) -> Self {
        Self { pool: ConnectionPool::new(conn, vec![]), location: location.into() }
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DivanResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DivanError::Initialization(e.to_string()))?;

        Ok(Self::new(conn, ":memory:"))
    }

    /// Creates a builder for the database at `url`.
    ///
    /// Accepts a file path, a `sqlite://` or `sqlite:` URL, or `:memory:`.
    pub fn builder(url: &str) -> SqliteStoreBuilder {
        SqliteStoreBuilder::new(url)
    }

    /// Where this store's database lives.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Number of idle reader connections.
    pub fn reader_count(&self) -> usize {
        self.pool.reader_count()
    }
}

/// Validates and double-quotes an identifier so it can be spliced into a statement.
fn quoted(identifier: &str) -> DivanResult<String> {
    validate_identifier(identifier)?;

    Ok(format!("\"{identifier}\""))
}

/// Quotes a collection name for use as a table name.
fn table_name(name: &str) -> DivanResult<String> {
    if name.starts_with(RESERVED_PREFIX) {
        return Err(DivanError::InvalidName(name.to_string()));
    }

    quoted(name)
}

fn map_error(err: rusqlite::Error, relation: &str) -> DivanError {
    match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.starts_with("no such table") => {
            DivanError::CollectionNotFound(relation.to_string())
        }
        _ => DivanError::StorageUnavailable(err.to_string()),
    }
}

fn read_document(row: &Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn to_document((id, rev, doc): (String, String, String)) -> DivanResult<StoredDocument> {
    StoredDocument::from_row(id, rev, serde_json::from_str(&doc)?)
}

fn table_exists(conn: &Connection, name: &str) -> DivanResult<bool> {
    if name.starts_with(RESERVED_PREFIX) {
        return Ok(false);
    }

    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()
        .map_err(|e| map_error(e, name))?
        .is_some())
}

fn create_table(conn: &Connection, relation: &CollectionDescriptor) -> DivanResult<()> {
    let table = table_name(relation.name())?;
    let column = quoted(relation.doc_field())?;
    let pk = quoted(&format!("pk_{}", relation.name()))?;

    if table_exists(conn, relation.name())? {
        return Err(DivanError::CollectionExists(relation.name().to_string()));
    }

    conn.execute_batch(&format!(
        "CREATE TABLE {table}
(
  id TEXT NOT NULL DEFAULT ({TOKEN_SQL}),
  rev TEXT NOT NULL DEFAULT ({TOKEN_SQL}),
  {column} TEXT NOT NULL DEFAULT '{{}}' CHECK (json_valid({column})),
  CONSTRAINT {pk} PRIMARY KEY (id)
);"
    ))
    .map_err(|e| map_error(e, relation.name()))
}

fn drop_table(conn: &Connection, relation: &CollectionDescriptor) -> DivanResult<()> {
    let table = table_name(relation.name())?;

    if !table_exists(conn, relation.name())? {
        return Err(DivanError::CollectionNotFound(relation.name().to_string()));
    }

    conn.execute_batch(&format!("DROP TABLE {table};"))
        .map_err(|e| map_error(e, relation.name()))
}

fn insert(conn: &Connection, relation: &CollectionDescriptor, id: Option<String>, doc: &Value) -> DivanResult<WriteResult> {
    let table = table_name(relation.name())?;
    let column = quoted(relation.doc_field())?;
    let doc = serde_json::to_string(doc)?;

    let result = match &id {
        Some(id) => conn.query_row(
            &format!("INSERT INTO {table} (id, {column}) VALUES (?1, ?2) RETURNING id, rev"),
            params![id, doc],
            |row| Ok(WriteResult { id: row.get(0)?, rev: row.get(1)? }),
        ),
        None => conn.query_row(
            &format!("INSERT INTO {table} ({column}) VALUES (?1) RETURNING id, rev"),
            params![doc],
            |row| Ok(WriteResult { id: row.get(0)?, rev: row.get(1)? }),
        ),
    };

    result.map_err(|e| match &e {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation => {
            DivanError::ConflictingId(id.clone().unwrap_or_default(), relation.name().to_string())
        }
        _ => map_error(e, relation.name()),
    })
}

fn delete_by_id(conn: &Connection, relation: &CollectionDescriptor, id: &str) -> DivanResult<()> {
    let table = table_name(relation.name())?;

    let deleted = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .map_err(|e| map_error(e, relation.name()))?;

    if deleted == 0 {
        return Err(DivanError::DocumentNotFound(id.to_string(), relation.name().to_string()));
    }

    Ok(())
}

fn apply(conn: &Connection, op: &SchemaOp) -> DivanResult<()> {
    match op {
        SchemaOp::CreateRelation(relation) => create_table(conn, relation),
        SchemaOp::DropRelation(relation) => drop_table(conn, relation),
        SchemaOp::InsertRow { relation, id, doc } => insert(conn, relation, Some(id.clone()), doc).map(|_| ()),
        SchemaOp::DeleteRow { relation, id } => delete_by_id(conn, relation, id),
    }
}

#[async_trait]
impl StoreBackend for SqliteStore {
    async fn insert_row(&self, relation: &CollectionDescriptor, id: Option<String>, doc: Value) -> DivanResult<WriteResult> {
        let relation = relation.clone();

        self.pool
            .write(move |conn| insert(conn, &relation, id, &doc))
            .await
    }

    async fn fetch_row(&self, relation: &CollectionDescriptor, id: &str) -> DivanResult<Option<StoredDocument>> {
        let sql = format!(
            "SELECT id, rev, {} FROM {} WHERE id = ?1",
            quoted(relation.doc_field())?,
            table_name(relation.name())?,
        );
        let name = relation.name().to_string();
        let id = id.to_string();

        self.pool
            .read(move |conn| {
                conn.query_row(&sql, params![id], read_document)
                    .optional()
                    .map_err(|e| map_error(e, &name))?
                    .map(to_document)
                    .transpose()
            })
            .await
    }

    async fn fetch_rev(&self, relation: &CollectionDescriptor, id: &str) -> DivanResult<Option<String>> {
        let sql = format!("SELECT rev FROM {} WHERE id = ?1", table_name(relation.name())?);
        let name = relation.name().to_string();
        let id = id.to_string();

        self.pool
            .read(move |conn| {
                conn.query_row(&sql, params![id], |row| row.get(0))
                    .optional()
                    .map_err(|e| map_error(e, &name))
            })
            .await
    }

    async fn update_row(&self, relation: &CollectionDescriptor, id: &str, rev: &str, doc: Value) -> DivanResult<Option<WriteResult>> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, rev = {TOKEN_SQL} WHERE id = ?2 AND rev = ?3 RETURNING id, rev",
            table_name(relation.name())?,
            quoted(relation.doc_field())?,
        );
        let doc = serde_json::to_string(&doc)?;
        let name = relation.name().to_string();
        let (id, rev) = (id.to_string(), rev.to_string());

        self.pool
            .write(move |conn| {
                conn.query_row(&sql, params![doc, id, rev], |row| {
                    Ok(WriteResult { id: row.get(0)?, rev: row.get(1)? })
                })
                .optional()
                .map_err(|e| map_error(e, &name))
            })
            .await
    }

    async fn delete_row(&self, relation: &CollectionDescriptor, id: &str, rev: &str) -> DivanResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1 AND rev = ?2", table_name(relation.name())?);
        let name = relation.name().to_string();
        let (id, rev) = (id.to_string(), rev.to_string());

        self.pool
            .write(move |conn| {
                let deleted = conn
                    .execute(&sql, params![id, rev])
                    .map_err(|e| map_error(e, &name))?;

                Ok(deleted > 0)
            })
            .await
    }

    async fn query_rows(&self, relation: &CollectionDescriptor, filter: &Expr) -> DivanResult<Vec<StoredDocument>> {
        let table = table_name(relation.name())?;
        let column = quoted(relation.doc_field())?;
        let filter = SqlQueryTranslator::new(&column).visit_expr(filter)?;
        let sql = format!("SELECT id, rev, {column} FROM {table} WHERE {}", filter.clause);
        let name = relation.name().to_string();

        self.pool
            .read(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(|e| map_error(e, &name))?;

                let rows = stmt
                    .query_map(params_from_iter(filter.params), read_document)
                    .map_err(|e| map_error(e, &name))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| map_error(e, &name))?;

                rows.into_iter().map(to_document).collect()
            })
            .await
    }

    async fn relation_exists(&self, name: &str) -> DivanResult<bool> {
        let name = name.to_string();

        self.pool
            .read(move |conn| table_exists(conn, &name))
            .await
    }

    async fn apply_schema(&self, ops: Vec<SchemaOp>) -> DivanResult<()> {
        self.pool
            .write(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| DivanError::StorageUnavailable(e.to_string()))?;

                // Dropping `tx` on an early return rolls every step back.
                for op in &ops {
                    apply(&tx, op)?;
                }

                tx.commit()
                    .map_err(|e| DivanError::StorageUnavailable(e.to_string()))
            })
            .await
    }
}

pub struct SqliteStoreBuilder {
    location: String,
    readers: usize,
}

impl SqliteStoreBuilder {
    pub fn new(url: &str) -> Self {
        let location = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        Self { location: location.to_string(), readers: DEFAULT_READERS }
    }

    /// Sets how many reader connections a file database gets. Zero reads through the writer.
    pub fn with_readers(mut self, readers: usize) -> Self {
        self.readers = readers;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn open_connection(&self) -> DivanResult<Connection> {
        let conn = Connection::open(&self.location)
            .map_err(|e| DivanError::Initialization(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| DivanError::Initialization(e.to_string()))?;

        Ok(conn)
    }
}

#[async_trait]
impl StoreBackendBuilder for SqliteStoreBuilder {
    type Backend = SqliteStore;

    async fn build(self) -> DivanResult<Self::Backend> {
        if self.location.is_empty() {
            return Err(DivanError::Initialization("database location is empty".into()));
        }

        if self.location == ":memory:" {
            let store = SqliteStore::open_in_memory()?;
            info!(target: "divan::sqlite", location = %store.location(), "Opened database");
            return Ok(store);
        }

        let store = tokio::task::spawn_blocking(move || {
            let writer = self.open_connection()?;
            writer
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
                .map_err(|e| DivanError::Initialization(e.to_string()))?;

            let readers = (0..self.readers)
                .map(|_| self.open_connection())
                .collect::<DivanResult<Vec<_>>>()?;

            Ok::<_, DivanError>(SqliteStore {
                pool: ConnectionPool::new(writer, readers),
                location: self.location,
            })
        })
        .await
        .map_err(|e| DivanError::Initialization(e.to_string()))??;

        info!(
            target: "divan::sqlite",
            location = %store.location(),
            readers = store.reader_count(),
            "Opened database"
        );

        Ok(store)
    }
}
