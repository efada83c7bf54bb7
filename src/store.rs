//! Quad store facade
//!
//! [`QuadStore`] owns one SQLite connection and the resource cache. Every
//! write runs in its own `BEGIN IMMEDIATE` transaction, so several stores
//! (in this process or others) can share one database file; the unique
//! indexes decide which writer's row survives.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::rdf::{parse_quads, NamedNode, Quad, QuadPattern, RdfFormat};
use crate::storage::{
    schema, views, EncodedPattern, N3Row, QuadId, QuadTable, ResourceCache, StatementRow,
    TermDictionary,
};
use rusqlite::{Connection, ErrorCode, OpenFlags, TransactionBehavior};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

struct Inner {
    conn: Connection,
    cache: ResourceCache,
}

/// Row counts of the persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub quads: u64,
    pub contexts: u64,
    pub resources: u64,
    pub literals: u64,
    pub bnodes: u64,
}

/// Dictionary-encoded RDF quad store
pub struct QuadStore {
    inner: Mutex<Inner>,
    config: StoreConfig,
}

impl QuadStore {
    /// Open (or create) a store
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let conn = connect(&config)?;
        schema::apply_pragmas(&conn, &config)?;

        if config.create_schema {
            schema::create_schema(&conn)?;
        } else if !schema::schema_exists(&conn)? {
            return Err(StoreError::Config(format!(
                "no quad store at {}; open with new='yes' to create one",
                describe(&config)
            )));
        }

        if config.update_index_stats {
            schema::update_index_statistics(&conn)?;
        }

        info!("Opened quad store at {}", describe(&config));

        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                cache: ResourceCache::new(config.resource_cache_capacity),
            }),
            config,
        })
    }

    /// Private in-memory store
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    /// File-backed store with default settings
    pub fn open_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(StoreConfig::with_path(path.as_ref()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` in an immediate transaction. On any failure the transaction is
    /// rolled back and the resource cache dropped, since it may hold keys
    /// allocated by the aborted transaction.
    fn write<T>(
        &self,
        f: impl FnOnce(&Connection, &mut ResourceCache) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.lock();
        let Inner { conn, cache } = &mut *guard;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx, &mut *cache) {
            Ok(value) => match tx.commit() {
                Ok(()) => Ok(value),
                Err(e) => {
                    warn!("Commit failed: {}", e);
                    cache.clear();
                    Err(e.into())
                }
            },
            Err(e) => {
                warn!("Rolling back: {}", e);
                cache.clear();
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&Connection, &mut ResourceCache) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.lock();
        let Inner { conn, cache } = &mut *guard;
        f(conn, cache)
    }

    /// Store a quad. Returns its key and whether this call inserted it.
    pub fn add(&self, quad: &Quad) -> StoreResult<(QuadId, bool)> {
        self.write(|conn, cache| add_one(conn, cache, quad))
    }

    /// Store many quads in one transaction; nothing is kept if one fails.
    ///
    /// Returns the number of quads that were not already present.
    pub fn add_all<'q>(&self, quads: impl IntoIterator<Item = &'q Quad>) -> StoreResult<usize> {
        self.write(|conn, cache| {
            let mut inserted = 0;
            for quad in quads {
                if add_one(conn, cache, quad)?.1 {
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }

    /// Key of a stored quad
    pub fn lookup(&self, quad: &Quad) -> StoreResult<Option<QuadId>> {
        self.read(|conn, cache| {
            match TermDictionary::new(conn, cache).encode_quad(quad)? {
                Some(encoded) => QuadTable::new(conn).exists(&encoded),
                None => Ok(None),
            }
        })
    }

    pub fn contains(&self, quad: &Quad) -> StoreResult<bool> {
        Ok(self.lookup(quad)?.is_some())
    }

    /// The quad stored under a key
    pub fn get(&self, id: QuadId) -> StoreResult<Option<Quad>> {
        self.read(|conn, cache| match QuadTable::new(conn).get(id)? {
            Some(encoded) => TermDictionary::new(conn, cache).decode_quad(&encoded).map(Some),
            None => Ok(None),
        })
    }

    /// Delete a quad; false when it was not stored.
    ///
    /// Dictionary entries stay: interning is append-only.
    pub fn remove(&self, quad: &Quad) -> StoreResult<bool> {
        self.write(|conn, cache| {
            let Some(encoded) = TermDictionary::new(conn, cache).encode_quad(quad)? else {
                return Ok(false);
            };
            let table = QuadTable::new(conn);
            match table.exists(&encoded)? {
                Some(id) => table.delete(id),
                None => Ok(false),
            }
        })
    }

    /// Delete every quad of a context (`None` = default graph)
    pub fn remove_context(&self, context: Option<&NamedNode>) -> StoreResult<usize> {
        self.write(|conn, cache| {
            let key = match context {
                Some(graph) => match TermDictionary::new(conn, cache).resource_id(graph.as_str())? {
                    Some(id) => Some(id),
                    None => return Ok(0),
                },
                None => None,
            };
            QuadTable::new(conn).delete_context(key)
        })
    }

    /// Quads matching a single-quad pattern, in insertion order
    pub fn find(&self, pattern: &QuadPattern) -> StoreResult<Vec<Quad>> {
        self.find_rows(pattern)?
            .iter()
            .map(StatementRow::to_quad)
            .collect()
    }

    /// Raw rows matching a single-quad pattern
    pub fn find_rows(&self, pattern: &QuadPattern) -> StoreResult<Vec<StatementRow>> {
        self.read(|conn, cache| {
            let mut dict = TermDictionary::new(conn, cache);
            match EncodedPattern::resolve(&mut dict, pattern)? {
                Some(encoded) => crate::storage::find_rows(conn, &encoded),
                None => {
                    debug!("Pattern names an unknown term; no matches");
                    Ok(Vec::new())
                }
            }
        })
    }

    /// Named graphs holding at least one quad
    pub fn contexts(&self) -> StoreResult<Vec<NamedNode>> {
        self.read(|conn, _| {
            views::context_uris(conn)?
                .iter()
                .map(|uri| NamedNode::new(uri).map_err(StoreError::from))
                .collect()
        })
    }

    pub fn len(&self) -> StoreResult<u64> {
        self.read(|conn, _| QuadTable::new(conn).count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.read(|conn, _| {
            let count = |sql: &str| -> StoreResult<u64> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n as u64)
            };
            Ok(StoreStats {
                quads: QuadTable::new(conn).count()?,
                contexts: count("SELECT count(DISTINCT C_URI) FROM QUAD")?,
                resources: count("SELECT count(*) FROM RESOURCE")?,
                literals: count("SELECT count(*) FROM LITERAL")?,
                bnodes: count("SELECT count(*) FROM BNODE")?,
            })
        })
    }

    /// Every quad in N3 form
    pub fn n3_rows(&self) -> StoreResult<Vec<N3Row>> {
        self.read(|conn, _| views::n3_rows(conn))
    }

    /// The whole store as N-Quads text
    pub fn serialize_n3(&self) -> StoreResult<String> {
        let mut out = String::new();
        for row in self.n3_rows()? {
            out.push_str(&row.to_line());
            out.push('\n');
        }
        Ok(out)
    }

    /// Every quad with raw term values
    pub fn statement_rows(&self) -> StoreResult<Vec<StatementRow>> {
        self.read(|conn, _| views::statement_rows(conn))
    }

    /// Parse a document and store its quads in one transaction.
    ///
    /// Statements without a graph name go to `default_context`. Returns the
    /// number of quads that were not already present.
    pub fn load<R: BufRead>(
        &self,
        reader: R,
        format: RdfFormat,
        base_iri: Option<&str>,
        default_context: Option<&NamedNode>,
    ) -> StoreResult<usize> {
        let quads = parse_quads(reader, format, base_iri, default_context)?;
        let inserted = self.add_all(&quads)?;
        info!("Loaded {} quads ({} new)", quads.len(), inserted);
        if self.config.update_index_stats {
            self.update_index_statistics()?;
        }
        Ok(inserted)
    }

    /// Load a file, detecting the format from its extension. The file's own
    /// `file:` IRI is the base IRI for relative references.
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        format: Option<RdfFormat>,
        default_context: Option<&NamedNode>,
    ) -> StoreResult<usize> {
        let path = path.as_ref();
        let format = match format.or_else(|| RdfFormat::from_path(path)) {
            Some(format) => format,
            None => {
                return Err(StoreError::Parse(format!(
                    "cannot tell the RDF format of {}",
                    path.display()
                )))
            }
        };
        let base = crate::rdf::file_iri(path)?;
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        self.load(reader, format, Some(base.as_str()), default_context)
    }

    /// Refresh the planner's index statistics
    pub fn update_index_statistics(&self) -> StoreResult<()> {
        self.read(|conn, _| schema::update_index_statistics(conn))
    }
}

fn add_one(conn: &Connection, cache: &mut ResourceCache, quad: &Quad) -> StoreResult<(QuadId, bool)> {
    let interned = TermDictionary::new(conn, cache).intern_quad(quad)?;
    let table = QuadTable::new(conn);
    // a quad that references a term created just now cannot be stored yet
    if interned.created {
        table.insert_known_absent(&interned.id)
    } else {
        table.insert(&interned.id)
    }
}

/// Open the connection; a missing file is only created along with the schema
fn connect(config: &StoreConfig) -> StoreResult<Connection> {
    let Some(path) = &config.path else {
        return Ok(Connection::open_in_memory()?);
    };
    if config.create_schema {
        return Ok(Connection::open(path)?);
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    match Connection::open_with_flags(path, flags) {
        Ok(conn) => Ok(conn),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::CannotOpen => {
            Err(StoreError::Config(format!(
                "no quad store at {}; open with new='yes' to create one",
                describe(config)
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn describe(config: &StoreConfig) -> String {
    match &config.path {
        Some(path) => path.display().to_string(),
        None => ":memory:".to_string(),
    }
}
