//! Persisted layout: dictionary tables, the quad table, indexes and views

use crate::config::{JournalMode, StoreConfig};
use crate::error::StoreResult;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Duration;
use tracing::{debug, info};

/// Interned URIs
pub const CREATE_RESOURCE: &str = "CREATE TABLE IF NOT EXISTS RESOURCE (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    URI TEXT NOT NULL,
    CONSTRAINT UQ_RESOURCE_URI UNIQUE (URI)
)";

/// Interned literals. A literal carries a language tag or a datatype, never both.
pub const CREATE_LITERAL: &str = "CREATE TABLE IF NOT EXISTS LITERAL (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    VAL TEXT NOT NULL,
    LANGUAGE TEXT,
    DATATYPE INTEGER REFERENCES RESOURCE (ID),
    CONSTRAINT CK_LITERAL_LANG_DT CHECK (LANGUAGE IS NULL OR DATATYPE IS NULL),
    CONSTRAINT CK_LITERAL_LANG_NONEMPTY CHECK (LANGUAGE IS NULL OR LANGUAGE <> '')
)";

/// Interned blank node names
pub const CREATE_BNODE: &str = "CREATE TABLE IF NOT EXISTS BNODE (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL,
    CONSTRAINT UQ_BNODE_NAME UNIQUE (NAME)
)";

/// One row per statement
pub const CREATE_QUAD: &str = "CREATE TABLE IF NOT EXISTS QUAD (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    S_URI INTEGER REFERENCES RESOURCE (ID),
    S_BLANK INTEGER REFERENCES BNODE (ID),
    P_URI INTEGER NOT NULL REFERENCES RESOURCE (ID),
    O_URI INTEGER REFERENCES RESOURCE (ID),
    O_BLANK INTEGER REFERENCES BNODE (ID),
    O_LITERAL INTEGER REFERENCES LITERAL (ID),
    C_URI INTEGER REFERENCES RESOURCE (ID),
    CONSTRAINT CK_QUAD_SUBJECT CHECK ((S_URI IS NULL) <> (S_BLANK IS NULL)),
    CONSTRAINT CK_QUAD_OBJECT CHECK (
        (O_URI IS NOT NULL) + (O_BLANK IS NOT NULL) + (O_LITERAL IS NOT NULL) = 1
    )
)";

/// Natural keys. UNIQUE treats NULLs as distinct, so absent columns are
/// folded to 0, which AUTOINCREMENT never hands out.
pub const CREATE_UNIQUE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS UQ_LITERAL_VAL
        ON LITERAL (VAL, ifnull(LANGUAGE, ''), ifnull(DATATYPE, 0))",
    "CREATE UNIQUE INDEX IF NOT EXISTS UQ_QUAD
        ON QUAD (ifnull(S_URI, 0), ifnull(S_BLANK, 0), P_URI,
                 ifnull(O_URI, 0), ifnull(O_BLANK, 0), ifnull(O_LITERAL, 0),
                 ifnull(C_URI, 0))",
];

/// One index per foreign-key column
pub const CREATE_FK_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS IDX_LITERAL_DATATYPE ON LITERAL (DATATYPE)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_S_URI ON QUAD (S_URI)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_S_BLANK ON QUAD (S_BLANK)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_P_URI ON QUAD (P_URI)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_O_URI ON QUAD (O_URI)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_O_BLANK ON QUAD (O_BLANK)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_O_LITERAL ON QUAD (O_LITERAL)",
    "CREATE INDEX IF NOT EXISTS IDX_QUAD_C_URI ON QUAD (C_URI)",
];

/// Quads rendered as N3 terms
pub const CREATE_STATEMENTS_N3: &str = r#"CREATE VIEW IF NOT EXISTS STATEMENTS_N3 AS
SELECT
    q.ID AS statement_id,
    coalesce('<' || su.URI || '>', '_:' || sb.NAME) AS subject,
    '<' || p.URI || '>' AS predicate,
    coalesce(
        '<' || ou.URI || '>',
        '_:' || ob.NAME,
        '"' || replace(replace(replace(replace(replace(lo.VAL,
            '\', '\\'), '"', '\"'),
            char(10), '\n'), char(13), '\r'), char(9), '\t') || '"'
            || coalesce('@' || lo.LANGUAGE, '^^<' || ldt.URI || '>', '')
    ) AS object,
    '<' || c.URI || '>' AS context
FROM QUAD q
JOIN RESOURCE p ON p.ID = q.P_URI
LEFT JOIN RESOURCE su ON su.ID = q.S_URI
LEFT JOIN BNODE sb ON sb.ID = q.S_BLANK
LEFT JOIN RESOURCE ou ON ou.ID = q.O_URI
LEFT JOIN BNODE ob ON ob.ID = q.O_BLANK
LEFT JOIN LITERAL lo ON lo.ID = q.O_LITERAL
LEFT JOIN RESOURCE ldt ON ldt.ID = lo.DATATYPE
LEFT JOIN RESOURCE c ON c.ID = q.C_URI"#;

/// Quads with raw term values
pub const CREATE_STATEMENTS: &str = "CREATE VIEW IF NOT EXISTS STATEMENTS AS
SELECT
    q.ID AS statement_id,
    su.URI AS s_uri,
    sb.NAME AS s_blank,
    p.URI AS predicate,
    ou.URI AS o_uri,
    ob.NAME AS o_blank,
    lo.VAL AS o_literal,
    lo.LANGUAGE AS o_lit_lang,
    ldt.URI AS o_lit_dt,
    c.URI AS context
FROM QUAD q
JOIN RESOURCE p ON p.ID = q.P_URI
LEFT JOIN RESOURCE su ON su.ID = q.S_URI
LEFT JOIN BNODE sb ON sb.ID = q.S_BLANK
LEFT JOIN RESOURCE ou ON ou.ID = q.O_URI
LEFT JOIN BNODE ob ON ob.ID = q.O_BLANK
LEFT JOIN LITERAL lo ON lo.ID = q.O_LITERAL
LEFT JOIN RESOURCE ldt ON ldt.ID = lo.DATATYPE
LEFT JOIN RESOURCE c ON c.ID = q.C_URI";

/// Connection settings applied before any statement runs
pub fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> StoreResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);

    // journal_mode answers with a row, and in-memory databases only accept MEMORY
    if config.path.is_some() {
        let mode = match config.journal_mode {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        };
        let applied: String = conn.query_row(&format!("PRAGMA journal_mode={}", mode), [], |row| {
            row.get(0)
        })?;
        debug!("journal_mode={}", applied);
    }
    Ok(())
}

/// Whether the quad table has been created
pub fn schema_exists(conn: &Connection) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'QUAD'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Create every table, index and view that is missing.
///
/// Takes the write lock up front so stores opening the same file at once
/// wait on the busy timeout instead of failing on a lock upgrade.
pub fn create_schema(conn: &Connection) -> StoreResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for ddl in [CREATE_RESOURCE, CREATE_LITERAL, CREATE_BNODE, CREATE_QUAD] {
        tx.execute(ddl, [])?;
    }
    for ddl in CREATE_UNIQUE_INDEXES.iter().chain(CREATE_FK_INDEXES) {
        tx.execute(ddl, [])?;
    }
    tx.execute(CREATE_STATEMENTS_N3, [])?;
    tx.execute(CREATE_STATEMENTS, [])?;
    tx.commit()?;
    info!("Quad store schema ready");
    Ok(())
}

/// Refresh the planner's index statistics
pub fn update_index_statistics(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("ANALYZE")?;
    debug!("Index statistics updated");
    Ok(())
}
