//! Quadstore
//!
//! Dictionary-encoded RDF quad storage on SQLite. Every distinct URI, literal
//! and blank node is interned once and referenced by a surrogate key; a quad
//! is one row of keys with an optional named-graph context.
//!
//! # Architecture
//!
//! - Term dictionary: get-or-create interning for the `RESOURCE`, `LITERAL`
//!   and `BNODE` tables, with an LRU cache for URI keys
//! - Quad table: idempotent insert keyed on the full 7-column natural key
//! - Shape dispatcher: subject {URI, blank} x object {URI, blank, literal} x
//!   context {present, absent} selects one of 12 prepared lookups
//! - Projection views: `STATEMENTS_N3` (N3 terms) and `STATEMENTS` (raw values)
//!
//! Uniqueness is enforced by the database, so concurrent writers on the same
//! file converge on one key per term and one row per quad.
//!
//! ## Example Usage
//!
//! ```rust
//! use quadstore::{Literal, NamedNode, Quad, QuadPattern, QuadStore, RdfPredicate};
//!
//! let store = QuadStore::in_memory().unwrap();
//!
//! let quad = Quad::in_default_graph(
//!     NamedNode::new("http://a").unwrap().into(),
//!     RdfPredicate::new("http://p").unwrap(),
//!     Literal::new_language_tagged_literal("v", "en").unwrap().into(),
//! );
//!
//! let (id, inserted) = store.add(&quad).unwrap();
//! assert!(inserted);
//! assert_eq!(store.add(&quad).unwrap(), (id, false));
//!
//! // a context is part of the natural key
//! let named = quad.clone().with_graph(Some(NamedNode::new("http://g").unwrap()));
//! assert!(!store.contains(&named).unwrap());
//!
//! let found = store.find(&QuadPattern::any().in_graph(None)).unwrap();
//! assert_eq!(found, vec![quad]);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod rdf;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::{JournalMode, StoreConfig};
pub use error::{StoreError, StoreResult};

pub use rdf::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfFormat, RdfObject,
    RdfPredicate, RdfResult, RdfSubject,
};

pub use storage::{
    lookup_table_json, select_lookup, ContextShape, LookupStatement, N3Row, ObjectShape,
    QuadId, QuadShape, StatementRow, SubjectShape, LOOKUP_STATEMENTS,
};

pub use store::{QuadStore, StoreStats};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
