//! Dictionary-encoded quad storage
//!
//! Terms are interned into three dictionary tables (`RESOURCE`, `LITERAL`,
//! `BNODE`) and each statement is one `QUAD` row of surrogate keys:
//!
//! ```text
//! QUAD(ID, S_URI | S_BLANK, P_URI, O_URI | O_BLANK | O_LITERAL, C_URI?)
//! ```
//!
//! Single-quad existence checks go through the shape dispatcher, which picks
//! one of twelve prepared lookups. The `STATEMENTS_N3` and `STATEMENTS` views
//! join the keys back into terms for reading.

pub mod dictionary;
pub mod dispatch;
pub mod keys;
pub mod pattern;
pub mod quads;
pub mod schema;
pub mod views;

pub use dictionary::{ResourceCache, TermDictionary};
pub use dispatch::{
    lookup_table_json, select_lookup, ContextShape, LookupStatement, ObjectShape, QuadShape,
    SubjectShape, LOOKUP_STATEMENTS,
};
pub use keys::{
    BnodeId, EncodedQuad, Interned, LiteralId, ObjectKey, QuadId, ResourceId, SubjectKey,
};
pub use pattern::{find_rows, ContextFilter, ContextMatch, EncodedPattern, PatternShape};
pub use quads::QuadTable;
pub use views::{N3Row, StatementRow};
