//! Shape dispatch for single-quad lookups
//!
//! A quad's subject has 2 shapes (URI, blank), its object 3 (URI, blank, literal)
//! and its context 2 (present, absent). Each of the 2 x 3 x 2 = 12 combinations
//! has its own prepared lookup in [`LOOKUP_STATEMENTS`], so every existence check
//! compares indexed columns by equality and never binds a NULL. The default graph
//! is matched with `C_URI IS NULL`, which is why context-less lookups take three
//! parameters instead of four.
//!
//! The table is ordered subject-major, then object, then context. Only the
//! shape -> statement mapping is relied upon; [`QuadShape::index`] is the
//! position in that ordering.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;

/// Subject kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectShape {
    Uri,
    Blank,
}

/// Object kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectShape {
    Uri,
    Blank,
    Literal,
}

/// Whether the quad belongs to a named graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextShape {
    Present,
    Absent,
}

/// Structural variant of a quad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuadShape {
    pub subject: SubjectShape,
    pub object: ObjectShape,
    pub context: ContextShape,
}

impl QuadShape {
    pub const fn new(subject: SubjectShape, object: ObjectShape, context: ContextShape) -> Self {
        Self {
            subject,
            object,
            context,
        }
    }

    /// Classify a quad from which of its columns are set.
    ///
    /// Subject must be exactly one of URI/blank and object exactly one of
    /// URI/blank/literal; anything else is rejected rather than mapped to a
    /// near-miss statement.
    pub fn classify(
        s_uri: bool,
        s_blank: bool,
        o_uri: bool,
        o_blank: bool,
        o_literal: bool,
        context: bool,
    ) -> StoreResult<Self> {
        let subject = match (s_uri, s_blank) {
            (true, false) => SubjectShape::Uri,
            (false, true) => SubjectShape::Blank,
            _ => {
                return Err(StoreError::ContractViolation(format!(
                    "no lookup for subject shape (uri={}, blank={})",
                    s_uri, s_blank
                )))
            }
        };
        let object = match (o_uri, o_blank, o_literal) {
            (true, false, false) => ObjectShape::Uri,
            (false, true, false) => ObjectShape::Blank,
            (false, false, true) => ObjectShape::Literal,
            _ => {
                return Err(StoreError::ContractViolation(format!(
                    "no lookup for object shape (uri={}, blank={}, literal={})",
                    o_uri, o_blank, o_literal
                )))
            }
        };
        let context = if context {
            ContextShape::Present
        } else {
            ContextShape::Absent
        };
        Ok(Self::new(subject, object, context))
    }

    /// Position in [`LOOKUP_STATEMENTS`]
    pub fn index(self) -> usize {
        let s = match self.subject {
            SubjectShape::Uri => 0,
            SubjectShape::Blank => 1,
        };
        let o = match self.object {
            ObjectShape::Uri => 0,
            ObjectShape::Blank => 1,
            ObjectShape::Literal => 2,
        };
        let c = match self.context {
            ContextShape::Present => 0,
            ContextShape::Absent => 1,
        };
        s * 6 + o * 2 + c
    }
}

/// One parameterized existence lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookupStatement {
    pub shape: QuadShape,
    /// Bound parameters: subject, predicate, object, and context when present
    pub param_count: usize,
    pub sql: &'static str,
}

use ContextShape::{Absent, Present};
use ObjectShape::{Blank as OBlank, Literal as OLiteral, Uri as OUri};
use SubjectShape::{Blank as SBlank, Uri as SUri};

/// The twelve lookup statements, one per quad shape
pub static LOOKUP_STATEMENTS: [LookupStatement; 12] = [
    LookupStatement {
        shape: QuadShape::new(SUri, OUri, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_URI=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SUri, OUri, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_URI=?3 AND r.C_URI IS NULL",
    },
    LookupStatement {
        shape: QuadShape::new(SUri, OBlank, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_BLANK=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SUri, OBlank, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_BLANK=?3 AND r.C_URI IS NULL",
    },
    LookupStatement {
        shape: QuadShape::new(SUri, OLiteral, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_LITERAL=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SUri, OLiteral, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_URI=?1 AND r.P_URI=?2 AND r.O_LITERAL=?3 AND r.C_URI IS NULL",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OUri, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_URI=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OUri, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_URI=?3 AND r.C_URI IS NULL",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OBlank, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_BLANK=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OBlank, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_BLANK=?3 AND r.C_URI IS NULL",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OLiteral, Present),
        param_count: 4,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_LITERAL=?3 AND r.C_URI=?4",
    },
    LookupStatement {
        shape: QuadShape::new(SBlank, OLiteral, Absent),
        param_count: 3,
        sql: "SELECT r.ID FROM QUAD r WHERE r.S_BLANK=?1 AND r.P_URI=?2 AND r.O_LITERAL=?3 AND r.C_URI IS NULL",
    },
];

/// Pick the lookup statement for a quad shape
pub fn select_lookup(shape: QuadShape) -> &'static LookupStatement {
    &LOOKUP_STATEMENTS[shape.index()]
}

/// The shape -> statement table as JSON, for code generators and tooling
pub fn lookup_table_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&LOOKUP_STATEMENTS[..])
}
