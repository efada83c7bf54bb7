//! Read-side projections over the `STATEMENTS_N3` and `STATEMENTS` views

use super::keys::QuadId;
use crate::error::{StoreError, StoreResult};
use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use rusqlite::{Connection, Row};
use serde::Serialize;

pub(crate) const STATEMENT_COLUMNS: &str = "statement_id, s_uri, s_blank, predicate, o_uri, o_blank, \
     o_literal, o_lit_lang, o_lit_dt, context";

const SELECT_N3: &str =
    "SELECT statement_id, subject, predicate, object, context FROM STATEMENTS_N3 ORDER BY statement_id";
const SELECT_CONTEXTS: &str =
    "SELECT DISTINCT c.URI FROM QUAD q JOIN RESOURCE c ON c.ID = q.C_URI ORDER BY c.URI";

/// A quad rendered as N3 terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct N3Row {
    pub statement_id: QuadId,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// None = default graph
    pub context: Option<String>,
}

impl N3Row {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            statement_id: row.get(0)?,
            subject: row.get(1)?,
            predicate: row.get(2)?,
            object: row.get(3)?,
            context: row.get(4)?,
        })
    }

    /// One N-Triples / N-Quads line
    pub fn to_line(&self) -> String {
        match &self.context {
            Some(context) => format!("{} {} {} {} .", self.subject, self.predicate, self.object, context),
            None => format!("{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}

/// A quad with raw term values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    pub statement_id: QuadId,
    pub s_uri: Option<String>,
    pub s_blank: Option<String>,
    pub predicate: String,
    pub o_uri: Option<String>,
    pub o_blank: Option<String>,
    pub o_literal: Option<String>,
    pub o_lit_lang: Option<String>,
    pub o_lit_dt: Option<String>,
    pub context: Option<String>,
}

impl StatementRow {
    /// Read a row selected with [`STATEMENT_COLUMNS`]
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            statement_id: row.get(0)?,
            s_uri: row.get(1)?,
            s_blank: row.get(2)?,
            predicate: row.get(3)?,
            o_uri: row.get(4)?,
            o_blank: row.get(5)?,
            o_literal: row.get(6)?,
            o_lit_lang: row.get(7)?,
            o_lit_dt: row.get(8)?,
            context: row.get(9)?,
        })
    }

    /// Rebuild the RDF quad
    pub fn to_quad(&self) -> StoreResult<Quad> {
        let subject = match (&self.s_uri, &self.s_blank) {
            (Some(uri), None) => RdfSubject::NamedNode(NamedNode::new(uri)?),
            (None, Some(name)) => RdfSubject::BlankNode(BlankNode::new(name)?),
            _ => {
                return Err(StoreError::Inconsistent(format!(
                    "statement {} has no single subject",
                    self.statement_id
                )))
            }
        };

        let object = match (&self.o_uri, &self.o_blank, &self.o_literal) {
            (Some(uri), None, None) => RdfObject::NamedNode(NamedNode::new(uri)?),
            (None, Some(name), None) => RdfObject::BlankNode(BlankNode::new(name)?),
            (None, None, Some(value)) => RdfObject::Literal(Literal::from_parts(
                value.as_str(),
                self.o_lit_lang.as_deref(),
                self.o_lit_dt.as_deref(),
            )?),
            _ => {
                return Err(StoreError::Inconsistent(format!(
                    "statement {} has no single object",
                    self.statement_id
                )))
            }
        };

        let graph = self.context.as_deref().map(NamedNode::new).transpose()?;
        Ok(Quad::new(subject, RdfPredicate::new(&self.predicate)?, object, graph))
    }
}

/// Every quad in N3 form, in insertion order
pub fn n3_rows(conn: &Connection) -> StoreResult<Vec<N3Row>> {
    let mut stmt = conn.prepare_cached(SELECT_N3)?;
    let rows = stmt
        .query_map([], N3Row::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Every quad with raw values, in insertion order
pub fn statement_rows(conn: &Connection) -> StoreResult<Vec<StatementRow>> {
    let sql = format!("SELECT {} FROM STATEMENTS ORDER BY statement_id", STATEMENT_COLUMNS);
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map([], StatementRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Named graphs that hold at least one quad
pub fn context_uris(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(SELECT_CONTEXTS)?;
    let uris = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(uris)
}
