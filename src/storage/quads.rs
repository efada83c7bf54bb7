//! Quad table: idempotent insert, existence checks and removal

use super::dispatch::select_lookup;
use super::keys::{EncodedQuad, QuadId, ResourceId};
use crate::error::{StoreError, StoreResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

const INSERT_QUAD: &str = "INSERT INTO QUAD (S_URI, S_BLANK, P_URI, O_URI, O_BLANK, O_LITERAL, C_URI) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT DO NOTHING RETURNING ID";
const SELECT_QUAD: &str =
    "SELECT S_URI, S_BLANK, P_URI, O_URI, O_BLANK, O_LITERAL, C_URI FROM QUAD WHERE ID=?1";
const DELETE_QUAD: &str = "DELETE FROM QUAD WHERE ID=?1";
const DELETE_CONTEXT: &str = "DELETE FROM QUAD WHERE C_URI=?1";
const DELETE_DEFAULT_CONTEXT: &str = "DELETE FROM QUAD WHERE C_URI IS NULL";
const COUNT_QUADS: &str = "SELECT count(*) FROM QUAD";

/// Statement rows on one connection
pub struct QuadTable<'a> {
    conn: &'a Connection,
}

impl<'a> QuadTable<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Find a quad by its natural key using the lookup for its shape
    pub fn exists(&self, quad: &EncodedQuad) -> StoreResult<Option<QuadId>> {
        let lookup = select_lookup(quad.shape());
        let params = quad.lookup_params();
        debug_assert_eq!(params.len(), lookup.param_count);

        let mut stmt = self.conn.prepare_cached(lookup.sql)?;
        Ok(stmt
            .query_row(params_from_iter(params), |row| row.get(0))
            .optional()?)
    }

    /// Insert a quad, or return the key of the identical row already stored.
    ///
    /// The boolean is true when this call created the row.
    pub fn insert(&self, quad: &EncodedQuad) -> StoreResult<(QuadId, bool)> {
        if let Some(id) = self.exists(quad)? {
            return Ok((id, false));
        }
        self.insert_known_absent(quad)
    }

    /// Insert without the leading existence check.
    ///
    /// For quads referencing a term created in the same transaction, which
    /// cannot be stored yet. A conflict is still resolved by reading back.
    pub fn insert_known_absent(&self, quad: &EncodedQuad) -> StoreResult<(QuadId, bool)> {
        let mut stmt = self.conn.prepare_cached(INSERT_QUAD)?;
        let inserted: Option<QuadId> = stmt
            .query_row(params_from_iter(quad.columns()), |row| row.get(0))
            .optional()?;

        match inserted {
            Some(id) => {
                debug!("Inserted quad {} ({:?})", id, quad.shape());
                Ok((id, true))
            }
            None => {
                let id = self.exists(quad)?.ok_or_else(|| {
                    StoreError::Inconsistent("quad vanished after insert conflict".to_string())
                })?;
                Ok((id, false))
            }
        }
    }

    /// Stored keys of a quad row
    pub fn get(&self, id: QuadId) -> StoreResult<Option<EncodedQuad>> {
        let mut stmt = self.conn.prepare_cached(SELECT_QUAD)?;
        let columns = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                ))
            })
            .optional()?;

        match columns {
            Some((s_uri, s_blank, p_uri, o_uri, o_blank, o_literal, c_uri)) => Ok(Some(
                EncodedQuad::from_columns(s_uri, s_blank, p_uri, o_uri, o_blank, o_literal, c_uri)?,
            )),
            None => Ok(None),
        }
    }

    /// Delete one row; false when it did not exist
    pub fn delete(&self, id: QuadId) -> StoreResult<bool> {
        let mut stmt = self.conn.prepare_cached(DELETE_QUAD)?;
        Ok(stmt.execute(params![id])? > 0)
    }

    /// Delete every quad of a context (`None` = default graph)
    pub fn delete_context(&self, context: Option<ResourceId>) -> StoreResult<usize> {
        let removed = match context {
            Some(id) => self.conn.prepare_cached(DELETE_CONTEXT)?.execute(params![id])?,
            None => self.conn.prepare_cached(DELETE_DEFAULT_CONTEXT)?.execute([])?,
        };
        debug!("Removed {} quads from context {:?}", removed, context);
        Ok(removed)
    }

    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .prepare_cached(COUNT_QUADS)?
            .query_row([], |row| row.get(0))?;
        Ok(count as u64)
    }
}
