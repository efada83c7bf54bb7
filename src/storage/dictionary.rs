//! Term dictionary: interning of URIs, literals and blank nodes
//!
//! Each table hands out one surrogate key per distinct value. Interning is
//! get-or-create: look the value up, and if it is missing insert it with
//! `ON CONFLICT DO NOTHING`. When the insert returns no row another writer got
//! there first and the surviving key is read back, so a uniqueness conflict is
//! never reported to the caller.

use super::keys::{BnodeId, EncodedQuad, Interned, LiteralId, ObjectKey, ResourceId, SubjectKey};
use crate::error::{StoreError, StoreResult};
use crate::rdf::{
    BlankNode, Literal, NamedNode, Quad, RdfError, RdfObject, RdfPredicate, RdfSubject,
};
use lru::LruCache;
use rusqlite::{params, Connection, OptionalExtension};
use std::num::NonZeroUsize;
use tracing::debug;

const SELECT_RESOURCE: &str = "SELECT ID FROM RESOURCE WHERE URI=?1";
const INSERT_RESOURCE: &str =
    "INSERT INTO RESOURCE (URI) VALUES (?1) ON CONFLICT DO NOTHING RETURNING ID";
const SELECT_RESOURCE_URI: &str = "SELECT URI FROM RESOURCE WHERE ID=?1";

const SELECT_BNODE: &str = "SELECT ID FROM BNODE WHERE NAME=?1";
const INSERT_BNODE: &str = "INSERT INTO BNODE (NAME) VALUES (?1) ON CONFLICT DO NOTHING RETURNING ID";
const SELECT_BNODE_NAME: &str = "SELECT NAME FROM BNODE WHERE ID=?1";

const SELECT_PLAIN_LITERAL: &str =
    "SELECT ID FROM LITERAL WHERE VAL=?1 AND LANGUAGE IS NULL AND DATATYPE IS NULL";
const SELECT_LANG_LITERAL: &str =
    "SELECT ID FROM LITERAL WHERE VAL=?1 AND LANGUAGE=?2 AND DATATYPE IS NULL";
const SELECT_TYPED_LITERAL: &str =
    "SELECT ID FROM LITERAL WHERE VAL=?1 AND LANGUAGE IS NULL AND DATATYPE=?2";
const INSERT_LITERAL: &str = "INSERT INTO LITERAL (VAL, LANGUAGE, DATATYPE) VALUES (?1, ?2, ?3) \
     ON CONFLICT DO NOTHING RETURNING ID";
const SELECT_LITERAL_PARTS: &str = "SELECT l.VAL, l.LANGUAGE, dt.URI FROM LITERAL l \
     LEFT JOIN RESOURCE dt ON dt.ID = l.DATATYPE WHERE l.ID=?1";

/// Bounded URI -> key cache in front of the `RESOURCE` table
pub struct ResourceCache {
    entries: LruCache<String, ResourceId>,
}

impl ResourceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, uri: &str) -> Option<ResourceId> {
        self.entries.get(uri).copied()
    }

    pub fn put(&mut self, uri: &str, id: ResourceId) {
        self.entries.put(uri.to_string(), id);
    }

    /// Forget everything; required after a rollback
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated literal columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind<'a> {
    Plain,
    Language(&'a str),
    Typed(&'a str),
}

/// Lowercase a language tag, rejecting anything that is not BCP47
fn normalize_language(tag: &str) -> StoreResult<String> {
    Literal::normalize_language_tag(tag).map_err(|e| match e {
        RdfError::InvalidLiteral(msg) => StoreError::InvalidLiteral(msg),
        other => other.into(),
    })
}

impl<'a> LiteralKind<'a> {
    fn classify(language: Option<&'a str>, datatype: Option<&'a str>) -> StoreResult<Self> {
        match (language, datatype) {
            (Some(_), Some(_)) => Err(StoreError::InvalidLiteral(
                "language tag and datatype are mutually exclusive".to_string(),
            )),
            (Some(""), None) => Err(StoreError::InvalidLiteral(
                "language tag must not be empty".to_string(),
            )),
            (Some(lang), None) => Ok(LiteralKind::Language(lang)),
            (None, Some(dt)) => Ok(LiteralKind::Typed(dt)),
            (None, None) => Ok(LiteralKind::Plain),
        }
    }
}

/// Dictionary operations on one connection
///
/// Borrowing the connection (rather than a transaction) lets the same code run
/// inside the caller's transaction or in autocommit mode for reads.
pub struct TermDictionary<'a> {
    conn: &'a Connection,
    cache: &'a mut ResourceCache,
}

impl<'a> TermDictionary<'a> {
    pub fn new(conn: &'a Connection, cache: &'a mut ResourceCache) -> Self {
        Self { conn, cache }
    }

    /// Run a statement yielding at most one ID: a lookup, or an insert that
    /// returns nothing on conflict
    fn query_id(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.query_row(params, |row| row.get(0)).optional()?)
    }

    // ----- resources -----

    /// Key of an already interned URI
    pub fn resource_id(&mut self, uri: &str) -> StoreResult<Option<ResourceId>> {
        if let Some(id) = self.cache.get(uri) {
            return Ok(Some(id));
        }
        let id = self.query_id(SELECT_RESOURCE, params![uri])?.map(ResourceId);
        if let Some(id) = id {
            self.cache.put(uri, id);
        }
        Ok(id)
    }

    /// Get or create the key of a URI
    pub fn intern_resource(&mut self, uri: &str) -> StoreResult<Interned<ResourceId>> {
        if let Some(id) = self.resource_id(uri)? {
            return Ok(Interned::existing(id));
        }
        let interned = match self.query_id(INSERT_RESOURCE, params![uri])? {
            Some(id) => {
                debug!("Interned resource {} as {}", uri, id);
                Interned::created(ResourceId(id))
            }
            None => {
                let id = self.query_id(SELECT_RESOURCE, params![uri])?.ok_or_else(|| {
                    StoreError::Inconsistent(format!("resource <{}> vanished after conflict", uri))
                })?;
                Interned::existing(ResourceId(id))
            }
        };
        self.cache.put(uri, interned.id);
        Ok(interned)
    }

    pub fn resource_uri(&self, id: ResourceId) -> StoreResult<Option<String>> {
        let mut stmt = self.conn.prepare_cached(SELECT_RESOURCE_URI)?;
        Ok(stmt.query_row(params![id], |row| row.get(0)).optional()?)
    }

    // ----- blank nodes -----

    pub fn bnode_id(&self, name: &str) -> StoreResult<Option<BnodeId>> {
        Ok(self.query_id(SELECT_BNODE, params![name])?.map(BnodeId))
    }

    /// Get or create the key of a blank node name
    pub fn intern_bnode(&mut self, name: &str) -> StoreResult<Interned<BnodeId>> {
        if let Some(id) = self.bnode_id(name)? {
            return Ok(Interned::existing(id));
        }
        match self.query_id(INSERT_BNODE, params![name])? {
            Some(id) => {
                debug!("Interned blank node _:{} as {}", name, id);
                Ok(Interned::created(BnodeId(id)))
            }
            None => self
                .bnode_id(name)?
                .map(Interned::existing)
                .ok_or_else(|| StoreError::Inconsistent(format!("blank node _:{} vanished after conflict", name))),
        }
    }

    pub fn bnode_name(&self, id: BnodeId) -> StoreResult<Option<String>> {
        let mut stmt = self.conn.prepare_cached(SELECT_BNODE_NAME)?;
        Ok(stmt.query_row(params![id], |row| row.get(0)).optional()?)
    }

    // ----- literals -----

    fn select_literal(&self, value: &str, kind: LiteralKind<'_>, datatype: Option<ResourceId>) -> StoreResult<Option<LiteralId>> {
        let id = match (kind, datatype) {
            (LiteralKind::Plain, _) => self.query_id(SELECT_PLAIN_LITERAL, params![value])?,
            (LiteralKind::Language(lang), _) => {
                self.query_id(SELECT_LANG_LITERAL, params![value, lang])?
            }
            (LiteralKind::Typed(_), Some(dt)) => {
                self.query_id(SELECT_TYPED_LITERAL, params![value, dt])?
            }
            (LiteralKind::Typed(_), None) => None,
        };
        Ok(id.map(LiteralId))
    }

    /// Key of an already interned literal
    pub fn literal_id(
        &mut self,
        value: &str,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> StoreResult<Option<LiteralId>> {
        let language = language.map(normalize_language).transpose()?;
        let kind = LiteralKind::classify(language.as_deref(), datatype)?;
        let datatype_id = match kind {
            LiteralKind::Typed(uri) => match self.resource_id(uri)? {
                Some(id) => Some(id),
                // unknown datatype, so no literal can use it
                None => return Ok(None),
            },
            _ => None,
        };
        self.select_literal(value, kind, datatype_id)
    }

    /// Get or create the key of a literal.
    ///
    /// A literal with both a language tag and a datatype, or with an empty
    /// language tag, is rejected before anything is written. The datatype URI
    /// is interned as a resource first.
    pub fn intern_literal(
        &mut self,
        value: &str,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> StoreResult<Interned<LiteralId>> {
        let language = language.map(normalize_language).transpose()?;
        let kind = LiteralKind::classify(language.as_deref(), datatype)?;

        let mut created = false;
        let datatype_id = match kind {
            LiteralKind::Typed(uri) => {
                let dt = self.intern_resource(uri)?;
                created |= dt.created;
                Some(dt.id)
            }
            _ => None,
        };

        // a literal naming a brand-new datatype cannot exist yet
        if !created {
            if let Some(id) = self.select_literal(value, kind, datatype_id)? {
                return Ok(Interned::existing(id));
            }
        }

        let language = match kind {
            LiteralKind::Language(lang) => Some(lang),
            _ => None,
        };
        match self.query_id(INSERT_LITERAL, params![value, language, datatype_id])? {
            Some(id) => {
                debug!("Interned literal {:?} as {}", value, id);
                Ok(Interned::created(LiteralId(id)))
            }
            None => self
                .select_literal(value, kind, datatype_id)?
                .map(Interned::existing)
                .ok_or_else(|| StoreError::Inconsistent(format!("literal {:?} vanished after conflict", value))),
        }
    }

    pub fn intern_literal_term(&mut self, literal: &Literal) -> StoreResult<Interned<LiteralId>> {
        let datatype = literal.datatype();
        self.intern_literal(
            literal.value(),
            literal.language(),
            datatype.as_ref().map(|dt| dt.as_str()),
        )
    }

    pub fn literal_term_id(&mut self, literal: &Literal) -> StoreResult<Option<LiteralId>> {
        let datatype = literal.datatype();
        self.literal_id(
            literal.value(),
            literal.language(),
            datatype.as_ref().map(|dt| dt.as_str()),
        )
    }

    /// Rebuild a stored literal
    pub fn literal(&self, id: LiteralId) -> StoreResult<Option<Literal>> {
        let mut stmt = self.conn.prepare_cached(SELECT_LITERAL_PARTS)?;
        let parts = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .optional()?;
        match parts {
            Some((value, language, datatype)) => Ok(Some(Literal::from_parts(
                value,
                language.as_deref(),
                datatype.as_deref(),
            )?)),
            None => Ok(None),
        }
    }

    // ----- quad terms -----

    pub fn intern_subject(&mut self, subject: &RdfSubject) -> StoreResult<Interned<SubjectKey>> {
        match subject {
            RdfSubject::NamedNode(n) => Ok(self.intern_resource(n.as_str())?.map(SubjectKey::Resource)),
            RdfSubject::BlankNode(b) => Ok(self.intern_bnode(b.as_str())?.map(SubjectKey::Bnode)),
        }
    }

    pub fn intern_object(&mut self, object: &RdfObject) -> StoreResult<Interned<ObjectKey>> {
        match object {
            RdfObject::NamedNode(n) => Ok(self.intern_resource(n.as_str())?.map(ObjectKey::Resource)),
            RdfObject::BlankNode(b) => Ok(self.intern_bnode(b.as_str())?.map(ObjectKey::Bnode)),
            RdfObject::Literal(l) => Ok(self.intern_literal_term(l)?.map(ObjectKey::Literal)),
        }
    }

    /// Intern every term of a quad. `created` is set when any term was new.
    pub fn intern_quad(&mut self, quad: &Quad) -> StoreResult<Interned<EncodedQuad>> {
        let subject = self.intern_subject(&quad.subject)?;
        let predicate = self.intern_resource(quad.predicate.as_str())?;
        let object = self.intern_object(&quad.object)?;
        let context = match &quad.graph {
            Some(graph) => Some(self.intern_resource(graph.as_str())?),
            None => None,
        };

        let created = subject.created
            || predicate.created
            || object.created
            || context.map_or(false, |c| c.created);
        Ok(Interned {
            id: EncodedQuad::new(subject.id, predicate.id, object.id, context.map(|c| c.id)),
            created,
        })
    }

    pub fn subject_key(&mut self, subject: &RdfSubject) -> StoreResult<Option<SubjectKey>> {
        match subject {
            RdfSubject::NamedNode(n) => Ok(self.resource_id(n.as_str())?.map(SubjectKey::Resource)),
            RdfSubject::BlankNode(b) => Ok(self.bnode_id(b.as_str())?.map(SubjectKey::Bnode)),
        }
    }

    pub fn object_key(&mut self, object: &RdfObject) -> StoreResult<Option<ObjectKey>> {
        match object {
            RdfObject::NamedNode(n) => Ok(self.resource_id(n.as_str())?.map(ObjectKey::Resource)),
            RdfObject::BlankNode(b) => Ok(self.bnode_id(b.as_str())?.map(ObjectKey::Bnode)),
            RdfObject::Literal(l) => Ok(self.literal_term_id(l)?.map(ObjectKey::Literal)),
        }
    }

    /// Decode a stored quad back into terms.
    ///
    /// Every key must resolve; a missing dictionary row is a dangling reference.
    pub fn decode_quad(&self, encoded: &EncodedQuad) -> StoreResult<Quad> {
        let subject: RdfSubject = match encoded.subject {
            SubjectKey::Resource(id) => NamedNode::new(&self.require_uri(id)?)?.into(),
            SubjectKey::Bnode(id) => BlankNode::new(&self.require_bnode(id)?)?.into(),
        };
        let predicate = RdfPredicate::new(&self.require_uri(encoded.predicate)?)?;
        let object: RdfObject = match encoded.object {
            ObjectKey::Resource(id) => NamedNode::new(&self.require_uri(id)?)?.into(),
            ObjectKey::Bnode(id) => BlankNode::new(&self.require_bnode(id)?)?.into(),
            ObjectKey::Literal(id) => self
                .literal(id)?
                .ok_or_else(|| StoreError::DanglingReference(format!("no literal {}", id)))?
                .into(),
        };
        let graph = match encoded.context {
            Some(id) => Some(NamedNode::new(&self.require_uri(id)?)?),
            None => None,
        };
        Ok(Quad::new(subject, predicate, object, graph))
    }

    fn require_uri(&self, id: ResourceId) -> StoreResult<String> {
        self.resource_uri(id)?
            .ok_or_else(|| StoreError::DanglingReference(format!("no resource {}", id)))
    }

    fn require_bnode(&self, id: BnodeId) -> StoreResult<String> {
        self.bnode_name(id)?
            .ok_or_else(|| StoreError::DanglingReference(format!("no blank node {}", id)))
    }

    /// Encode a quad without writing; `None` when any term is unknown
    pub fn encode_quad(&mut self, quad: &Quad) -> StoreResult<Option<EncodedQuad>> {
        let Some(subject) = self.subject_key(&quad.subject)? else {
            return Ok(None);
        };
        let Some(predicate) = self.resource_id(quad.predicate.as_str())? else {
            return Ok(None);
        };
        let Some(object) = self.object_key(&quad.object)? else {
            return Ok(None);
        };
        let context = match &quad.graph {
            Some(graph) => match self.resource_id(graph.as_str())? {
                Some(id) => Some(id),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(EncodedQuad::new(subject, predicate, object, context)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::schema;

    fn setup() -> (Connection, ResourceCache) {
        let conn = Connection::open_in_memory().unwrap();
        schema::apply_pragmas(&conn, &StoreConfig::default()).unwrap();
        schema::create_schema(&conn).unwrap();
        (conn, ResourceCache::new(16))
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_intern_resource_is_idempotent() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let first = dict.intern_resource("http://example.org/a").unwrap();
        let second = dict.intern_resource("http://example.org/a").unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let other = dict.intern_resource("http://example.org/b").unwrap();
        assert_ne!(other.id, first.id);
        assert_eq!(count(&conn, "RESOURCE"), 2);
    }

    #[test]
    fn test_resource_lookup_survives_cache_clear() {
        let (conn, mut cache) = setup();
        let id = TermDictionary::new(&conn, &mut cache)
            .intern_resource("http://example.org/a")
            .unwrap()
            .id;
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());

        let mut dict = TermDictionary::new(&conn, &mut cache);
        assert_eq!(dict.resource_id("http://example.org/a").unwrap(), Some(id));
        assert_eq!(dict.resource_id("http://example.org/missing").unwrap(), None);
        assert_eq!(
            dict.resource_uri(id).unwrap().as_deref(),
            Some("http://example.org/a")
        );
    }

    #[test]
    fn test_intern_bnode() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);
        let a = dict.intern_bnode("b0").unwrap();
        let b = dict.intern_bnode("b0").unwrap();
        assert!(a.created && !b.created);
        assert_eq!(a.id, b.id);
        assert_eq!(dict.bnode_name(a.id).unwrap().as_deref(), Some("b0"));
    }

    #[test]
    fn test_literal_kinds_are_distinct() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);
        let xsd_int = "http://www.w3.org/2001/XMLSchema#integer";

        let plain = dict.intern_literal("42", None, None).unwrap();
        let tagged = dict.intern_literal("42", Some("en"), None).unwrap();
        let typed = dict.intern_literal("42", None, Some(xsd_int)).unwrap();
        assert!(plain.created && tagged.created && typed.created);
        assert_ne!(plain.id, tagged.id);
        assert_ne!(plain.id, typed.id);
        assert_ne!(tagged.id, typed.id);

        assert_eq!(dict.intern_literal("42", None, None).unwrap(), Interned::existing(plain.id));
        assert_eq!(
            dict.intern_literal("42", Some("en"), None).unwrap(),
            Interned::existing(tagged.id)
        );
        assert_eq!(
            dict.intern_literal("42", None, Some(xsd_int)).unwrap(),
            Interned::existing(typed.id)
        );

        // datatype was interned as a resource
        assert!(dict.resource_id(xsd_int).unwrap().is_some());
        assert_eq!(dict.literal_id("42", None, Some(xsd_int)).unwrap(), Some(typed.id));
        assert_eq!(dict.literal_id("42", None, Some("http://unknown/dt")).unwrap(), None);
    }

    #[test]
    fn test_invalid_literal_never_reaches_storage() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let both = dict.intern_literal("x", Some("en"), Some("http://example.org/dt"));
        assert!(matches!(both, Err(StoreError::InvalidLiteral(_))));
        let empty_tag = dict.intern_literal("x", Some(""), None);
        assert!(matches!(empty_tag, Err(StoreError::InvalidLiteral(_))));

        assert_eq!(count(&conn, "LITERAL"), 0);
        assert_eq!(count(&conn, "RESOURCE"), 0);
    }

    #[test]
    fn test_language_tags_are_normalized() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let upper = dict.intern_literal("v", Some("EN"), None).unwrap();
        assert!(upper.created);
        let term = Literal::new_language_tagged_literal("v", "en").unwrap();
        assert_eq!(dict.intern_literal_term(&term).unwrap(), Interned::existing(upper.id));
        assert_eq!(dict.intern_literal("v", Some("En"), None).unwrap(), Interned::existing(upper.id));

        assert_eq!(dict.literal(upper.id).unwrap(), Some(term));
        assert_eq!(dict.literal_id("v", Some("EN"), None).unwrap(), Some(upper.id));

        let bad = dict.intern_literal("v", Some("not a tag"), None);
        assert!(matches!(bad, Err(StoreError::InvalidLiteral(_))));
        assert!(matches!(
            dict.literal_id("v", Some("not a tag"), None),
            Err(StoreError::InvalidLiteral(_))
        ));
        assert_eq!(count(&conn, "LITERAL"), 1);
    }

    #[test]
    fn test_decode_quad() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let quad = Quad::new(
            BlankNode::new("b1").unwrap().into(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_typed_literal(
                "7",
                NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap(),
            )
            .into(),
            Some(NamedNode::new("http://example.org/g").unwrap()),
        );
        let encoded = dict.intern_quad(&quad).unwrap().id;
        assert_eq!(dict.decode_quad(&encoded).unwrap(), quad);

        let dangling = EncodedQuad {
            predicate: ResourceId(999),
            ..encoded
        };
        assert!(matches!(
            dict.decode_quad(&dangling),
            Err(StoreError::DanglingReference(_))
        ));
    }

    #[test]
    fn test_literal_roundtrip_through_dictionary() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let tagged = Literal::new_language_tagged_literal("chat", "fr").unwrap();
        let id = dict.intern_literal_term(&tagged).unwrap().id;
        assert_eq!(dict.literal(id).unwrap(), Some(tagged.clone()));
        assert_eq!(dict.literal_term_id(&tagged).unwrap(), Some(id));
        assert_eq!(dict.literal(LiteralId(999)).unwrap(), None);
    }

    #[test]
    fn test_intern_quad_reports_new_terms() {
        let (conn, mut cache) = setup();
        let mut dict = TermDictionary::new(&conn, &mut cache);

        let quad = Quad::in_default_graph(
            BlankNode::new("s").unwrap().into(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            NamedNode::new("http://example.org/o").unwrap().into(),
        );
        assert_eq!(dict.encode_quad(&quad).unwrap(), None);

        let first = dict.intern_quad(&quad).unwrap();
        assert!(first.created);
        let second = dict.intern_quad(&quad).unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(dict.encode_quad(&quad).unwrap(), Some(first.id));

        // a new context alone marks the quad as new
        let named = quad.with_graph(Some(NamedNode::new("http://example.org/g").unwrap()));
        let third = dict.intern_quad(&named).unwrap();
        assert!(third.created);
        assert_eq!(third.id.subject, first.id.subject);
    }
}
