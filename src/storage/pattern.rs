//! Single-quad pattern matching with wildcards
//!
//! Each position of a [`QuadPattern`] is either bound or a wildcard. Bound
//! terms are resolved through the dictionary first; a term that was never
//! interned cannot occur in any quad, so the match is empty without touching
//! the quad table. The remaining keys filter `QUAD` by indexed columns.
//!
//! Subject {URI, blank, any} x predicate {bound, any} x object {URI, blank,
//! literal, any} x context {named, default, any} gives 72 shapes. The SQL text
//! depends only on the shape, so the connection's statement cache holds one
//! prepared statement per shape in use.

use super::dictionary::TermDictionary;
use super::dispatch::{ObjectShape, SubjectShape};
use super::keys::{ObjectKey, ResourceId, SubjectKey};
use super::views::{StatementRow, STATEMENT_COLUMNS};
use crate::error::StoreResult;
use crate::rdf::QuadPattern;
use rusqlite::{params_from_iter, Connection};

/// Context restriction of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextFilter {
    Named(ResourceId),
    Default,
    Any,
}

/// Shape of [`ContextFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextMatch {
    Named,
    Default,
    Any,
}

/// Which positions of a pattern are bound, and to what kind of term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternShape {
    pub subject: Option<SubjectShape>,
    pub predicate: bool,
    pub object: Option<ObjectShape>,
    pub context: ContextMatch,
}

impl PatternShape {
    /// Every pattern shape
    pub fn all() -> Vec<PatternShape> {
        let mut shapes = Vec::with_capacity(72);
        for subject in [Some(SubjectShape::Uri), Some(SubjectShape::Blank), None] {
            for predicate in [true, false] {
                for object in [
                    Some(ObjectShape::Uri),
                    Some(ObjectShape::Blank),
                    Some(ObjectShape::Literal),
                    None,
                ] {
                    for context in [ContextMatch::Named, ContextMatch::Default, ContextMatch::Any] {
                        shapes.push(PatternShape {
                            subject,
                            predicate,
                            object,
                            context,
                        });
                    }
                }
            }
        }
        shapes
    }

    /// Number of bound parameters
    pub fn param_count(&self) -> usize {
        [
            self.subject.is_some(),
            self.predicate,
            self.object.is_some(),
            self.context == ContextMatch::Named,
        ]
        .iter()
        .filter(|bound| **bound)
        .count()
    }

    /// SQL selecting the matching statements, parameters in
    /// subject, predicate, object, context order
    pub fn sql(&self) -> String {
        let mut clauses = Vec::new();
        let mut next = 1;
        let mut bind = |column: &str| {
            let clause = format!("q.{}=?{}", column, next);
            next += 1;
            clause
        };

        match self.subject {
            Some(SubjectShape::Uri) => clauses.push(bind("S_URI")),
            Some(SubjectShape::Blank) => clauses.push(bind("S_BLANK")),
            None => {}
        }
        if self.predicate {
            clauses.push(bind("P_URI"));
        }
        match self.object {
            Some(ObjectShape::Uri) => clauses.push(bind("O_URI")),
            Some(ObjectShape::Blank) => clauses.push(bind("O_BLANK")),
            Some(ObjectShape::Literal) => clauses.push(bind("O_LITERAL")),
            None => {}
        }
        match self.context {
            ContextMatch::Named => clauses.push(bind("C_URI")),
            ContextMatch::Default => clauses.push("q.C_URI IS NULL".to_string()),
            ContextMatch::Any => {}
        }

        if clauses.is_empty() {
            format!("SELECT {} FROM STATEMENTS ORDER BY statement_id", STATEMENT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM STATEMENTS WHERE statement_id IN \
                 (SELECT q.ID FROM QUAD q WHERE {}) ORDER BY statement_id",
                STATEMENT_COLUMNS,
                clauses.join(" AND ")
            )
        }
    }
}

/// A pattern whose bound terms have been resolved to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedPattern {
    pub subject: Option<SubjectKey>,
    pub predicate: Option<ResourceId>,
    pub object: Option<ObjectKey>,
    pub context: ContextFilter,
}

impl EncodedPattern {
    /// Resolve a pattern; `None` when a bound term is not in the dictionary
    pub fn resolve(dict: &mut TermDictionary<'_>, pattern: &QuadPattern) -> StoreResult<Option<Self>> {
        let subject = match &pattern.subject {
            Some(s) => match dict.subject_key(s)? {
                Some(key) => Some(key),
                None => return Ok(None),
            },
            None => None,
        };
        let predicate = match &pattern.predicate {
            Some(p) => match dict.resource_id(p.as_str())? {
                Some(id) => Some(id),
                None => return Ok(None),
            },
            None => None,
        };
        let object = match &pattern.object {
            Some(o) => match dict.object_key(o)? {
                Some(key) => Some(key),
                None => return Ok(None),
            },
            None => None,
        };
        let context = match &pattern.graph {
            Some(Some(graph)) => match dict.resource_id(graph.as_str())? {
                Some(id) => ContextFilter::Named(id),
                None => return Ok(None),
            },
            Some(None) => ContextFilter::Default,
            None => ContextFilter::Any,
        };

        Ok(Some(Self {
            subject,
            predicate,
            object,
            context,
        }))
    }

    pub fn shape(&self) -> PatternShape {
        PatternShape {
            subject: self.subject.map(|s| s.shape()),
            predicate: self.predicate.is_some(),
            object: self.object.map(|o| o.shape()),
            context: match self.context {
                ContextFilter::Named(_) => ContextMatch::Named,
                ContextFilter::Default => ContextMatch::Default,
                ContextFilter::Any => ContextMatch::Any,
            },
        }
    }

    /// Bound keys in placeholder order
    pub fn params(&self) -> Vec<i64> {
        let mut params = Vec::with_capacity(4);
        if let Some(subject) = self.subject {
            params.push(match subject {
                SubjectKey::Resource(id) => id.as_i64(),
                SubjectKey::Bnode(id) => id.as_i64(),
            });
        }
        if let Some(predicate) = self.predicate {
            params.push(predicate.as_i64());
        }
        if let Some(object) = self.object {
            params.push(match object {
                ObjectKey::Resource(id) => id.as_i64(),
                ObjectKey::Bnode(id) => id.as_i64(),
                ObjectKey::Literal(id) => id.as_i64(),
            });
        }
        if let ContextFilter::Named(id) = self.context {
            params.push(id.as_i64());
        }
        params
    }
}

/// Statements matching a resolved pattern, in insertion order
pub fn find_rows(conn: &Connection, pattern: &EncodedPattern) -> StoreResult<Vec<StatementRow>> {
    let sql = pattern.shape().sql();
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(pattern.params()), StatementRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfPredicate};
    use crate::storage::dictionary::ResourceCache;
    use crate::storage::quads::QuadTable;
    use crate::storage::schema;
    use std::collections::HashSet;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::apply_pragmas(&conn, &StoreConfig::default()).unwrap();
        schema::create_schema(&conn).unwrap();
        conn
    }

    fn sample() -> Vec<Quad> {
        let alice = NamedNode::new("http://example.org/alice").unwrap();
        let bob = NamedNode::new("http://example.org/bob").unwrap();
        let knows = RdfPredicate::new("http://xmlns.com/foaf/0.1/knows").unwrap();
        let name = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
        let graph = NamedNode::new("http://example.org/g").unwrap();
        vec![
            Quad::in_default_graph(alice.clone().into(), knows.clone(), bob.clone().into()),
            Quad::new(alice.clone().into(), knows.clone(), bob.clone().into(), Some(graph.clone())),
            Quad::in_default_graph(
                alice.clone().into(),
                name.clone(),
                Literal::new_language_tagged_literal("Alice", "en").unwrap().into(),
            ),
            Quad::new(
                BlankNode::new("anon").unwrap().into(),
                knows,
                alice.into(),
                Some(graph),
            ),
            Quad::in_default_graph(bob.into(), name, Literal::new_simple_literal("Bob").into()),
        ]
    }

    fn load(conn: &Connection, cache: &mut ResourceCache, quads: &[Quad]) {
        for quad in quads {
            let encoded = TermDictionary::new(conn, cache).intern_quad(quad).unwrap().id;
            QuadTable::new(conn).insert(&encoded).unwrap();
        }
    }

    fn find(conn: &Connection, cache: &mut ResourceCache, pattern: &QuadPattern) -> Vec<Quad> {
        let mut dict = TermDictionary::new(conn, cache);
        match EncodedPattern::resolve(&mut dict, pattern).unwrap() {
            Some(encoded) => find_rows(conn, &encoded)
                .unwrap()
                .iter()
                .map(|row| row.to_quad().unwrap())
                .collect(),
            None => Vec::new(),
        }
    }

    #[test]
    fn test_every_shape_has_distinct_sql() {
        let shapes = PatternShape::all();
        assert_eq!(shapes.len(), 72);
        let sql: HashSet<String> = shapes.iter().map(|s| s.sql()).collect();
        assert_eq!(sql.len(), 72);
        for shape in shapes {
            assert_eq!(shape.sql().matches('?').count(), shape.param_count());
        }
    }

    #[test]
    fn test_find_agrees_with_pattern_matching() {
        let conn = setup();
        let mut cache = ResourceCache::new(32);
        let quads = sample();
        load(&conn, &mut cache, &quads);

        let alice = NamedNode::new("http://example.org/alice").unwrap();
        let knows = RdfPredicate::new("http://xmlns.com/foaf/0.1/knows").unwrap();
        let graph = NamedNode::new("http://example.org/g").unwrap();
        let patterns = vec![
            QuadPattern::any(),
            QuadPattern::any().with_subject(alice.clone()),
            QuadPattern::any().with_predicate(knows.clone()),
            QuadPattern::any().with_object(alice.clone()),
            QuadPattern::any().in_graph(None),
            QuadPattern::any().in_graph(Some(graph.clone())),
            QuadPattern::any()
                .with_subject(alice.clone())
                .with_predicate(knows)
                .in_graph(Some(graph)),
            QuadPattern::any().with_object(Literal::new_simple_literal("Bob")),
            QuadPattern::any().with_subject(BlankNode::new("anon").unwrap()),
        ];

        for pattern in patterns {
            let expected: Vec<Quad> = quads.iter().filter(|q| pattern.matches(q)).cloned().collect();
            assert_eq!(find(&conn, &mut cache, &pattern), expected, "pattern {:?}", pattern);
        }
    }

    #[test]
    fn test_unknown_terms_match_nothing() {
        let conn = setup();
        let mut cache = ResourceCache::new(32);
        load(&conn, &mut cache, &sample());

        let nobody = NamedNode::new("http://example.org/nobody").unwrap();
        assert!(find(&conn, &mut cache, &QuadPattern::any().with_subject(nobody.clone())).is_empty());
        assert!(find(&conn, &mut cache, &QuadPattern::any().in_graph(Some(nobody))).is_empty());

        // same text, other kind of literal
        let typed = Literal::new_typed_literal(
            "Bob",
            NamedNode::new("http://www.w3.org/2001/XMLSchema#token").unwrap(),
        );
        assert!(find(&conn, &mut cache, &QuadPattern::any().with_object(typed)).is_empty());
    }
}
