//! N-Triples, N-Quads and Turtle parsing into [`Quad`]s

use super::types::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use crate::error::{StoreError, StoreResult};
use oxiri::Iri;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{NQuadsParser, NTriplesParser, TurtleParser};
use std::io::BufRead;
use std::path::Path;

/// RDF document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// N-Triples format (.nt)
    NTriples,
    /// N-Quads format (.nq)
    NQuads,
    /// Turtle format (.ttl)
    Turtle,
}

impl RdfFormat {
    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "nt" => Some(RdfFormat::NTriples),
            "nq" => Some(RdfFormat::NQuads),
            "ttl" => Some(RdfFormat::Turtle),
            _ => None,
        }
    }

    /// Guess the format from a file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parse an RDF document.
///
/// Statements without a graph name are placed in `default_graph`.
pub fn parse_quads<R: BufRead>(
    reader: R,
    format: RdfFormat,
    base_iri: Option<&str>,
    default_graph: Option<&NamedNode>,
) -> StoreResult<Vec<Quad>> {
    let mut quads = Vec::new();

    match format {
        RdfFormat::NTriples => {
            NTriplesParser::new(reader).parse_all(&mut |t| -> StoreResult<()> {
                quads.push(convert_triple(t, default_graph)?);
                Ok(())
            })?;
        }
        RdfFormat::Turtle => {
            let base = base_iri
                .map(|iri| Iri::parse(iri.to_string()))
                .transpose()
                .map_err(|e| StoreError::Parse(format!("invalid base IRI: {}", e)))?;
            TurtleParser::new(reader, base).parse_all(&mut |t| -> StoreResult<()> {
                quads.push(convert_triple(t, default_graph)?);
                Ok(())
            })?;
        }
        RdfFormat::NQuads => {
            NQuadsParser::new(reader).parse_all(&mut |q| -> StoreResult<()> {
                let graph = match q.graph_name {
                    Some(rio_api::model::GraphName::NamedNode(n)) => Some(NamedNode::new(n.iri)?),
                    Some(rio_api::model::GraphName::BlankNode(b)) => {
                        return Err(StoreError::Parse(format!(
                            "blank node graph names are not supported: _:{}",
                            b.id
                        )))
                    }
                    None => default_graph.cloned(),
                };
                quads.push(Quad::new(
                    convert_subject(q.subject)?,
                    convert_predicate(q.predicate)?,
                    convert_object(q.object)?,
                    graph,
                ));
                Ok(())
            })?;
        }
    }

    Ok(quads)
}

/// Bytes escaped in a `file:` IRI path; IRI delimiters plus `%` itself
const FILE_PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `file:` IRI of a local file, used as base IRI and default context on import
pub fn file_iri(path: &Path) -> StoreResult<NamedNode> {
    let absolute = std::fs::canonicalize(path)?;
    let mut path = absolute.to_string_lossy().replace('\\', "/");
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    let iri = format!("file://{}", utf8_percent_encode(&path, FILE_PATH_ESCAPES));
    Ok(NamedNode::new(&iri)?)
}

fn convert_triple(t: rio_api::model::Triple, graph: Option<&NamedNode>) -> StoreResult<Quad> {
    Ok(Quad::new(
        convert_subject(t.subject)?,
        convert_predicate(t.predicate)?,
        convert_object(t.object)?,
        graph.cloned(),
    ))
}

fn convert_subject(s: rio_api::model::Subject) -> StoreResult<RdfSubject> {
    match s {
        rio_api::model::Subject::NamedNode(n) => Ok(RdfSubject::NamedNode(NamedNode::new(n.iri)?)),
        rio_api::model::Subject::BlankNode(b) => Ok(RdfSubject::BlankNode(BlankNode::new(b.id)?)),
        _ => Err(StoreError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_predicate(p: rio_api::model::NamedNode) -> StoreResult<RdfPredicate> {
    Ok(RdfPredicate::new(p.iri)?)
}

fn convert_object(o: rio_api::model::Term) -> StoreResult<RdfObject> {
    match o {
        rio_api::model::Term::NamedNode(n) => Ok(RdfObject::NamedNode(NamedNode::new(n.iri)?)),
        rio_api::model::Term::BlankNode(b) => Ok(RdfObject::BlankNode(BlankNode::new(b.id)?)),
        rio_api::model::Term::Literal(l) => {
            let literal = match l {
                rio_api::model::Literal::Simple { value } => Literal::new_simple_literal(value),
                rio_api::model::Literal::LanguageTaggedString { value, language } => {
                    Literal::new_language_tagged_literal(value, language)?
                }
                rio_api::model::Literal::Typed { value, datatype } => {
                    Literal::new_typed_literal(value, NamedNode::new(datatype.iri)?)
                }
            };
            Ok(RdfObject::Literal(literal))
        }
        _ => Err(StoreError::Parse("Unsupported object type".to_string())),
    }
}
