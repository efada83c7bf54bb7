//! RDF term model
//!
//! This module provides the values that flow into the quad store:
//! - IRIs, blank nodes and literals (wrapping oxrdf)
//! - Quads with an optional named graph (context)
//! - Single-quad patterns
//! - N-Triples, N-Quads and Turtle parsing
//!
//! # Example
//!
//! ```rust
//! use quadstore::rdf::{Literal, NamedNode, Quad, RdfPredicate};
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let object = Literal::new_language_tagged_literal("Alice", "en").unwrap();
//!
//! let quad = Quad::in_default_graph(subject.into(), predicate, object.into());
//! assert_eq!(
//!     quad.to_string(),
//!     "<http://example.org/alice> <http://xmlns.com/foaf/0.1/name> \"Alice\"@en ."
//! );
//! ```

mod parser;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfObject, RdfPredicate,
    RdfResult, RdfSubject,
};

pub use parser::{file_iri, parse_quads, RdfFormat};
