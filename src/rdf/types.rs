//! RDF terms, quads and quad patterns
//!
//! IRIs, blank nodes and literals wrap their oxrdf counterparts, which do the
//! syntax validation. [`Literal`] is seen the way the dictionary stores it: a
//! lexical value with at most one of a language tag or a datatype. Plain
//! (`xsd:string`) and language-tagged literals therefore report no datatype.

use oxrdf::vocab::xsd;
use std::fmt;
use thiserror::Error;

/// Rejected term
#[derive(Error, Debug)]
pub enum RdfError {
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Invalid blank node: {0}")]
    InvalidBlankNode(String),

    /// Bad language tag, or a language tag combined with a datatype
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

pub type RdfResult<T> = Result<T, RdfError>;

/// IRI term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(oxrdf::NamedNode);

impl NamedNode {
    pub fn new(iri: &str) -> RdfResult<Self> {
        match oxrdf::NamedNode::new(iri) {
            Ok(node) => Ok(NamedNode(node)),
            Err(e) => Err(RdfError::InvalidIri(format!("<{}> {}", iri, e))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        f.write_str(self.0.as_str())?;
        f.write_str(">")
    }
}

/// Blank node, identified by its local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(oxrdf::BlankNode);

impl BlankNode {
    pub fn new(name: &str) -> RdfResult<Self> {
        oxrdf::BlankNode::new(name)
            .map(BlankNode)
            .map_err(|e| RdfError::InvalidBlankNode(format!("_:{} {}", name, e)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("_:")?;
        f.write_str(self.0.as_str())
    }
}

/// Literal term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(oxrdf::Literal);

impl Literal {
    /// Literal with neither language nor datatype
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Literal(oxrdf::Literal::new_simple_literal(value))
    }

    /// Language-tagged literal; the tag is validated and lowercased
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> RdfResult<Self> {
        let language = language.into();
        oxrdf::Literal::new_language_tagged_literal(value, language.as_str())
            .map(Literal)
            .map_err(|e| RdfError::InvalidLiteral(format!("language tag '{}': {}", language, e)))
    }

    /// Validated, lowercased form of a BCP47 language tag
    pub fn normalize_language_tag(tag: &str) -> RdfResult<String> {
        let tagged = Self::new_language_tagged_literal("", tag)?;
        Ok(tagged.language().unwrap_or(tag).to_string())
    }

    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Literal(oxrdf::Literal::new_typed_literal(value, datatype.0))
    }

    /// Rebuild a literal from its dictionary columns.
    ///
    /// Language tag and datatype are mutually exclusive.
    pub fn from_parts(
        value: impl Into<String>,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> RdfResult<Self> {
        match (language, datatype) {
            (None, None) => Ok(Self::new_simple_literal(value)),
            (Some(lang), None) => Self::new_language_tagged_literal(value, lang),
            (None, Some(dt)) => Ok(Self::new_typed_literal(value, NamedNode::new(dt)?)),
            (Some(lang), Some(dt)) => Err(RdfError::InvalidLiteral(format!(
                "both language '{}' and datatype <{}> given",
                lang, dt
            ))),
        }
    }

    /// Lexical form
    pub fn value(&self) -> &str {
        self.0.value()
    }

    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Datatype as stored: `None` for plain and language-tagged literals
    pub fn datatype(&self) -> Option<NamedNode> {
        match self.0.language() {
            Some(_) => None,
            None => {
                let datatype = self.0.datatype();
                (datatype != xsd::STRING).then(|| NamedNode(datatype.into_owned()))
            }
        }
    }
}

/// Lexical form escaped for a quoted N-Triples string
fn escape_lexical(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = escape_lexical(self.value());
        match (self.language(), self.datatype()) {
            (Some(lang), _) => write!(f, "\"{}\"@{}", escaped, lang),
            (None, Some(dt)) => write!(f, "\"{}\"^^{}", escaped, dt),
            (None, None) => write!(f, "\"{}\"", escaped),
        }
    }
}

/// Term in subject position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfSubject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl fmt::Display for RdfSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfSubject::NamedNode(node) => node.fmt(f),
            RdfSubject::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for RdfSubject {
    fn from(node: NamedNode) -> Self {
        RdfSubject::NamedNode(node)
    }
}

impl From<BlankNode> for RdfSubject {
    fn from(node: BlankNode) -> Self {
        RdfSubject::BlankNode(node)
    }
}

/// Term in predicate position: always an IRI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfPredicate(NamedNode);

impl RdfPredicate {
    pub fn new(iri: &str) -> RdfResult<Self> {
        NamedNode::new(iri).map(RdfPredicate)
    }

    pub fn as_named_node(&self) -> &NamedNode {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RdfPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<NamedNode> for RdfPredicate {
    fn from(node: NamedNode) -> Self {
        RdfPredicate(node)
    }
}

/// Term in object position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfObject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl fmt::Display for RdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfObject::NamedNode(node) => node.fmt(f),
            RdfObject::BlankNode(node) => node.fmt(f),
            RdfObject::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<NamedNode> for RdfObject {
    fn from(node: NamedNode) -> Self {
        RdfObject::NamedNode(node)
    }
}

impl From<BlankNode> for RdfObject {
    fn from(node: BlankNode) -> Self {
        RdfObject::BlankNode(node)
    }
}

impl From<Literal> for RdfObject {
    fn from(literal: Literal) -> Self {
        RdfObject::Literal(literal)
    }
}

/// A statement with an optional context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: RdfSubject,
    pub predicate: RdfPredicate,
    pub object: RdfObject,
    /// Context IRI; `None` is the default graph
    pub graph: Option<NamedNode>,
}

impl Quad {
    pub fn new(
        subject: RdfSubject,
        predicate: RdfPredicate,
        object: RdfObject,
        graph: Option<NamedNode>,
    ) -> Self {
        Quad {
            subject,
            predicate,
            object,
            graph,
        }
    }

    pub fn in_default_graph(subject: RdfSubject, predicate: RdfPredicate, object: RdfObject) -> Self {
        Quad::new(subject, predicate, object, None)
    }

    /// The same statement in another context
    pub fn with_graph(self, graph: Option<NamedNode>) -> Self {
        Quad { graph, ..self }
    }
}

/// N-Quads line, without the trailing newline
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {}", graph)?;
        }
        f.write_str(" .")
    }
}

/// Single-quad pattern; `None` in a position matches anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadPattern {
    pub subject: Option<RdfSubject>,
    pub predicate: Option<RdfPredicate>,
    pub object: Option<RdfObject>,
    /// `None` = any context, `Some(None)` = default graph only
    pub graph: Option<Option<NamedNode>>,
}

impl QuadPattern {
    /// Matches every quad
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: impl Into<RdfSubject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<RdfPredicate>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<RdfObject>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Restrict to one context; `None` selects the default graph
    pub fn in_graph(mut self, graph: Option<NamedNode>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// In-memory evaluation of the pattern against one quad
    pub fn matches(&self, quad: &Quad) -> bool {
        fn position<T: PartialEq>(bound: &Option<T>, value: &T) -> bool {
            bound.as_ref().map_or(true, |b| b == value)
        }

        position(&self.subject, &quad.subject)
            && position(&self.predicate, &quad.predicate)
            && position(&self.object, &quad.object)
            && position(&self.graph, &quad.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

    #[test]
    fn test_named_node_validation() {
        let node = NamedNode::new("http://example.org/id/alice").unwrap();
        assert_eq!(node.as_str(), "http://example.org/id/alice");
        assert_eq!(node.to_string(), "<http://example.org/id/alice>");
        assert!(matches!(NamedNode::new("not an iri"), Err(RdfError::InvalidIri(_))));
    }

    #[test]
    fn test_blank_node() {
        let node = BlankNode::new("b1").unwrap();
        assert_eq!(node.as_str(), "b1");
        assert_eq!(node.to_string(), "_:b1");
        assert!(BlankNode::new("has space").is_err());
    }

    #[test]
    fn test_literal_dictionary_view() {
        let plain = Literal::new_simple_literal("Alice");
        assert_eq!((plain.language(), plain.datatype()), (None, None));
        assert_eq!(plain.to_string(), "\"Alice\"");

        let tagged = Literal::new_language_tagged_literal("Alice", "EN").unwrap();
        assert_eq!(tagged.language(), Some("en"));
        assert_eq!(tagged.datatype(), None);
        assert_eq!(tagged.to_string(), "\"Alice\"@en");

        let int = NamedNode::new(XSD_INTEGER).unwrap();
        let typed = Literal::new_typed_literal("42", int.clone());
        assert_eq!(typed.datatype(), Some(int));
        assert_eq!(typed.to_string(), format!("\"42\"^^<{}>", XSD_INTEGER));

        // an explicit xsd:string is the plain literal
        let xsd_string = NamedNode::new("http://www.w3.org/2001/XMLSchema#string").unwrap();
        assert_eq!(Literal::new_typed_literal("Alice", xsd_string), plain);
    }

    #[test]
    fn test_normalize_language_tag() {
        assert_eq!(Literal::normalize_language_tag("en-GB").unwrap(), "en-gb");
        assert!(matches!(
            Literal::normalize_language_tag("not a tag"),
            Err(RdfError::InvalidLiteral(_))
        ));
        assert!(Literal::normalize_language_tag("").is_err());
    }

    #[test]
    fn test_literal_from_parts() {
        assert!(matches!(
            Literal::from_parts("x", Some("en"), Some("http://example.org/dt")),
            Err(RdfError::InvalidLiteral(_))
        ));
        assert!(Literal::from_parts("x", Some(""), None).is_err());

        let typed = Literal::from_parts("x", None, Some("http://example.org/dt")).unwrap();
        assert_eq!(typed.datatype().unwrap().as_str(), "http://example.org/dt");
        assert_eq!(Literal::from_parts("x", None, None).unwrap(), Literal::new_simple_literal("x"));
    }

    #[test]
    fn test_literal_display_escapes() {
        let lit = Literal::new_simple_literal(r#"say "hi" \o/"#);
        assert_eq!(lit.to_string(), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn test_literal_display_escapes_line_breaks() {
        let lit = Literal::new_simple_literal("line1\nline2\r\tend");
        assert_eq!(lit.to_string(), r#""line1\nline2\r\tend""#);
    }

    #[test]
    fn test_quad_display() {
        let quad = Quad::in_default_graph(
            NamedNode::new("http://a").unwrap().into(),
            RdfPredicate::new("http://p").unwrap(),
            BlankNode::new("o").unwrap().into(),
        );
        assert_eq!(quad.to_string(), "<http://a> <http://p> _:o .");

        let named = quad.with_graph(Some(NamedNode::new("http://g").unwrap()));
        assert_eq!(named.to_string(), "<http://a> <http://p> _:o <http://g> .");
    }

    #[test]
    fn test_quad_pattern_matching() {
        let alice = NamedNode::new("http://example.org/id/alice").unwrap();
        let name = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
        let graph = NamedNode::new("http://example.org/contexts/people").unwrap();

        let quad = Quad::new(
            alice.clone().into(),
            name.clone(),
            Literal::new_simple_literal("Alice").into(),
            Some(graph.clone()),
        );

        assert!(QuadPattern::any().matches(&quad));
        assert!(QuadPattern::any().with_subject(alice).with_predicate(name).matches(&quad));
        assert!(QuadPattern::any().in_graph(Some(graph)).matches(&quad));
        assert!(!QuadPattern::any().in_graph(None).matches(&quad));
        assert!(!QuadPattern::any()
            .with_object(Literal::new_simple_literal("Bob"))
            .matches(&quad));
    }
}
