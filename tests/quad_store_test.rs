//! Integration tests for the quad store
//!
//! Covers idempotent insertion, context handling, literal projections and
//! single-quad pattern matching through the public API.

use quadstore::{
    select_lookup, BlankNode, ContextShape, Literal, NamedNode, ObjectShape, Quad, QuadPattern,
    QuadShape, QuadStore, RdfObject, RdfPredicate, RdfSubject, StoreConfig, StoreError,
    SubjectShape, LOOKUP_STATEMENTS,
};

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn pred(s: &str) -> RdfPredicate {
    RdfPredicate::new(s).unwrap()
}

#[test]
fn test_language_literal_without_context() {
    let store = QuadStore::in_memory().unwrap();
    let quad = Quad::in_default_graph(
        iri("http://a").into(),
        pred("http://p"),
        Literal::new_language_tagged_literal("v", "en").unwrap().into(),
    );

    let shape = QuadShape::new(SubjectShape::Uri, ObjectShape::Literal, ContextShape::Absent);
    let lookup = select_lookup(shape);
    assert_eq!(lookup.param_count, 3);
    assert!(lookup.sql.contains("r.S_URI=?1"));
    assert!(lookup.sql.contains("r.O_LITERAL=?3"));
    assert!(lookup.sql.contains("r.C_URI IS NULL"));

    let (id, inserted) = store.add(&quad).unwrap();
    assert!(inserted);
    assert_eq!(store.lookup(&quad).unwrap(), Some(id));

    let with_context = quad.clone().with_graph(Some(iri("http://g")));
    assert_eq!(store.lookup(&with_context).unwrap(), None);

    // once added, the named-graph version is a separate row
    let (named_id, inserted) = store.add(&with_context).unwrap();
    assert!(inserted);
    assert_ne!(named_id, id);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn test_insert_twice_returns_first_key() {
    let store = QuadStore::in_memory().unwrap();
    let quads = vec![
        Quad::in_default_graph(iri("http://s").into(), pred("http://p"), iri("http://o").into()),
        Quad::in_default_graph(
            BlankNode::new("b").unwrap().into(),
            pred("http://p"),
            BlankNode::new("c").unwrap().into(),
        ),
        Quad::new(
            BlankNode::new("b").unwrap().into(),
            pred("http://p"),
            Literal::new_simple_literal("x").into(),
            Some(iri("http://g")),
        ),
    ];

    for quad in &quads {
        let (first, inserted) = store.add(quad).unwrap();
        assert!(inserted);
        let (second, inserted_again) = store.add(quad).unwrap();
        assert!(!inserted_again);
        assert_eq!(first, second);
    }
    assert_eq!(store.len().unwrap(), 3);
    assert_eq!(store.add_all(&quads).unwrap(), 0);
}

#[test]
fn test_projection_suffixes() {
    let store = QuadStore::in_memory().unwrap();
    let xsd_date = iri("http://www.w3.org/2001/XMLSchema#date");
    let objects: Vec<RdfObject> = vec![
        Literal::new_typed_literal("2024-01-01", xsd_date).into(),
        Literal::new_language_tagged_literal("bonjour", "fr").unwrap().into(),
        Literal::new_simple_literal("plain").into(),
    ];
    for object in objects {
        store
            .add(&Quad::in_default_graph(iri("http://s").into(), pred("http://p"), object))
            .unwrap();
    }

    let rows = store.n3_rows().unwrap();
    assert_eq!(rows.len(), 3);

    assert!(rows[0].object.ends_with("^^<http://www.w3.org/2001/XMLSchema#date>"));
    assert!(!rows[0].object.contains('@'));

    assert!(rows[1].object.ends_with("@fr"));
    assert!(!rows[1].object.contains("^^"));

    assert_eq!(rows[2].object, "\"plain\"");
}

#[test]
fn test_find_matches_filter_semantics() {
    let store = QuadStore::in_memory().unwrap();
    let alice = iri("http://example.org/alice");
    let bob = iri("http://example.org/bob");
    let g1 = iri("http://example.org/g1");
    let g2 = iri("http://example.org/g2");
    let knows = pred("http://xmlns.com/foaf/0.1/knows");
    let age = pred("http://xmlns.com/foaf/0.1/age");
    let xsd_int = iri("http://www.w3.org/2001/XMLSchema#integer");

    let quads = vec![
        Quad::new(alice.clone().into(), knows.clone(), bob.clone().into(), Some(g1.clone())),
        Quad::new(bob.clone().into(), knows.clone(), alice.clone().into(), Some(g2.clone())),
        Quad::in_default_graph(alice.clone().into(), knows.clone(), bob.clone().into()),
        Quad::in_default_graph(
            alice.clone().into(),
            age.clone(),
            Literal::new_typed_literal("30", xsd_int.clone()).into(),
        ),
        Quad::in_default_graph(
            BlankNode::new("x").unwrap().into(),
            age.clone(),
            Literal::new_simple_literal("30").into(),
        ),
    ];
    assert_eq!(store.add_all(&quads).unwrap(), quads.len());

    let patterns = vec![
        QuadPattern::any(),
        QuadPattern::any().with_subject(alice.clone()),
        QuadPattern::any().with_subject(alice.clone()).in_graph(None),
        QuadPattern::any().with_predicate(knows.clone()).in_graph(Some(g1.clone())),
        QuadPattern::any().with_object(alice.clone()),
        QuadPattern::any().with_object(Literal::new_typed_literal("30", xsd_int)),
        QuadPattern::any().with_object(Literal::new_simple_literal("30")),
        QuadPattern::any().with_predicate(age).in_graph(Some(g2.clone())),
        QuadPattern::any().with_subject(BlankNode::new("x").unwrap()),
    ];

    for pattern in &patterns {
        let expected: Vec<Quad> = quads.iter().filter(|q| pattern.matches(q)).cloned().collect();
        assert_eq!(&store.find(pattern).unwrap(), &expected, "pattern {:?}", pattern);
    }
}

#[test]
fn test_invalid_literal_is_rejected_before_storage() {
    let store = QuadStore::in_memory().unwrap();
    assert!(Literal::from_parts("x", Some("en"), Some("http://example.org/dt")).is_err());
    assert_eq!(store.stats().unwrap().literals, 0);
}

#[test]
fn test_reopen_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quads.db");
    let quad = Quad::new(
        iri("http://s").into(),
        pred("http://p"),
        Literal::new_simple_literal("persisted").into(),
        Some(iri("http://g")),
    );

    let id = {
        let store = QuadStore::open_path(&path).unwrap();
        store.add(&quad).unwrap().0
    };

    let config = StoreConfig::from_options(Some(path), "update_index_stats='yes'").unwrap();
    let store = QuadStore::open(config).unwrap();
    assert_eq!(store.lookup(&quad).unwrap(), Some(id));
    assert_eq!(store.get(id).unwrap(), Some(quad));
    assert_eq!(store.contexts().unwrap(), vec![iri("http://g")]);
}

#[test]
fn test_open_missing_store_without_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");
    let config = StoreConfig::from_options(Some(path.clone()), "").unwrap();
    assert!(matches!(QuadStore::open(config), Err(StoreError::Config(_))));
    assert!(!path.exists());
}

#[test]
fn test_every_lookup_statement_runs() {
    let store = QuadStore::in_memory().unwrap();
    let graph = iri("http://g");
    // the context is known before any default-graph lookup tries it
    let seed = Quad::new(
        iri("http://seed").into(),
        pred("http://p"),
        iri("http://o").into(),
        Some(graph.clone()),
    );
    store.add(&seed).unwrap();

    for (i, statement) in LOOKUP_STATEMENTS.iter().enumerate() {
        let shape = statement.shape;
        let subject: RdfSubject = match shape.subject {
            SubjectShape::Uri => iri(&format!("http://s/{}", i)).into(),
            SubjectShape::Blank => BlankNode::new(&format!("s{}", i)).unwrap().into(),
        };
        let object: RdfObject = match shape.object {
            ObjectShape::Uri => iri(&format!("http://o/{}", i)).into(),
            ObjectShape::Blank => BlankNode::new(&format!("o{}", i)).unwrap().into(),
            ObjectShape::Literal => Literal::new_simple_literal(format!("o{}", i)).into(),
        };
        let context = match shape.context {
            ContextShape::Present => Some(graph.clone()),
            ContextShape::Absent => None,
        };
        let quad = Quad::new(subject, pred("http://p"), object, context);

        let (id, inserted) = store.add(&quad).unwrap();
        assert!(inserted, "{:?}", shape);
        assert_eq!(store.lookup(&quad).unwrap(), Some(id), "{:?}", shape);
        assert_eq!(store.get(id).unwrap(), Some(quad.clone()));
        assert_eq!(store.add(&quad).unwrap(), (id, false));

        let other = match shape.context {
            ContextShape::Present => quad.clone().with_graph(None),
            ContextShape::Absent => quad.clone().with_graph(Some(graph.clone())),
        };
        assert_eq!(store.lookup(&other).unwrap(), None, "{:?}", shape);
    }
    assert_eq!(store.len().unwrap(), 1 + LOOKUP_STATEMENTS.len() as u64);
}
