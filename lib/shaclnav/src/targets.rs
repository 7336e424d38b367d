//! Extraction of SHACL target declarations from a shapes graph.

use crate::store::{GraphStore, QuadPattern};
use crate::term::RenderedTerm;
use crate::vocab::{rdf, rdfs, shacl};
use oxrdf::{NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef};
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Target declaration selecting the focus nodes of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeTarget {
    /// `sh:targetNode`: the node itself, even if the data graph does not mention it.
    Node(Term),
    /// `sh:targetClass`: all instances of the class.
    Class(NamedNode),
    /// `sh:targetSubjectsOf`: all subjects of triples with the predicate.
    SubjectsOf(NamedNode),
    /// `sh:targetObjectsOf`: all IRI and blank node objects of triples with the predicate.
    ObjectsOf(NamedNode),
    /// The shape is itself an `rdfs:Class` and has no explicit target.
    ImplicitClass(NamedOrBlankNode),
}

impl ShapeTarget {
    /// Stable name of the target kind, as used in serialized output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Class(_) => "class",
            Self::SubjectsOf(_) => "subjectsOf",
            Self::ObjectsOf(_) => "objectsOf",
            Self::ImplicitClass(_) => "implicitClass",
        }
    }

    /// The term the target declaration points to.
    pub fn value(&self) -> TermRef<'_> {
        match self {
            Self::Node(node) => node.as_ref(),
            Self::Class(iri) | Self::SubjectsOf(iri) | Self::ObjectsOf(iri) => iri.as_ref().into(),
            Self::ImplicitClass(shape) => shape.as_ref().into(),
        }
    }
}

impl fmt::Display for ShapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.value())
    }
}

impl Serialize for ShapeTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Target {
            kind: &'static str,
            value: RenderedTerm,
        }
        Target {
            kind: self.kind(),
            value: RenderedTerm::from(self.value()),
        }
        .serialize(serializer)
    }
}

/// Returns the targets declared by `shape`.
///
/// Targets come grouped by kind: class targets, then node, subjects-of and objects-of targets.
/// If there is none and the shape is an `rdfs:Class`, a single [`ShapeTarget::ImplicitClass`] is returned.
/// A shape without any target yields an empty vector.
///
/// Each distinct target value is returned once, even if the same triple appears in several
/// graphs of a dataset. `sh:targetClass`, `sh:targetSubjectsOf` and `sh:targetObjectsOf` values
/// that are not IRIs select nothing and are skipped.
pub fn extract_targets<'a>(
    shapes: &impl GraphStore,
    shape: impl Into<NamedOrBlankNodeRef<'a>>,
) -> Vec<ShapeTarget> {
    let shape = shape.into();
    let mut targets = Vec::new();
    let mut push = |target: ShapeTarget| {
        if !targets.contains(&target) {
            targets.push(target);
        }
    };
    for class in iri_objects(shapes, shape, shacl::TARGET_CLASS) {
        push(ShapeTarget::Class(class));
    }
    for node in objects(shapes, shape, shacl::TARGET_NODE) {
        push(ShapeTarget::Node(node.into_owned()));
    }
    for predicate in iri_objects(shapes, shape, shacl::TARGET_SUBJECTS_OF) {
        push(ShapeTarget::SubjectsOf(predicate));
    }
    for predicate in iri_objects(shapes, shape, shacl::TARGET_OBJECTS_OF) {
        push(ShapeTarget::ObjectsOf(predicate));
    }

    if targets.is_empty()
        && shapes.contains_matching(
            QuadPattern::new()
                .with_subject(shape)
                .with_predicate(rdf::TYPE)
                .with_object(rdfs::CLASS),
        )
    {
        targets.push(ShapeTarget::ImplicitClass(shape.into_owned()));
    }
    debug!(shape = %shape, targets = targets.len(), "shape targets extracted");
    targets
}

/// Lists the subjects typed `sh:NodeShape`, without duplicates.
pub fn find_node_shapes(shapes: &impl GraphStore) -> Vec<NamedOrBlankNode> {
    let mut seen = FxHashSet::default();
    shapes
        .quads_matching(
            QuadPattern::new()
                .with_predicate(rdf::TYPE)
                .with_object(shacl::NODE_SHAPE),
        )
        .map(|quad| quad.subject.into_owned())
        .filter(|shape| seen.insert(shape.clone()))
        .collect()
}

/// Checks if `shape` declares at least one property shape with `sh:property`.
pub fn has_property_shapes<'a>(
    shapes: &impl GraphStore,
    shape: impl Into<NamedOrBlankNodeRef<'a>>,
) -> bool {
    shapes.contains_matching(
        QuadPattern::new()
            .with_subject(shape)
            .with_predicate(shacl::PROPERTY),
    )
}

fn objects<'a>(
    store: &'a impl GraphStore,
    subject: NamedOrBlankNodeRef<'a>,
    predicate: NamedNodeRef<'a>,
) -> impl Iterator<Item = TermRef<'a>> + 'a {
    store
        .quads_matching(
            QuadPattern::new()
                .with_subject(subject)
                .with_predicate(predicate),
        )
        .map(|quad| quad.object)
}

fn iri_objects<'a>(
    store: &'a impl GraphStore,
    subject: NamedOrBlankNodeRef<'a>,
    predicate: NamedNodeRef<'a>,
) -> impl Iterator<Item = NamedNode> + 'a {
    objects(store, subject, predicate).filter_map(move |object| match object {
        TermRef::NamedNode(iri) => Some(iri.into_owned()),
        TermRef::BlankNode(_) | TermRef::Literal(_) => {
            debug!(%subject, %predicate, %object, "ignoring target that is not an IRI");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Dataset, Graph, GraphName, Literal, Quad, Triple};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn test_targets_are_grouped_by_kind() {
        let shape = ex("S");
        let mut graph = Graph::new();
        graph.insert(&Triple::new(shape.clone(), shacl::TARGET_OBJECTS_OF, ex("knows")));
        graph.insert(&Triple::new(shape.clone(), shacl::TARGET_NODE, ex("alice")));
        graph.insert(&Triple::new(shape.clone(), shacl::TARGET_CLASS, ex("Person")));
        graph.insert(&Triple::new(shape.clone(), shacl::TARGET_SUBJECTS_OF, ex("name")));
        assert_eq!(
            extract_targets(&graph, &shape),
            [
                ShapeTarget::Class(ex("Person")),
                ShapeTarget::Node(ex("alice").into()),
                ShapeTarget::SubjectsOf(ex("name")),
                ShapeTarget::ObjectsOf(ex("knows")),
            ]
        );
    }

    #[test]
    fn test_targets_are_distinct_iris() {
        let shape = ex("S");
        let mut dataset = Dataset::new();
        for graph in [ex("g1"), ex("g2")] {
            dataset.insert(&Quad::new(
                shape.clone(),
                shacl::TARGET_CLASS,
                ex("Person"),
                graph,
            ));
        }
        dataset.insert(&Quad::new(
            shape.clone(),
            shacl::TARGET_SUBJECTS_OF,
            Literal::new_simple_literal("name"),
            GraphName::DefaultGraph,
        ));
        dataset.insert(&Quad::new(
            shape.clone(),
            shacl::TARGET_OBJECTS_OF,
            BlankNode::new_unchecked("p"),
            GraphName::DefaultGraph,
        ));
        assert_eq!(
            extract_targets(&dataset, &shape),
            [ShapeTarget::Class(ex("Person"))]
        );
    }

    #[test]
    fn test_explicit_targets_disable_implicit_class() {
        let shape = ex("S");
        let mut graph = Graph::new();
        graph.insert(&Triple::new(shape.clone(), rdf::TYPE, rdfs::CLASS));
        graph.insert(&Triple::new(shape.clone(), shacl::TARGET_NODE, ex("alice")));
        assert_eq!(
            extract_targets(&graph, &shape),
            [ShapeTarget::Node(ex("alice").into())]
        );
    }

    #[test]
    fn test_node_target_may_be_a_literal() {
        let shape = ex("S");
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            shape.clone(),
            shacl::TARGET_NODE,
            Literal::new_simple_literal("x"),
        ));
        graph.insert(&Triple::new(
            shape.clone(),
            shacl::TARGET_CLASS,
            Literal::new_simple_literal("NotAClass"),
        ));
        assert_eq!(
            extract_targets(&graph, &shape),
            [ShapeTarget::Node(Literal::new_simple_literal("x").into())]
        );
    }

    #[test]
    fn test_unreferenced_shape_has_no_target() {
        let shape = ex("S");
        let mut graph = Graph::new();
        graph.insert(&Triple::new(shape.clone(), rdf::TYPE, shacl::NODE_SHAPE));
        assert!(extract_targets(&graph, &shape).is_empty());
        assert!(extract_targets(&Graph::new(), &shape).is_empty());
    }

    #[test]
    fn test_find_node_shapes_and_property_shapes() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("A"), rdf::TYPE, shacl::NODE_SHAPE));
        graph.insert(&Triple::new(ex("B"), rdf::TYPE, shacl::NODE_SHAPE));
        graph.insert(&Triple::new(ex("B"), shacl::PROPERTY, ex("p")));
        graph.insert(&Triple::new(ex("C"), rdf::TYPE, rdfs::CLASS));
        let mut shapes = find_node_shapes(&graph);
        shapes.sort_by_key(ToString::to_string);
        assert_eq!(shapes, [ex("A").into(), ex("B").into()]);
        assert!(!has_property_shapes(&graph, &ex("A")));
        assert!(has_property_shapes(&graph, &ex("B")));
    }

    #[test]
    fn test_serialize_target() {
        let json = serde_json::to_value(ShapeTarget::Class(ex("Person"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "class",
                "value": {"termType": "NamedNode", "value": "http://example.org/Person"}
            })
        );
    }
}
