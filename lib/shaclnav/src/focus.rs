//! Resolution of shape targets into focus nodes of a data graph.

use crate::store::{GraphStore, QuadPattern};
use crate::targets::ShapeTarget;
use crate::term::identifier;
use crate::vocab::rdf;
use oxrdf::TermRef;
use std::collections::BTreeSet;
use tracing::debug;

/// Computes the focus nodes selected by `targets` in `data`.
///
/// The result is the union over all targets, deduplicated by identifier.
/// Literal objects of a [`ShapeTarget::ObjectsOf`] predicate are never focus nodes.
pub fn find_focus_nodes(data: &impl GraphStore, targets: &[ShapeTarget]) -> BTreeSet<String> {
    let mut focus_nodes = BTreeSet::new();
    for target in targets {
        let before = focus_nodes.len();
        match target {
            ShapeTarget::Node(node) => {
                focus_nodes.insert(identifier(node.as_ref()).to_owned());
            }
            ShapeTarget::Class(class) => {
                add_subjects(
                    &mut focus_nodes,
                    data,
                    QuadPattern::new()
                        .with_predicate(rdf::TYPE)
                        .with_object(class),
                );
            }
            ShapeTarget::ImplicitClass(class) => {
                add_subjects(
                    &mut focus_nodes,
                    data,
                    QuadPattern::new()
                        .with_predicate(rdf::TYPE)
                        .with_object(class),
                );
            }
            ShapeTarget::SubjectsOf(predicate) => {
                add_subjects(
                    &mut focus_nodes,
                    data,
                    QuadPattern::new().with_predicate(predicate),
                );
            }
            ShapeTarget::ObjectsOf(predicate) => {
                focus_nodes.extend(
                    data.quads_matching(QuadPattern::new().with_predicate(predicate))
                        .filter_map(|quad| match quad.object {
                            TermRef::NamedNode(_) | TermRef::BlankNode(_) => {
                                Some(identifier(quad.object).to_owned())
                            }
                            TermRef::Literal(_) => None,
                        }),
                );
            }
        }
        debug!(%target, added = focus_nodes.len() - before, "target resolved");
    }
    focus_nodes
}

fn add_subjects<'a>(
    focus_nodes: &mut BTreeSet<String>,
    data: &'a impl GraphStore,
    pattern: QuadPattern<'a>,
) {
    focus_nodes.extend(
        data.quads_matching(pattern)
            .map(|quad| identifier(quad.subject.into()).to_owned()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Graph, Literal, NamedNode, Triple};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    fn data() -> Graph {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("bob"), rdf::TYPE, ex("Person")));
        graph.insert(&Triple::new(ex("alice"), rdf::TYPE, ex("Person")));
        graph.insert(&Triple::new(ex("bob"), ex("knows"), ex("alice")));
        graph.insert(&Triple::new(
            ex("bob"),
            ex("knows"),
            BlankNode::new_unchecked("someone"),
        ));
        graph.insert(&Triple::new(
            ex("bob"),
            ex("knows"),
            Literal::new_simple_literal("nobody"),
        ));
        graph
    }

    #[test]
    fn test_class_target() {
        assert_eq!(
            find_focus_nodes(&data(), &[ShapeTarget::Class(ex("Person"))]),
            BTreeSet::from([
                "http://example.org/alice".to_owned(),
                "http://example.org/bob".to_owned()
            ])
        );
    }

    #[test]
    fn test_node_target_does_not_need_data() {
        assert_eq!(
            find_focus_nodes(&Graph::new(), &[ShapeTarget::Node(ex("ghost").into())]),
            BTreeSet::from(["http://example.org/ghost".to_owned()])
        );
    }

    #[test]
    fn test_objects_of_skips_literals() {
        let focus_nodes = find_focus_nodes(&data(), &[ShapeTarget::ObjectsOf(ex("knows"))]);
        assert_eq!(
            focus_nodes,
            BTreeSet::from(["http://example.org/alice".to_owned(), "someone".to_owned()])
        );
    }

    #[test]
    fn test_union_is_deduplicated() {
        let focus_nodes = find_focus_nodes(
            &data(),
            &[
                ShapeTarget::Class(ex("Person")),
                ShapeTarget::SubjectsOf(ex("knows")),
                ShapeTarget::Node(ex("bob").into()),
                ShapeTarget::ImplicitClass(ex("Person").into()),
            ],
        );
        assert_eq!(focus_nodes.len(), 2);
    }
}
