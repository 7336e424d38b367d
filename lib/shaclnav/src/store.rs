//! Pattern-matched quad lookup over in-memory RDF graphs.

use oxrdf::{
    Dataset, Graph, GraphNameRef, NamedNodeRef, NamedOrBlankNodeRef, QuadRef, TermRef,
};

/// A quad pattern: every `None` position matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadPattern<'a> {
    pub subject: Option<NamedOrBlankNodeRef<'a>>,
    pub predicate: Option<NamedNodeRef<'a>>,
    pub object: Option<TermRef<'a>>,
    pub graph_name: Option<GraphNameRef<'a>>,
}

impl<'a> QuadPattern<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<NamedOrBlankNodeRef<'a>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<NamedNodeRef<'a>>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    #[must_use]
    pub fn with_object(mut self, object: impl Into<TermRef<'a>>) -> Self {
        self.object = Some(object.into());
        self
    }

    #[must_use]
    pub fn with_graph_name(mut self, graph_name: impl Into<GraphNameRef<'a>>) -> Self {
        self.graph_name = Some(graph_name.into());
        self
    }

    /// Checks if the quad is matched by this pattern.
    pub fn matches(&self, quad: QuadRef<'_>) -> bool {
        self.subject.is_none_or(|s| s == quad.subject)
            && self.predicate.is_none_or(|p| p == quad.predicate)
            && self.object.is_none_or(|o| o == quad.object)
            && self.graph_name.is_none_or(|g| g == quad.graph_name)
    }
}

/// Read access to a set of quads through pattern matching.
///
/// All the graph-algorithmic parts of this crate are written against this trait
/// so they work the same on a parsed document [`Dataset`] and on a plain [`Graph`].
pub trait GraphStore {
    /// Returns all quads matched by `pattern`, in no particular order.
    fn quads_matching<'a>(
        &'a self,
        pattern: QuadPattern<'a>,
    ) -> Box<dyn Iterator<Item = QuadRef<'a>> + 'a>;

    /// Checks if at least one quad is matched by `pattern`.
    fn contains_matching<'a>(&'a self, pattern: QuadPattern<'a>) -> bool {
        self.quads_matching(pattern).next().is_some()
    }
}

impl GraphStore for Dataset {
    fn quads_matching<'a>(
        &'a self,
        pattern: QuadPattern<'a>,
    ) -> Box<dyn Iterator<Item = QuadRef<'a>> + 'a> {
        // Start from the most selective index available, then filter on the rest of the pattern
        let candidates: Box<dyn Iterator<Item = QuadRef<'a>> + 'a> =
            if let Some(subject) = pattern.subject {
                Box::new(self.quads_for_subject(subject))
            } else if let Some(object) = pattern.object {
                Box::new(self.quads_for_object(object))
            } else if let Some(predicate) = pattern.predicate {
                Box::new(self.quads_for_predicate(predicate))
            } else if let Some(graph_name) = pattern.graph_name {
                Box::new(self.quads_for_graph_name(graph_name))
            } else {
                Box::new(self.iter())
            };
        Box::new(candidates.filter(move |quad| pattern.matches(*quad)))
    }
}

impl GraphStore for Graph {
    fn quads_matching<'a>(
        &'a self,
        pattern: QuadPattern<'a>,
    ) -> Box<dyn Iterator<Item = QuadRef<'a>> + 'a> {
        if pattern
            .graph_name
            .is_some_and(|graph_name| !graph_name.is_default_graph())
        {
            return Box::new(std::iter::empty());
        }
        let candidates: Box<dyn Iterator<Item = oxrdf::TripleRef<'a>> + 'a> =
            if let Some(subject) = pattern.subject {
                Box::new(self.triples_for_subject(subject))
            } else if let Some(object) = pattern.object {
                Box::new(self.triples_for_object(object))
            } else if let Some(predicate) = pattern.predicate {
                Box::new(self.triples_for_predicate(predicate))
            } else {
                Box::new(self.iter())
            };
        Box::new(
            candidates
                .map(|triple| triple.in_graph(GraphNameRef::DefaultGraph))
                .filter(move |quad| pattern.matches(*quad)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::rdf;
    use oxrdf::{Literal, NamedNode, Quad, Triple};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn test_dataset_pattern_on_every_position() {
        let mut dataset = Dataset::new();
        let graph = ex("g");
        dataset.insert(&Quad::new(ex("bob"), rdf::TYPE, ex("Person"), graph.clone()));
        dataset.insert(&Quad::new(
            ex("bob"),
            ex("name"),
            Literal::new_simple_literal("Bob"),
            oxrdf::GraphName::DefaultGraph,
        ));
        dataset.insert(&Quad::new(
            ex("alice"),
            rdf::TYPE,
            ex("Person"),
            oxrdf::GraphName::DefaultGraph,
        ));

        let bob = ex("bob");
        let person = ex("Person");
        assert_eq!(
            dataset
                .quads_matching(QuadPattern::new().with_subject(&bob))
                .count(),
            2
        );
        assert_eq!(
            dataset
                .quads_matching(
                    QuadPattern::new()
                        .with_predicate(rdf::TYPE)
                        .with_object(&person)
                )
                .count(),
            2
        );
        assert_eq!(
            dataset
                .quads_matching(QuadPattern::new().with_graph_name(&graph))
                .count(),
            1
        );
        assert_eq!(dataset.quads_matching(QuadPattern::new()).count(), 3);
    }

    #[test]
    fn test_graph_only_has_default_graph() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("bob"), rdf::TYPE, ex("Person")));
        let other = ex("g");
        assert!(graph.contains_matching(QuadPattern::new().with_predicate(rdf::TYPE)));
        assert!(graph.contains_matching(
            QuadPattern::new().with_graph_name(GraphNameRef::DefaultGraph)
        ));
        assert!(!graph.contains_matching(QuadPattern::new().with_graph_name(&other)));
    }
}
