//! Per-shape summary of a shapes document: targets, focus nodes and where the shape is declared.

use crate::document::RdfDocument;
use crate::focus::find_focus_nodes;
use crate::locator::{TextLocator, TextRange};
use crate::targets::{ShapeTarget, extract_targets, find_node_shapes, has_property_shapes};
use oxrdf::NamedOrBlankNode;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Title of a shape summary when no data graph is selected.
pub const NO_DATA_GRAPH_TITLE: &str = "Select data graph to show focus nodes";

/// What is known about one node shape of a shapes document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeSummary {
    pub shape: String,
    pub targets: Vec<ShapeTarget>,
    /// Unset when no data graph was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_nodes: Option<BTreeSet<String>>,
    pub has_property_shapes: bool,
    /// Where the shape is declared in the shapes document.
    pub range: TextRange,
    pub title: String,
}

/// Summarizes the node shapes of `shapes` against the optional `data` document.
///
/// Only shapes whose declaration can be located in the text are returned, in text order.
/// With a data document, shapes without targets are skipped. Documents that do not parse yield nothing.
pub fn shape_overview(
    shapes: &RdfDocument,
    data: Option<&RdfDocument>,
    lookahead: usize,
) -> Vec<ShapeSummary> {
    if !shapes.is_valid() || data.is_some_and(|data| !data.is_valid()) {
        debug!(shapes = %shapes.location(), "no shape overview for documents with syntax errors");
        return Vec::new();
    }
    let locator = TextLocator::new(shapes.text(), shapes.prefixes());
    let mut summaries = Vec::new();
    for shape in find_node_shapes(shapes.dataset()) {
        let NamedOrBlankNode::NamedNode(shape_iri) = &shape else {
            debug!(%shape, "blank node shapes have no declaration to show");
            continue;
        };
        let targets = extract_targets(shapes.dataset(), &shape);
        if data.is_some() && targets.is_empty() {
            debug!(%shape, "shape without targets");
            continue;
        }
        let Some(range) = locator.find_shape_declaration(shape_iri.as_str(), lookahead) else {
            warn!(%shape, shapes = %shapes.location(), "could not locate shape declaration");
            continue;
        };
        let has_property_shapes = has_property_shapes(shapes.dataset(), &shape);
        let focus_nodes = data.map(|data| find_focus_nodes(data.dataset(), &targets));
        let title = match &focus_nodes {
            None => NO_DATA_GRAPH_TITLE.to_owned(),
            Some(focus_nodes) if has_property_shapes => {
                format!("{} focus node(s) with property constraints", focus_nodes.len())
            }
            Some(focus_nodes) => format!("{} focus node(s)", focus_nodes.len()),
        };
        summaries.push(ShapeSummary {
            shape: shape_iri.as_str().to_owned(),
            targets,
            focus_nodes,
            has_property_shapes,
            range,
            title,
        });
    }
    summaries.sort_by_key(|summary| summary.range.start);
    summaries
}
