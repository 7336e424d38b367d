//! Validation reports.
//!
//! A [`RawValidationReport`] is what a validation engine produces: result records whose fields are RDF terms.
//! It is projected into a [`ValidationReport`], the serializable form shown to users, where every term
//! is a [`RenderedTerm`] and every message a plain string.
//!
//! Projection is total: missing fields stay missing, and documents that do not parse or engines
//! that fail still yield a (non-conforming) report.

use crate::document::ParseDiagnostic;
use crate::error::{EngineError, ReportSerializationError};
use crate::store::{GraphStore, QuadPattern};
use crate::term::{RenderedTerm, identifier};
use crate::vocab::{rdf, shacl, xsd};
use oxrdf::{BlankNode, Graph, Literal, NamedNodeRef, NamedOrBlankNodeRef, Term, TermRef, Triple};
use oxttl::TurtleSerializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Severity level of a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Violation severity (most severe).
    #[default]
    Violation,
    /// Warning severity.
    Warning,
    /// Info severity (least severe).
    Info,
}

impl Severity {
    /// Returns the IRI for this severity level.
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Violation => shacl::VIOLATION,
            Self::Warning => shacl::WARNING,
            Self::Info => shacl::INFO,
        }
    }

    /// Parses a severity from an IRI.
    pub fn from_iri(iri: &str) -> Option<Self> {
        [Self::Violation, Self::Warning, Self::Info]
            .into_iter()
            .find(|severity| severity.iri().as_str() == iri)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Violation => f.write_str("Violation"),
            Self::Warning => f.write_str("Warning"),
            Self::Info => f.write_str("Info"),
        }
    }
}

/// The `message` field of a raw result, as engines deliver it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultMessage {
    /// No message.
    #[default]
    Null,
    /// A single message.
    Single(Term),
    /// A sequence of messages, possibly with null entries.
    Multiple(Vec<Option<Term>>),
}

impl ResultMessage {
    /// Flattens the messages into plain strings, dropping null entries.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Null => Vec::new(),
            Self::Single(message) => vec![identifier(message.as_ref()).to_owned()],
            Self::Multiple(messages) => messages
                .iter()
                .flatten()
                .map(|message| identifier(message.as_ref()).to_owned())
                .collect(),
        }
    }
}

impl From<Vec<Term>> for ResultMessage {
    fn from(mut messages: Vec<Term>) -> Self {
        match messages.len() {
            0 => Self::Null,
            1 => messages.pop().map_or(Self::Null, Self::Single),
            _ => Self::Multiple(messages.into_iter().map(Some).collect()),
        }
    }
}

/// A result record as produced by a validation engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawValidationResult {
    pub message: ResultMessage,
    pub path: Option<Term>,
    pub focus_node: Option<Term>,
    pub severity: Option<Term>,
    pub source_constraint_component: Option<Term>,
    pub source_shape: Option<Term>,
    pub value: Option<Term>,
}

/// A conformance report as produced by a validation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValidationReport {
    pub conforms: bool,
    pub results: Vec<RawValidationResult>,
}

impl Default for RawValidationReport {
    fn default() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
        }
    }
}

impl RawValidationReport {
    /// Reads a report expressed with the standard SHACL report vocabulary.
    ///
    /// Results are the `sh:result` values of the `sh:ValidationReport` node or, if there is no such node,
    /// all the `sh:ValidationResult` instances. `sh:conforms` defaults to the absence of results.
    pub fn from_graph(graph: &impl GraphStore) -> Self {
        let report_node = graph
            .quads_matching(
                QuadPattern::new()
                    .with_predicate(rdf::TYPE)
                    .with_object(shacl::VALIDATION_REPORT),
            )
            .map(|quad| quad.subject)
            .next();
        let result_nodes = if let Some(report_node) = report_node {
            graph
                .quads_matching(
                    QuadPattern::new()
                        .with_subject(report_node)
                        .with_predicate(shacl::RESULT),
                )
                .filter_map(|quad| match quad.object {
                    TermRef::NamedNode(node) => Some(NamedOrBlankNodeRef::from(node)),
                    TermRef::BlankNode(node) => Some(NamedOrBlankNodeRef::from(node)),
                    TermRef::Literal(_) => None,
                })
                .collect::<Vec<_>>()
        } else {
            graph
                .quads_matching(
                    QuadPattern::new()
                        .with_predicate(rdf::TYPE)
                        .with_object(shacl::VALIDATION_RESULT),
                )
                .map(|quad| quad.subject)
                .collect()
        };
        let results = result_nodes
            .into_iter()
            .map(|node| RawValidationResult {
                message: values(graph, node, shacl::RESULT_MESSAGE).into(),
                path: value(graph, node, shacl::RESULT_PATH),
                focus_node: value(graph, node, shacl::FOCUS_NODE),
                severity: value(graph, node, shacl::RESULT_SEVERITY),
                source_constraint_component: value(graph, node, shacl::SOURCE_CONSTRAINT_COMPONENT),
                source_shape: value(graph, node, shacl::SOURCE_SHAPE),
                value: value(graph, node, shacl::VALUE),
            })
            .collect::<Vec<_>>();
        let conforms = report_node
            .and_then(|report_node| value(graph, report_node, shacl::CONFORMS))
            .map_or(results.is_empty(), |conforms| {
                matches!(identifier(conforms.as_ref()), "true" | "1")
            });
        debug!(conforms, results = results.len(), "report graph read");
        Self { conforms, results }
    }

    /// Writes the report with the standard SHACL report vocabulary.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        let report_node = BlankNode::default();
        graph.insert(&Triple::new(
            report_node.clone(),
            rdf::TYPE,
            shacl::VALIDATION_REPORT,
        ));
        graph.insert(&Triple::new(
            report_node.clone(),
            shacl::CONFORMS,
            Literal::new_typed_literal(if self.conforms { "true" } else { "false" }, xsd::BOOLEAN),
        ));
        for result in &self.results {
            let result_node = BlankNode::default();
            graph.insert(&Triple::new(
                report_node.clone(),
                shacl::RESULT,
                result_node.clone(),
            ));
            graph.insert(&Triple::new(
                result_node.clone(),
                rdf::TYPE,
                shacl::VALIDATION_RESULT,
            ));
            let messages = match &result.message {
                ResultMessage::Null => Vec::new(),
                ResultMessage::Single(message) => vec![message.clone()],
                ResultMessage::Multiple(messages) => messages.iter().flatten().cloned().collect(),
            };
            for message in messages {
                graph.insert(&Triple::new(
                    result_node.clone(),
                    shacl::RESULT_MESSAGE,
                    message,
                ));
            }
            for (predicate, term) in [
                (shacl::FOCUS_NODE, &result.focus_node),
                (shacl::RESULT_PATH, &result.path),
                (shacl::VALUE, &result.value),
                (shacl::SOURCE_SHAPE, &result.source_shape),
                (shacl::SOURCE_CONSTRAINT_COMPONENT, &result.source_constraint_component),
                (shacl::RESULT_SEVERITY, &result.severity),
            ] {
                if let Some(term) = term {
                    graph.insert(&Triple::new(result_node.clone(), predicate, term.clone()));
                }
            }
        }
        graph
    }

    /// Serializes [`to_graph`](Self::to_graph) to Turtle with the `sh`, `rdf` and `xsd` prefixes.
    pub fn to_turtle(&self) -> Result<String, ReportSerializationError> {
        let mut serializer = TurtleSerializer::new()
            .with_prefix("sh", shacl::NAMESPACE)?
            .with_prefix("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#")?
            .with_prefix("xsd", "http://www.w3.org/2001/XMLSchema#")?
            .for_writer(Vec::new());
        for triple in &self.to_graph() {
            serializer.serialize_triple(triple)?;
        }
        Ok(String::from_utf8(serializer.finish()?)?)
    }
}

fn values<'a>(
    graph: &'a impl GraphStore,
    subject: NamedOrBlankNodeRef<'a>,
    predicate: NamedNodeRef<'a>,
) -> Vec<Term> {
    graph
        .quads_matching(
            QuadPattern::new()
                .with_subject(subject)
                .with_predicate(predicate),
        )
        .map(|quad| quad.object.into_owned())
        .collect()
}

fn value<'a>(
    graph: &'a impl GraphStore,
    subject: NamedOrBlankNodeRef<'a>,
    predicate: NamedNodeRef<'a>,
) -> Option<Term> {
    graph
        .quads_matching(
            QuadPattern::new()
                .with_subject(subject)
                .with_predicate(predicate),
        )
        .map(|quad| quad.object.into_owned())
        .next()
}

/// A display-ready validation result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub message: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<RenderedTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_node: Option<RenderedTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_shape: Option<RenderedTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<RenderedTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_constraint_component: Option<RenderedTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RenderedTerm>,
}

impl ValidationResult {
    /// A result carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn project(raw: &RawValidationResult) -> Self {
        let render = |term: &Option<Term>| term.as_ref().map(RenderedTerm::from);
        Self {
            message: raw.message.to_strings(),
            severity: render(&raw.severity),
            focus_node: render(&raw.focus_node),
            source_shape: render(&raw.source_shape),
            path: render(&raw.path),
            source_constraint_component: render(&raw.source_constraint_component),
            value: render(&raw.value),
        }
    }

    /// The SHACL severity of the result, if it has a standard one.
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::from_iri(self.severity.as_ref()?.identifier())
    }
}

/// Number of results per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityCounts {
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Results without a standard SHACL severity.
    pub other: usize,
}

/// Which input of a validation a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentRole {
    Data,
    Shapes,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Data => "data",
            Self::Shapes => "shapes",
        })
    }
}

/// A display-ready validation report.
///
/// Reports are built once per validation run and are not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    conforms: bool,
    results: Vec<ValidationResult>,
    data_document_uri: String,
    shapes_document_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_turtle: Option<String>,
}

impl ValidationReport {
    /// Projects an engine report, keeping the engine result order.
    pub fn project(
        raw: &RawValidationReport,
        data_document_uri: impl Into<String>,
        shapes_document_uri: impl Into<String>,
    ) -> Self {
        Self {
            conforms: raw.conforms,
            results: raw.results.iter().map(ValidationResult::project).collect(),
            data_document_uri: data_document_uri.into(),
            shapes_document_uri: shapes_document_uri.into(),
            raw_turtle: None,
        }
    }

    /// The report of a validation that could not run because an input document does not parse.
    ///
    /// There is one result per parser diagnostic.
    pub fn parse_failure(
        role: DocumentRole,
        diagnostics: &[ParseDiagnostic],
        data_document_uri: impl Into<String>,
        shapes_document_uri: impl Into<String>,
    ) -> Self {
        let mut results = diagnostics
            .iter()
            .map(|diagnostic| ValidationResult {
                message: vec![diagnostic.message.clone()],
                severity: Some(RenderedTerm::literal("Error (Parser)")),
                focus_node: Some(RenderedTerm::literal(format!(
                    "Line {}",
                    diagnostic.display_line()
                ))),
                ..ValidationResult::default()
            })
            .collect::<Vec<_>>();
        if results.is_empty() {
            results.push(ValidationResult::from_message(format!(
                "Could not parse {role} document."
            )));
        }
        let report = Self {
            conforms: false,
            results,
            data_document_uri: data_document_uri.into(),
            shapes_document_uri: shapes_document_uri.into(),
            raw_turtle: None,
        };
        warn!(
            %role,
            data = %report.data_document_uri,
            shapes = %report.shapes_document_uri,
            errors = report.results.len(),
            "validation skipped, input document does not parse"
        );
        report
    }

    /// The report of a validation whose engine failed.
    pub fn engine_failure(
        error: &EngineError,
        data_document_uri: impl Into<String>,
        shapes_document_uri: impl Into<String>,
    ) -> Self {
        let report = Self {
            conforms: false,
            results: vec![ValidationResult::from_message(format!(
                "Validation process error: {error}"
            ))],
            data_document_uri: data_document_uri.into(),
            shapes_document_uri: shapes_document_uri.into(),
            raw_turtle: None,
        };
        warn!(
            data = %report.data_document_uri,
            shapes = %report.shapes_document_uri,
            %error,
            "validation engine failed"
        );
        report
    }

    /// Attaches the Turtle serialization of the engine report.
    #[must_use]
    pub fn with_raw_turtle(mut self, raw_turtle: impl Into<String>) -> Self {
        self.raw_turtle = Some(raw_turtle.into());
        self
    }

    pub fn conforms(&self) -> bool {
        self.conforms
    }

    /// The results, in the order the engine produced them.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn data_document_uri(&self) -> &str {
        &self.data_document_uri
    }

    pub fn shapes_document_uri(&self) -> &str {
        &self.shapes_document_uri
    }

    pub fn raw_turtle(&self) -> Option<&str> {
        self.raw_turtle.as_deref()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for result in &self.results {
            match result.severity_level() {
                Some(Severity::Violation) => counts.violations += 1,
                Some(Severity::Warning) => counts.warnings += 1,
                Some(Severity::Info) => counts.infos += 1,
                None => counts.other += 1,
            }
        }
        counts
    }
}
