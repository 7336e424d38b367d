//! Command dispatch over open documents, sessions and a validation engine.

use crate::document::{DocumentRegistry, ParseDiagnostic, RdfDocument};
use crate::engine::ValidationEngine;
use crate::error::{DocumentError, EngineError, SessionError, WorkbenchError};
use crate::focus::find_focus_nodes;
use crate::locator::{DEFAULT_SHAPE_LOOKAHEAD, TermKindHint, TextLocator, TextRange};
use crate::overview::{ShapeSummary, shape_overview};
use crate::report::{DocumentRole, ValidationReport};
use crate::session::{SessionRegistry, ValidationSession};
use crate::targets::{ShapeTarget, extract_targets};
use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use tracing::{debug, info, warn};
use url::Url;

/// Number of leading lines of a data document scanned for a `# shapes: <path>` comment.
pub const DEFAULT_SHAPES_HINT_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbenchOptions {
    /// Lines after a shape identifier searched for its `sh:NodeShape` type assertion.
    pub shape_lookahead: usize,
    pub shapes_hint_lines: usize,
}

impl Default for WorkbenchOptions {
    fn default() -> Self {
        Self {
            shape_lookahead: DEFAULT_SHAPE_LOOKAHEAD,
            shapes_hint_lines: DEFAULT_SHAPES_HINT_LINES,
        }
    }
}

/// A request of the presentation layer.
///
/// Commands deserialize from JSON objects tagged by a `command` field,
/// e.g. `{"command": "runValidation", "id": "1700000000000"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    OpenDocument {
        location: Url,
        text: String,
    },
    ChangeDocument {
        location: Url,
        text: String,
    },
    CloseDocument {
        location: Url,
    },
    CreateSession {
        data_graph: Url,
        shapes_graph: Url,
        #[serde(default)]
        name: Option<String>,
    },
    RenameSession {
        id: String,
        name: String,
    },
    DeleteSession {
        id: String,
    },
    ReplaceDataGraph {
        id: String,
        location: Url,
    },
    ReplaceShapesGraph {
        id: String,
        location: Url,
    },
    RunValidation {
        id: String,
    },
    /// Validates a data document against `shapes`, or against the shapes graph its header points to.
    ValidateDocuments {
        data: Url,
        #[serde(default)]
        shapes: Option<Url>,
    },
    ViewSessionReport {
        id: String,
    },
    JumpTo {
        term: String,
        #[serde(default)]
        kind: TermKindHint,
        location: Url,
    },
    ShapeOverview {
        shapes: Url,
        #[serde(default)]
        data: Option<Url>,
    },
    FocusNodesForShape {
        shape: String,
        shapes: Url,
        data: Url,
    },
}

/// The result of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    Document {
        location: Url,
        quads: usize,
        diagnostics: Vec<ParseDiagnostic>,
    },
    DocumentClosed {
        location: Url,
        was_open: bool,
    },
    Session {
        session: ValidationSession,
    },
    SessionDeleted {
        session: ValidationSession,
    },
    Report {
        report: ValidationReport,
    },
    /// The session was never validated.
    NoReport {
        id: String,
    },
    Located {
        location: Url,
        candidate: String,
        range: TextRange,
    },
    NotFound {
        location: Url,
        term: String,
        candidates: Vec<String>,
    },
    Overview {
        shapes: Vec<ShapeSummary>,
    },
    FocusNodes {
        shape: String,
        targets: Vec<ShapeTarget>,
        focus_nodes: BTreeSet<String>,
        /// Occurrences of the focus nodes in the data document.
        ranges: Vec<TextRange>,
    },
}

/// Owns the open documents, the validation sessions and the validation engine.
///
/// Commands referring to a `file:` location that is not open read it from disk first.
pub struct Workbench {
    documents: DocumentRegistry,
    sessions: SessionRegistry,
    engine: Box<dyn ValidationEngine>,
    options: WorkbenchOptions,
}

impl Workbench {
    pub fn new(sessions: SessionRegistry, engine: impl ValidationEngine + 'static) -> Self {
        Self {
            documents: DocumentRegistry::new(),
            sessions,
            engine: Box::new(engine),
            options: WorkbenchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: WorkbenchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> WorkbenchOptions {
        self.options
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome, WorkbenchError> {
        debug!(?command, "executing command");
        Ok(match command {
            Command::OpenDocument { location, text } => {
                document_outcome(self.documents.open(location, text))
            }
            Command::ChangeDocument { location, text } => {
                document_outcome(self.documents.change(location, text))
            }
            Command::CloseDocument { location } => {
                let was_open = self.documents.close(&location);
                Outcome::DocumentClosed { location, was_open }
            }
            Command::CreateSession {
                data_graph,
                shapes_graph,
                name,
            } => Outcome::Session {
                session: self.sessions.create(data_graph, shapes_graph, name)?.clone(),
            },
            Command::RenameSession { id, name } => Outcome::Session {
                session: self.sessions.rename(&id, name)?.clone(),
            },
            Command::DeleteSession { id } => Outcome::SessionDeleted {
                session: self.sessions.delete(&id)?,
            },
            Command::ReplaceDataGraph { id, location } => Outcome::Session {
                session: self.sessions.replace_data_graph(&id, location)?.clone(),
            },
            Command::ReplaceShapesGraph { id, location } => Outcome::Session {
                session: self.sessions.replace_shapes_graph(&id, location)?.clone(),
            },
            Command::RunValidation { id } => Outcome::Report {
                report: self.run_session(&id)?,
            },
            Command::ValidateDocuments { data, shapes } => Outcome::Report {
                report: self.validate_documents(&data, shapes.as_ref())?,
            },
            Command::ViewSessionReport { id } => {
                let session = self
                    .sessions
                    .get(&id)
                    .ok_or_else(|| SessionError::unknown_session(&id))?;
                match session.last_report() {
                    Some(report) => Outcome::Report {
                        report: report.clone(),
                    },
                    None => Outcome::NoReport { id },
                }
            }
            Command::JumpTo {
                term,
                kind,
                location,
            } => self.jump_to(&term, kind, location)?,
            Command::ShapeOverview { shapes, data } => Outcome::Overview {
                shapes: self.shape_overview(&shapes, data.as_ref())?,
            },
            Command::FocusNodesForShape { shape, shapes, data } => {
                self.focus_nodes_for_shape(shape, &shapes, &data)?
            }
        })
    }

    /// Validates the graphs of a session and records the report in it.
    ///
    /// Unreadable documents produce a failed report instead of an error.
    pub fn run_session(&mut self, id: &str) -> Result<ValidationReport, WorkbenchError> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::unknown_session(id))?;
        let data = session.data_graph_uri().clone();
        let shapes = session.shapes_graph_uri().clone();
        info!(id, %data, %shapes, "running session validation");
        let report = match self.validate_documents(&data, Some(&shapes)) {
            Ok(report) => report,
            Err(WorkbenchError::Document(error)) => ValidationReport::engine_failure(
                &EngineError::new(error.to_string()),
                data.as_str(),
                shapes.as_str(),
            ),
            Err(error) => return Err(error),
        };
        self.sessions.record_report(id, report.clone())?;
        Ok(report)
    }

    /// Validates a data document against a shapes document.
    ///
    /// Without `shapes`, the `# shapes: <path>` header comment of the data document is used.
    /// Documents with syntax errors and engine failures yield failed reports.
    pub fn validate_documents(
        &mut self,
        data: &Url,
        shapes: Option<&Url>,
    ) -> Result<ValidationReport, WorkbenchError> {
        self.load(data)?;
        let data_document = self.document(data)?;
        if !data_document.is_valid() {
            return Ok(ValidationReport::parse_failure(
                DocumentRole::Data,
                data_document.diagnostics(),
                data.as_str(),
                shapes.map_or("", Url::as_str),
            ));
        }
        let shapes = match shapes {
            Some(shapes) => shapes.clone(),
            None => {
                let hint = data_document
                    .shapes_hint(self.options.shapes_hint_lines)
                    .ok_or_else(|| DocumentError::no_shapes_graph(data))?;
                debug!(%data, shapes = %hint, "shapes graph taken from the document header");
                hint
            }
        };
        self.load(&shapes)?;
        let data_document = self.document(data)?;
        let shapes_document = self.document(&shapes)?;
        if !shapes_document.is_valid() {
            return Ok(ValidationReport::parse_failure(
                DocumentRole::Shapes,
                shapes_document.diagnostics(),
                data.as_str(),
                shapes.as_str(),
            ));
        }
        Ok(self.run_engine(data_document, shapes_document))
    }

    /// Finds `term` in the document at `location`.
    pub fn jump_to(
        &mut self,
        term: &str,
        kind: TermKindHint,
        location: Url,
    ) -> Result<Outcome, WorkbenchError> {
        let document = self.load(&location)?;
        Ok(
            match TextLocator::new(document.text(), document.prefixes()).lookup(term, kind) {
                Ok(located) => Outcome::Located {
                    location,
                    candidate: located.candidate,
                    range: located.range,
                },
                Err(miss) => {
                    info!(%location, %miss, "term not found");
                    Outcome::NotFound {
                        location,
                        term: miss.term,
                        candidates: miss.candidates,
                    }
                }
            },
        )
    }

    pub fn shape_overview(
        &mut self,
        shapes: &Url,
        data: Option<&Url>,
    ) -> Result<Vec<ShapeSummary>, WorkbenchError> {
        self.load(shapes)?;
        if let Some(data) = data {
            self.load(data)?;
        }
        let data = data.map(|data| self.document(data)).transpose()?;
        Ok(shape_overview(
            self.document(shapes)?,
            data,
            self.options.shape_lookahead,
        ))
    }

    /// The focus nodes of a shape and where they occur in the data document.
    pub fn focus_nodes_for_shape(
        &mut self,
        shape: String,
        shapes: &Url,
        data: &Url,
    ) -> Result<Outcome, WorkbenchError> {
        let shape_node = NamedNode::new(shape.as_str())
            .map_err(|e| WorkbenchError::invalid_shape_iri(shape.as_str(), e))?;
        self.load(shapes)?;
        self.load(data)?;
        let shapes_document = self.document(shapes)?;
        let data_document = self.document(data)?;
        let targets = extract_targets(shapes_document.dataset(), shape_node.as_ref());
        let focus_nodes = find_focus_nodes(data_document.dataset(), &targets);
        let locator = TextLocator::new(data_document.text(), data_document.prefixes());
        let mut ranges = focus_nodes
            .iter()
            .flat_map(|node| {
                // Identifiers without a scheme are blank node labels or literal values.
                let hint = if node.contains(':') {
                    TermKindHint::Unknown
                } else {
                    TermKindHint::BlankNode
                };
                locator.locate_all(node, hint)
            })
            .collect::<Vec<_>>();
        ranges.sort_unstable();
        ranges.dedup();
        debug!(%shape, focus_nodes = focus_nodes.len(), occurrences = ranges.len(), "focus nodes resolved");
        Ok(Outcome::FocusNodes {
            shape,
            targets,
            focus_nodes,
            ranges,
        })
    }

    fn run_engine(&self, data: &RdfDocument, shapes: &RdfDocument) -> ValidationReport {
        info!(data = %data.location(), shapes = %shapes.location(), "validating");
        match self.engine.validate(shapes.dataset(), data.dataset()) {
            Ok(raw) => {
                let report =
                    ValidationReport::project(&raw, data.location().as_str(), shapes.location().as_str());
                match raw.to_turtle() {
                    Ok(turtle) => report.with_raw_turtle(turtle),
                    Err(error) => {
                        warn!(%error, "failed to serialize the engine report");
                        report
                    }
                }
            }
            Err(error) => ValidationReport::engine_failure(
                &error,
                data.location().as_str(),
                shapes.location().as_str(),
            ),
        }
    }

    /// Opens a `file:` document from disk if it is not open yet.
    fn load(&mut self, location: &Url) -> Result<&RdfDocument, WorkbenchError> {
        if !self.documents.contains(location) {
            let path = location
                .to_file_path()
                .map_err(|()| DocumentError::not_open(location))?;
            let text = fs::read_to_string(&path)
                .map_err(|e| DocumentError::unreadable(location, e))?;
            debug!(%location, "document loaded from disk");
            return Ok(self.documents.open(location.clone(), text));
        }
        self.document(location)
    }

    fn document(&self, location: &Url) -> Result<&RdfDocument, WorkbenchError> {
        self.documents
            .get(location)
            .ok_or_else(|| DocumentError::not_open(location).into())
    }
}

fn document_outcome(document: &RdfDocument) -> Outcome {
    Outcome::Document {
        location: document.location().clone(),
        quads: document.dataset().len(),
        diagnostics: document.diagnostics().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RawValidationReport, RawValidationResult, ResultMessage};
    use oxrdf::{Dataset, Literal};

    const SHAPES: &str = "@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .
ex:PersonShape a sh:NodeShape ;
    sh:targetClass ex:Person .
";

    const DATA: &str = "# shapes: shapes.ttl
@prefix ex: <http://example.org/> .
ex:bob a ex:Person .
ex:alice a ex:Person .
";

    fn url(name: &str) -> Url {
        Url::parse(&format!("file:///nonexistent/{name}")).unwrap()
    }

    fn violation_engine(_: &Dataset, data: &Dataset) -> Result<RawValidationReport, EngineError> {
        Ok(RawValidationReport {
            conforms: false,
            results: vec![RawValidationResult {
                message: ResultMessage::Single(
                    Literal::new_simple_literal(format!("{} quads", data.len())).into(),
                ),
                focus_node: Some(NamedNode::new_unchecked("http://example.org/bob").into()),
                ..RawValidationResult::default()
            }],
        })
    }

    fn workbench() -> Workbench {
        let mut workbench = Workbench::new(SessionRegistry::in_memory(), violation_engine);
        workbench
            .execute(Command::OpenDocument {
                location: url("shapes.ttl"),
                text: SHAPES.into(),
            })
            .unwrap();
        workbench
            .execute(Command::OpenDocument {
                location: url("data.ttl"),
                text: DATA.into(),
            })
            .unwrap();
        workbench
    }

    #[test]
    fn test_validate_with_shapes_hint() {
        let mut workbench = workbench();
        let Outcome::Report { report } = workbench
            .execute(Command::ValidateDocuments {
                data: url("data.ttl"),
                shapes: None,
            })
            .unwrap()
        else {
            unreachable!("expected a report")
        };
        assert!(!report.conforms());
        assert_eq!(report.shapes_document_uri(), "file:///nonexistent/shapes.ttl");
        assert_eq!(report.results()[0].message, ["2 quads"]);
        assert!(report.raw_turtle().is_some());
    }

    #[test]
    fn test_validate_without_shapes_graph() {
        let mut workbench = workbench();
        workbench
            .execute(Command::ChangeDocument {
                location: url("data.ttl"),
                text: "@prefix ex: <http://example.org/> .\nex:bob a ex:Person .\n".into(),
            })
            .unwrap();
        let error = workbench
            .validate_documents(&url("data.ttl"), None)
            .unwrap_err();
        assert!(matches!(
            error,
            WorkbenchError::Document(DocumentError::NoShapesGraph { .. })
        ));
    }

    #[test]
    fn test_session_validation_of_broken_data() {
        let mut workbench = workbench();
        let Outcome::Session { session } = workbench
            .execute(Command::CreateSession {
                data_graph: url("data.ttl"),
                shapes_graph: url("shapes.ttl"),
                name: None,
            })
            .unwrap()
        else {
            unreachable!("expected a session")
        };
        assert_eq!(session.name(), "Session 1 (data.ttl vs shapes.ttl)");
        workbench
            .execute(Command::ChangeDocument {
                location: url("data.ttl"),
                text: "@prefix ex: <http://example.org/> .\nex:bob a\n".into(),
            })
            .unwrap();
        let report = workbench.run_session(session.id()).unwrap();
        assert!(!report.conforms());
        assert_eq!(
            report.results()[0].severity.as_ref().map(|s| s.value.as_str()),
            Some("Error (Parser)")
        );
        let viewed = workbench
            .execute(Command::ViewSessionReport {
                id: session.id().into(),
            })
            .unwrap();
        assert_eq!(viewed, Outcome::Report { report });
    }

    #[test]
    fn test_session_validation_of_missing_file() {
        let mut workbench = Workbench::new(SessionRegistry::in_memory(), violation_engine);
        let id = workbench
            .sessions
            .create(url("missing.ttl"), url("shapes.ttl"), None)
            .unwrap()
            .id()
            .to_owned();
        let report = workbench.run_session(&id).unwrap();
        assert!(!report.conforms());
        assert!(
            report.results()[0].message[0].starts_with("Validation process error: Failed to read document")
        );
    }

    #[test]
    fn test_engine_failure() {
        let mut workbench = Workbench::new(
            SessionRegistry::in_memory(),
            |_: &Dataset, _: &Dataset| -> Result<RawValidationReport, EngineError> {
                Err(EngineError::new("boom"))
            },
        );
        for (name, text) in [("shapes.ttl", SHAPES), ("data.ttl", DATA)] {
            workbench.documents.open(url(name), text);
        }
        let report = workbench
            .validate_documents(&url("data.ttl"), Some(&url("shapes.ttl")))
            .unwrap();
        assert_eq!(report.results()[0].message, ["Validation process error: boom"]);
    }

    #[test]
    fn test_view_report_before_validation() {
        let mut workbench = workbench();
        let id = workbench
            .sessions
            .create(url("data.ttl"), url("shapes.ttl"), Some("mine".into()))
            .unwrap()
            .id()
            .to_owned();
        assert_eq!(
            workbench
                .execute(Command::ViewSessionReport { id: id.clone() })
                .unwrap(),
            Outcome::NoReport { id }
        );
    }

    #[test]
    fn test_jump_to() {
        let mut workbench = workbench();
        let Outcome::Located { range, candidate, .. } = workbench
            .jump_to("http://example.org/alice", TermKindHint::NamedNode, url("data.ttl"))
            .unwrap()
        else {
            unreachable!("expected a location")
        };
        assert_eq!(candidate, "ex:alice");
        assert_eq!(range.start.line, 3);
        let Outcome::NotFound { candidates, .. } = workbench
            .jump_to("http://example.org/carol", TermKindHint::NamedNode, url("data.ttl"))
            .unwrap()
        else {
            unreachable!("expected a miss")
        };
        assert!(candidates.contains(&"ex:carol".to_owned()));
    }

    #[test]
    fn test_focus_nodes_for_shape() {
        let mut workbench = workbench();
        let Outcome::FocusNodes {
            focus_nodes, ranges, ..
        } = workbench
            .focus_nodes_for_shape(
                "http://example.org/PersonShape".into(),
                &url("shapes.ttl"),
                &url("data.ttl"),
            )
            .unwrap()
        else {
            unreachable!("expected focus nodes")
        };
        assert_eq!(focus_nodes.len(), 2);
        assert_eq!(
            ranges.iter().map(|range| range.start.line).collect::<Vec<_>>(),
            [2, 3]
        );
    }

    #[test]
    fn test_focus_nodes_for_blank_node_objects() {
        let mut workbench = Workbench::new(SessionRegistry::in_memory(), violation_engine);
        workbench.documents.open(
            url("shapes.ttl"),
            "@prefix sh: <http://www.w3.org/ns/shacl#> .\n@prefix ex: <http://example.org/> .\nex:KnownShape a sh:NodeShape ;\n    sh:targetObjectsOf ex:knows .\n",
        );
        workbench.documents.open(
            url("data.ttl"),
            "@prefix ex: <http://example.org/> .\nex:a ex:knows _:someone .\n",
        );
        let Outcome::FocusNodes {
            focus_nodes, ranges, ..
        } = workbench
            .focus_nodes_for_shape(
                "http://example.org/KnownShape".into(),
                &url("shapes.ttl"),
                &url("data.ttl"),
            )
            .unwrap()
        else {
            unreachable!("expected focus nodes")
        };
        assert_eq!(focus_nodes.into_iter().collect::<Vec<_>>(), ["someone"]);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start.line, 1);
        assert_eq!(ranges[0].start.column, 14);
    }

    #[test]
    fn test_failed_run_replaces_previous_report() {
        let mut workbench = workbench();
        let id = workbench
            .sessions
            .create(url("data.ttl"), url("shapes.ttl"), None)
            .unwrap()
            .id()
            .to_owned();
        let first = workbench.run_session(&id).unwrap();
        assert_eq!(first.results()[0].message, ["2 quads"]);

        workbench
            .execute(Command::ChangeDocument {
                location: url("shapes.ttl"),
                text: "@prefix sh: <http://www.w3.org/ns/shacl#> .\nex:PersonShape a\n".into(),
            })
            .unwrap();
        let Outcome::Report { report } = workbench
            .execute(Command::RunValidation { id: id.clone() })
            .unwrap()
        else {
            unreachable!("expected a report")
        };
        assert!(!report.conforms());
        assert_eq!(
            report.results()[0].severity.as_ref().map(|s| s.value.as_str()),
            Some("Error (Parser)")
        );
        let Outcome::Report { report: viewed } = workbench
            .execute(Command::ViewSessionReport { id: id.clone() })
            .unwrap()
        else {
            unreachable!("expected a report")
        };
        assert_eq!(viewed, report);
        assert_ne!(viewed, first);

        workbench.engine = Box::new(
            |_: &Dataset, _: &Dataset| -> Result<RawValidationReport, EngineError> {
                Err(EngineError::new("boom"))
            },
        );
        workbench
            .execute(Command::ChangeDocument {
                location: url("shapes.ttl"),
                text: SHAPES.into(),
            })
            .unwrap();
        workbench.run_session(&id).unwrap();
        let Outcome::Report { report: viewed } = workbench
            .execute(Command::ViewSessionReport { id })
            .unwrap()
        else {
            unreachable!("expected a report")
        };
        assert_eq!(viewed.results()[0].message, ["Validation process error: boom"]);
    }

    #[test]
    fn test_invalid_shape_iri() {
        let mut workbench = workbench();
        assert!(matches!(
            workbench.focus_nodes_for_shape("not an iri".into(), &url("shapes.ttl"), &url("data.ttl")),
            Err(WorkbenchError::InvalidShapeIri { .. })
        ));
    }

    #[test]
    fn test_command_from_json() {
        let command = serde_json::from_str::<Command>(
            r#"{"command": "jumpTo", "term": "http://example.org/bob", "kind": "NamedNode", "location": "file:///w/data.ttl"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::JumpTo {
                term: "http://example.org/bob".into(),
                kind: TermKindHint::NamedNode,
                location: Url::parse("file:///w/data.ttl").unwrap(),
            }
        );
    }

    #[test]
    fn test_close_document() {
        let mut workbench = workbench();
        assert_eq!(
            workbench
                .execute(Command::CloseDocument {
                    location: url("data.ttl")
                })
                .unwrap(),
            Outcome::DocumentClosed {
                location: url("data.ttl"),
                was_open: true
            }
        );
        assert_eq!(workbench.documents().len(), 1);
    }
}
