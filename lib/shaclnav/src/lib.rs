#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod document;
mod engine;
mod error;
mod focus;
mod locator;
mod overview;
mod report;
mod session;
mod store;
mod targets;
mod term;
pub mod vocab;
mod workbench;

pub use document::{DocumentRegistry, ParseDiagnostic, PrefixMap, RdfDocument, format_from_location};
pub use engine::{ReportFileEngine, ValidationEngine};
pub use error::{
    DocumentError, EngineError, ReportSerializationError, SessionError, WorkbenchError,
};
pub use focus::find_focus_nodes;
pub use locator::{
    DEFAULT_SHAPE_LOOKAHEAD, Located, LocatorMiss, TermKindHint, TextLocator, TextPosition,
    TextRange, find_shape_declaration_range, locate,
};
pub use overview::{NO_DATA_GRAPH_TITLE, ShapeSummary, shape_overview};
pub use report::{
    DocumentRole, RawValidationReport, RawValidationResult, ResultMessage, Severity,
    SeverityCounts, ValidationReport, ValidationResult,
};
pub use session::{
    JsonFileSessionStore, MemorySessionStore, SessionRegistry, SessionStore, ValidationSession,
};
pub use store::{GraphStore, QuadPattern};
pub use targets::{ShapeTarget, extract_targets, find_node_shapes, has_property_shapes};
pub use term::{RenderedTerm, TermType, UnknownTermTypeError, local_name};
pub use workbench::{Command, DEFAULT_SHAPES_HINT_LINES, Outcome, Workbench, WorkbenchOptions};
