//! Error types.
//!
//! Broken documents, failing validation engines and terms that cannot be located are not errors:
//! they are reported as degraded [`ValidationReport`](crate::ValidationReport)s,
//! empty results or [`LocatorMiss`](crate::LocatorMiss) values.

use std::io;
use std::path::PathBuf;
use url::Url;

/// Main error type of the [`Workbench`](crate::Workbench).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WorkbenchError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A shape identifier is not a valid IRI.
    #[error("Invalid shape IRI '{shape}': {source}")]
    InvalidShapeIri {
        shape: String,
        #[source]
        source: oxrdf::IriParseError,
    },
}

impl WorkbenchError {
    pub fn invalid_shape_iri(shape: impl Into<String>, source: oxrdf::IriParseError) -> Self {
        Self::InvalidShapeIri {
            shape: shape.into(),
            source,
        }
    }
}

/// Error raised when a command refers to a document that cannot be used.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// The document is not open in the workbench.
    #[error("Document {location} is not open")]
    NotOpen { location: Url },

    /// No shapes graph was given and the data document does not point to one.
    #[error("No shapes graph is associated with {location}")]
    NoShapesGraph { location: Url },

    /// The document is not open and could not be read from the file system.
    #[error("Failed to read document {location}: {source}")]
    Unreadable {
        location: Url,
        #[source]
        source: io::Error,
    },
}

impl DocumentError {
    pub fn not_open(location: &Url) -> Self {
        Self::NotOpen {
            location: location.clone(),
        }
    }

    pub fn no_shapes_graph(location: &Url) -> Self {
        Self::NoShapesGraph {
            location: location.clone(),
        }
    }

    pub fn unreadable(location: &Url, source: io::Error) -> Self {
        Self::Unreadable {
            location: location.clone(),
            source,
        }
    }
}

/// Error type of session management and persistence.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No session has the given id.
    #[error("Unknown session '{id}'")]
    UnknownSession { id: String },

    /// The session store file could not be read or written.
    #[error("Failed to access session store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The session store file is not a JSON array of sessions.
    #[error("Invalid session store {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub fn unknown_session(id: impl Into<String>) -> Self {
        Self::UnknownSession { id: id.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Format {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by a [`ValidationEngine`](crate::ValidationEngine).
///
/// It only carries a message: engine failures end up in a degraded report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error raised while serializing a report graph to Turtle.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReportSerializationError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Prefix(#[from] oxrdf::IriParseError),

    #[error(transparent)]
    Encoding(#[from] std::string::FromUtf8Error),
}
