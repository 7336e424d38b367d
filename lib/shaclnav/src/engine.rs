//! The boundary with SHACL validation engines.

use crate::document::RdfDocument;
use crate::error::EngineError;
use crate::report::RawValidationReport;
use oxrdf::Dataset;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Computes the conformance of a data graph with a shapes graph.
///
/// Closures with the same signature as [`validate`](Self::validate) are engines too.
pub trait ValidationEngine {
    fn validate(&self, shapes: &Dataset, data: &Dataset) -> Result<RawValidationReport, EngineError>;
}

impl<F: Fn(&Dataset, &Dataset) -> Result<RawValidationReport, EngineError>> ValidationEngine for F {
    fn validate(&self, shapes: &Dataset, data: &Dataset) -> Result<RawValidationReport, EngineError> {
        self(shapes, data)
    }
}

/// An engine returning the report an external SHACL processor wrote to a file.
///
/// The file may use any RDF serialization recognized from its extension and must use the
/// standard SHACL report vocabulary. The graphs given to [`validate`](ValidationEngine::validate) are ignored.
#[derive(Debug, Clone)]
pub struct ReportFileEngine {
    path: PathBuf,
}

impl ReportFileEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValidationEngine for ReportFileEngine {
    fn validate(&self, _: &Dataset, _: &Dataset) -> Result<RawValidationReport, EngineError> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            EngineError::new(format!("Failed to read report {}: {e}", self.path.display()))
        })?;
        let location = fs::canonicalize(&self.path)
            .ok()
            .and_then(|path| Url::from_file_path(path).ok())
            .ok_or_else(|| {
                EngineError::new(format!("Invalid report location {}", self.path.display()))
            })?;
        let document = RdfDocument::parse(location, text);
        if let Some(diagnostic) = document.diagnostics().first() {
            return Err(EngineError::new(format!(
                "Failed to parse report {}: {diagnostic}",
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), quads = document.dataset().len(), "report file loaded");
        Ok(RawValidationReport::from_graph(document.dataset()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_closure_engine() {
        let engine = |_: &Dataset, _: &Dataset| -> Result<RawValidationReport, EngineError> {
            Err(EngineError::new("no engine"))
        };
        let error = engine.validate(&Dataset::new(), &Dataset::new()).unwrap_err();
        assert_eq!(error.message(), "no engine");
    }

    #[test]
    fn test_report_file_engine() {
        let mut file = tempfile::Builder::new().suffix(".ttl").tempfile().unwrap();
        file.write_all(
            b"@prefix sh: <http://www.w3.org/ns/shacl#> .\n[] a sh:ValidationReport ; sh:conforms true .\n",
        )
        .unwrap();
        let report = ReportFileEngine::new(file.path())
            .validate(&Dataset::new(), &Dataset::new())
            .unwrap();
        assert!(report.conforms);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_report_file_engine_missing_file() {
        let error = ReportFileEngine::new("/nonexistent/report.ttl")
            .validate(&Dataset::new(), &Dataset::new())
            .unwrap_err();
        assert!(error.message().starts_with("Failed to read report"));
    }
}
