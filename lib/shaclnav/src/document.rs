//! Parsed RDF documents and the registry that keeps them in sync with their text.
//!
//! A document is always rebuilt from scratch when its text changes: the dataset,
//! the prefix table and the diagnostics are never patched incrementally.

use oxrdf::Dataset;
use oxrdfio::{RdfFormat, RdfParser, RdfSyntaxError};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static SHAPES_HINT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)#\s*shapes:\s*([^\s<>"]+)"#).ok());

/// Namespace prefix bindings declared by a document.
///
/// Bindings keep their declaration order. Rebinding a label replaces its namespace in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `namespace`, returning the previous namespace if any.
    pub fn insert(
        &mut self,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Option<String> {
        let prefix = prefix.into();
        let namespace = namespace.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some(std::mem::replace(existing, namespace))
        } else {
            self.entries.push((prefix, namespace));
            None
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, namespace)| namespace.as_str())
    }

    /// Iterates over `(prefix, namespace)` bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }

    /// All the `prefix:local` forms of `iri`, one per binding whose namespace is a prefix of `iri`.
    pub fn compact_forms<'a>(&'a self, iri: &'a str) -> impl Iterator<Item = String> + 'a {
        self.iter().filter_map(move |(prefix, namespace)| {
            iri.strip_prefix(namespace)
                .map(|local| format!("{prefix}:{local}"))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>, N: Into<String>> FromIterator<(P, N)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (P, N)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (prefix, namespace) in iter {
            map.insert(prefix, namespace);
        }
        map
    }
}

/// A syntax error reported while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub message: String,
    /// Zero-based line of the error, if the parser reported one.
    pub line: Option<u64>,
}

impl ParseDiagnostic {
    fn from_syntax_error(error: &RdfSyntaxError) -> Self {
        Self {
            message: error.to_string(),
            line: error.location().map(|location| location.start.line),
        }
    }

    /// One-based line number as shown to users.
    pub fn display_line(&self) -> u64 {
        self.line.map_or(1, |line| line + 1)
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.display_line(), self.message)
    }
}

/// A text document together with the graph parsed from it.
#[derive(Debug, Clone)]
pub struct RdfDocument {
    location: Url,
    text: String,
    format: RdfFormat,
    dataset: Dataset,
    prefixes: PrefixMap,
    diagnostics: Vec<ParseDiagnostic>,
}

impl RdfDocument {
    /// Parses `text`, guessing the serialization format from the location file extension.
    pub fn parse(location: Url, text: impl Into<String>) -> Self {
        let format = format_from_location(&location).unwrap_or(RdfFormat::Turtle);
        Self::parse_with_format(location, text, format)
    }

    /// Parses `text` in the given format, using the location as base IRI.
    ///
    /// Parsing stops at the first syntax error. The quads read before it are kept.
    pub fn parse_with_format(location: Url, text: impl Into<String>, format: RdfFormat) -> Self {
        let text = text.into();
        let parser = match RdfParser::from_format(format).with_base_iri(location.as_str()) {
            Ok(parser) => parser,
            Err(error) => {
                warn!(%location, %error, "document location is not a valid base IRI");
                RdfParser::from_format(format)
            }
        };
        let mut dataset = Dataset::new();
        let mut diagnostics = Vec::new();
        let mut quads = parser.for_slice(text.as_bytes());
        for result in quads.by_ref() {
            match result {
                Ok(quad) => {
                    dataset.insert(&quad);
                }
                Err(error) => {
                    diagnostics.push(ParseDiagnostic::from_syntax_error(&error));
                    break;
                }
            }
        }
        let prefixes = quads.prefixes().collect::<PrefixMap>();
        debug!(
            %location,
            quads = dataset.len(),
            prefixes = prefixes.len(),
            errors = diagnostics.len(),
            "document parsed"
        );
        Self {
            location,
            text,
            format,
            dataset,
            prefixes,
            diagnostics,
        }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// True if the document parsed without any syntax error.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Looks for a `# shapes: <path>` comment in the first `max_lines` lines.
    ///
    /// The path is resolved against the document location.
    pub fn shapes_hint(&self, max_lines: usize) -> Option<Url> {
        let head = self
            .text
            .lines()
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n");
        let path = SHAPES_HINT.as_ref()?.captures(&head)?.get(1)?.as_str();
        match self.location.join(path) {
            Ok(url) => Some(url),
            Err(error) => {
                debug!(location = %self.location, path, %error, "ignoring unresolvable shapes hint");
                None
            }
        }
    }
}

/// Guesses the serialization format from the file extension of a location.
///
/// `.shacl` and `.shc` files are read as Turtle.
pub fn format_from_location(location: &Url) -> Option<RdfFormat> {
    let file_name = location.path().rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    match extension.as_str() {
        "shacl" | "shc" => Some(RdfFormat::Turtle),
        other => RdfFormat::from_extension(other),
    }
}

/// The set of currently open documents, keyed by location.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: FxHashMap<Url, RdfDocument>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a document. An already open document is kept as is.
    pub fn open(&mut self, location: Url, text: impl Into<String>) -> &RdfDocument {
        self.documents
            .entry(location.clone())
            .or_insert_with(|| RdfDocument::parse(location, text))
    }

    /// Replaces the document content, rebuilding its graph and prefixes from scratch.
    pub fn change(&mut self, location: Url, text: impl Into<String>) -> &RdfDocument {
        let document = RdfDocument::parse(location.clone(), text);
        match self.documents.entry(location) {
            Entry::Occupied(mut entry) => {
                entry.insert(document);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(document),
        }
    }

    /// Forgets a document. Returns false if it was not open.
    pub fn close(&mut self, location: &Url) -> bool {
        self.documents.remove(location).is_some()
    }

    pub fn get(&self, location: &Url) -> Option<&RdfDocument> {
        self.documents.get(location)
    }

    pub fn contains(&self, location: &Url) -> bool {
        self.documents.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
