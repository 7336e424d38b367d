//! Resolution of RDF terms to their textual occurrences in a document.
//!
//! Parsed graphs keep no source positions, so a term is located again from its identity:
//! the locator builds a ranked list of the textual forms the term may take in the document
//! (`<iri>`, bare IRI, every prefixed name, local name) and searches them in rank order.
//! A form only matches on token boundaries: it must be preceded by the start of the text,
//! a whitespace, `<` or a quote, and followed by the end of the text, a whitespace or one of `>.,;"`.
//!
//! The first form in rank order having at least one match wins, even if a lower ranked form
//! appears earlier in the text.

use crate::document::PrefixMap;
use crate::term::{TermType, local_name};
use crate::vocab::{rdf, shacl};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Number of lines after a candidate shape identifier searched for its `sh:NodeShape` type assertion.
pub const DEFAULT_SHAPE_LOOKAHEAD: usize = 5;

/// What kind of term a string to locate is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TermKindHint {
    NamedNode,
    BlankNode,
    Literal,
    /// Treated as an IRI if it contains a `:`, searched verbatim otherwise.
    #[default]
    Unknown,
}

impl From<TermType> for TermKindHint {
    fn from(term_type: TermType) -> Self {
        match term_type {
            TermType::NamedNode => Self::NamedNode,
            TermType::BlankNode => Self::BlankNode,
            TermType::Literal => Self::Literal,
            TermType::DefaultGraph => Self::Unknown,
        }
    }
}

impl FromStr for TermKindHint {
    type Err = crate::term::UnknownTermTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s, "Unknown" | "unknown") {
            return Ok(Self::Unknown);
        }
        s.parse::<TermType>().map(Self::from)
    }
}

/// A position in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextPosition {
    /// Zero-based line.
    pub line: usize,
    /// Zero-based column, counted in characters.
    pub column: usize,
    /// Byte offset from the start of the text.
    pub offset: usize,
}

/// A half-open range in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    /// The text covered by the range.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start.offset..self.end.offset]
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line + 1,
            self.start.column + 1,
            self.end.line + 1,
            self.end.column + 1
        )
    }
}

/// A successful lookup: the textual form that matched and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Located {
    pub candidate: String,
    pub range: TextRange,
}

/// A failed lookup, with the textual forms that were tried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not find '{term}' in the document. Tried patterns: {}", .candidates.join(", "))]
pub struct LocatorMiss {
    pub term: String,
    pub candidates: Vec<String>,
}

/// Searches a document text for the occurrences of RDF terms.
///
/// ```
/// use shaclnav::{PrefixMap, TermKindHint, TextLocator};
///
/// let prefixes = [("ex", "http://example.org/")].into_iter().collect::<PrefixMap>();
/// let text = "ex:FooBar a ex:Thing .\nex:Foo a ex:Thing .";
/// let range = TextLocator::new(text, &prefixes)
///     .locate("http://example.org/Foo", TermKindHint::NamedNode)
///     .unwrap();
/// assert_eq!(range.slice(text), "ex:Foo");
/// assert_eq!(range.start.line, 1);
/// ```
#[derive(Debug, Clone)]
pub struct TextLocator<'a> {
    text: &'a str,
    prefixes: &'a PrefixMap,
    line_starts: Vec<usize>,
}

impl<'a> TextLocator<'a> {
    pub fn new(text: &'a str, prefixes: &'a PrefixMap) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            text,
            prefixes,
            line_starts,
        }
    }

    /// The textual forms `term` may take in the document, most specific first.
    pub fn candidates(&self, term: &str, hint: TermKindHint) -> Vec<String> {
        let term = term.trim();
        let unwrapped = term.strip_prefix('<').and_then(|t| t.strip_suffix('>'));
        let mut candidates = Vec::new();
        match hint {
            TermKindHint::NamedNode => self.iri_candidates(unwrapped.unwrap_or(term), &mut candidates),
            TermKindHint::Unknown if unwrapped.is_some() || term.contains(':') => {
                self.iri_candidates(unwrapped.unwrap_or(term), &mut candidates);
            }
            TermKindHint::Unknown => candidates.push(term.to_owned()),
            TermKindHint::BlankNode => {
                let label = term.strip_prefix("_:").unwrap_or(term);
                candidates.push(format!("_:{label}"));
                candidates.push(label.to_owned());
            }
            TermKindHint::Literal => {
                let value = term
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(term);
                candidates.push(format!("\"{value}\""));
                candidates.push(value.to_owned());
            }
        }
        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.is_empty() && !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    fn iri_candidates(&self, iri: &str, candidates: &mut Vec<String>) {
        candidates.push(format!("<{iri}>"));
        candidates.push(iri.to_owned());
        candidates.extend(self.prefixes.compact_forms(iri));
        candidates.push(local_name(iri).to_owned());
    }

    /// Returns the first occurrence of the best ranked textual form of `term` that appears in the text.
    pub fn locate(&self, term: &str, hint: TermKindHint) -> Option<TextRange> {
        self.lookup(term, hint).ok().map(|located| located.range)
    }

    /// Same as [`locate`](Self::locate), but reports the tried forms on a miss.
    pub fn lookup(&self, term: &str, hint: TermKindHint) -> Result<Located, LocatorMiss> {
        let candidates = self.candidates(term, hint);
        for candidate in &candidates {
            if let Some(range) = self.occurrences(candidate).next() {
                debug!(term, %candidate, %range, "term located");
                return Ok(Located {
                    candidate: candidate.clone(),
                    range,
                });
            }
        }
        debug!(term, ?candidates, "term not found");
        Err(LocatorMiss {
            term: term.to_owned(),
            candidates,
        })
    }

    /// Every occurrence of every textual form of `term`, sorted by position.
    pub fn locate_all(&self, term: &str, hint: TermKindHint) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        for candidate in self.candidates(term, hint) {
            for range in self.occurrences(&candidate) {
                if !ranges.contains(&range) {
                    ranges.push(range);
                }
            }
        }
        ranges.sort_by_key(|range| (range.start, range.end.offset));
        ranges
    }

    /// Finds where the node shape `shape_iri` is declared.
    ///
    /// An occurrence of the shape identifier is only accepted if it starts a statement and a
    /// `sh:NodeShape` type assertion follows it within `lookahead` lines, before the end of that
    /// statement.
    pub fn find_shape_declaration(&self, shape_iri: &str, lookahead: usize) -> Option<TextRange> {
        let assertion = match self.node_shape_assertion() {
            Ok(assertion) => assertion,
            Err(error) => {
                warn!(%error, "could not build the node shape assertion pattern");
                return None;
            }
        };
        for candidate in self.candidates(shape_iri, TermKindHint::NamedNode) {
            for range in self.occurrences(&candidate) {
                if !self.starts_statement(range) {
                    continue;
                }
                let window = self.statement_window(range, lookahead);
                if assertion.is_match(window) {
                    debug!(shape = shape_iri, %candidate, %range, "shape declaration located");
                    return Some(range);
                }
            }
        }
        debug!(shape = shape_iri, "shape declaration not found");
        None
    }

    /// Whether only whitespace, comments or a directive separate `range` from the end of the
    /// previous statement.
    fn starts_statement(&self, range: TextRange) -> bool {
        let line_start = self.line_starts.get(range.start.line).copied().unwrap_or(0);
        let before = &self.text[line_start..range.start.offset];
        let before = before.strip_suffix('<').unwrap_or(before).trim();
        if before.starts_with('#') {
            return false;
        }
        if !before.is_empty() {
            return before.ends_with(['.', '{', '}']);
        }
        for line in self.text[..line_start].lines().rev() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let directive = line.split_whitespace().next().is_some_and(|keyword| {
                keyword.eq_ignore_ascii_case("prefix") || keyword.eq_ignore_ascii_case("base")
            });
            return directive || line.ends_with(['.', '{', '}']);
        }
        true
    }

    /// Text following `range` up to `lookahead` more lines, cut at the first statement-ending `.`.
    fn statement_window(&self, range: TextRange, lookahead: usize) -> &'a str {
        let window_end = self
            .line_starts
            .get(range.end.line + lookahead + 1)
            .copied()
            .unwrap_or(self.text.len());
        let window = &self.text[range.end.offset..window_end.max(range.end.offset)];
        let statement_end = window
            .char_indices()
            .find(|(i, c)| {
                *c == '.'
                    && window[i + 1..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace)
            })
            .map_or(window.len(), |(i, _)| i);
        &window[..statement_end]
    }

    fn node_shape_assertion(&self) -> Result<Regex, regex::Error> {
        let mut types = vec!["a".to_owned(), "rdf:type".to_owned(), format!("<{}>", rdf::TYPE.as_str())];
        types.extend(self.prefixes.compact_forms(rdf::TYPE.as_str()));
        let mut classes = vec!["sh:NodeShape".to_owned(), format!("<{}>", shacl::NODE_SHAPE.as_str())];
        classes.extend(self.prefixes.compact_forms(shacl::NODE_SHAPE.as_str()));
        Regex::new(&format!(
            r#"(?:^|[\s;])(?:{})\s+(?:[^\s,;.]+\s*,\s*)*(?:{})(?:$|[\s>.,;"])"#,
            alternation(&types),
            alternation(&classes)
        ))
    }

    /// Boundary-aware occurrences of `candidate`, in text order.
    fn occurrences<'b>(&'b self, candidate: &str) -> impl Iterator<Item = TextRange> + 'b {
        let pattern = format!(
            r#"(?:^|[\s<"'])({})(?:$|[\s>.,;"])"#,
            regex::escape(candidate)
        );
        let regex = match Regex::new(&pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                warn!(candidate, %error, "skipping candidate that cannot be searched");
                None
            }
        };
        let mut start = 0;
        std::iter::from_fn(move || {
            let found = regex.as_ref()?.captures_at(self.text, start)?.get(1)?;
            start = found.end();
            Some(self.range(found.start(), found.end()))
        })
    }

    fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange {
            start: self.position(start),
            end: self.position(end),
        }
    }

    fn position(&self, offset: usize) -> TextPosition {
        let line = self
            .line_starts
            .partition_point(|line_start| *line_start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        TextPosition {
            line,
            column: self.text[line_start..offset].chars().count(),
            offset,
        }
    }
}

fn alternation(forms: &[String]) -> String {
    forms
        .iter()
        .map(|form| regex::escape(form))
        .collect::<Vec<_>>()
        .join("|")
}

/// Locates `term` in `text`, see [`TextLocator::locate`].
pub fn locate(text: &str, prefixes: &PrefixMap, term: &str, hint: TermKindHint) -> Option<TextRange> {
    TextLocator::new(text, prefixes).locate(term, hint)
}

/// Locates the declaration of the node shape `shape_iri` in `text` with the default lookahead window.
pub fn find_shape_declaration_range(
    text: &str,
    prefixes: &PrefixMap,
    shape_iri: &str,
) -> Option<TextRange> {
    TextLocator::new(text, prefixes).find_shape_declaration(shape_iri, DEFAULT_SHAPE_LOOKAHEAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex_prefixes() -> PrefixMap {
        [
            ("ex", "http://example.org/"),
            ("sh", "http://www.w3.org/ns/shacl#"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_prefixed_name_on_token_boundary() {
        let prefixes = ex_prefixes();
        let text = "ex:FooBar a sh:NodeShape .\nex:Foo a sh:NodeShape .";
        let range = locate(text, &prefixes, "http://example.org/Foo", TermKindHint::NamedNode).unwrap();
        assert_eq!(range.slice(text), "ex:Foo");
        assert_eq!(
            range.start,
            TextPosition {
                line: 1,
                column: 0,
                offset: 27
            }
        );
        assert_eq!(range.end.column, 6);
    }

    #[test]
    fn test_better_ranked_form_wins_over_earlier_occurrence() {
        let prefixes = ex_prefixes();
        let text = "ex:Foo ex:p ex:Bar .\n<http://example.org/Foo> a sh:NodeShape .";
        let range = locate(text, &prefixes, "http://example.org/Foo", TermKindHint::NamedNode).unwrap();
        assert_eq!(range.slice(text), "<http://example.org/Foo>");
        assert_eq!(range.start.line, 1);
    }

    #[test]
    fn test_candidates_are_ranked() {
        let prefixes = [
            ("ex", "http://example.org/"),
            ("exns", "http://example.org/ns#"),
        ]
        .into_iter()
        .collect::<PrefixMap>();
        let locator = TextLocator::new("", &prefixes);
        assert_eq!(
            locator.candidates("<http://example.org/ns#Foo>", TermKindHint::Unknown),
            [
                "<http://example.org/ns#Foo>",
                "http://example.org/ns#Foo",
                "ex:ns#Foo",
                "exns:Foo",
                "Foo"
            ]
        );
        assert_eq!(
            locator.candidates("_:b0", TermKindHint::BlankNode),
            ["_:b0", "b0"]
        );
        assert_eq!(
            locator.candidates("Alice", TermKindHint::Literal),
            ["\"Alice\"", "Alice"]
        );
        assert_eq!(locator.candidates("Alice", TermKindHint::Unknown), ["Alice"]);
    }

    #[test]
    fn test_local_name_does_not_match_inside_token() {
        let prefixes = PrefixMap::new();
        let text = "ex:Person a ex:Class .\n# Person is documented here";
        let range = locate(text, &prefixes, "http://example.org/Person", TermKindHint::NamedNode).unwrap();
        assert_eq!(range.start.line, 1);
        assert_eq!(range.start.column, 2);
    }

    #[test]
    fn test_miss_lists_tried_patterns() {
        let prefixes = ex_prefixes();
        let miss = TextLocator::new("nothing here", &prefixes)
            .lookup("http://example.org/Foo", TermKindHint::NamedNode)
            .unwrap_err();
        assert_eq!(
            miss.to_string(),
            "Could not find 'http://example.org/Foo' in the document. Tried patterns: <http://example.org/Foo>, http://example.org/Foo, ex:Foo, Foo"
        );
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let prefixes = PrefixMap::new();
        let text = "<http://example.org/a?b=(c)> a <http://example.org/T> .";
        let range = locate(
            text,
            &prefixes,
            "http://example.org/a?b=(c)",
            TermKindHint::NamedNode,
        )
        .unwrap();
        assert_eq!(range.start.offset, 0);
    }

    #[test]
    fn test_locate_all_finds_adjacent_occurrences() {
        let prefixes = ex_prefixes();
        let text = "ex:a ex:p ex:a, ex:a .";
        let ranges = TextLocator::new(text, &prefixes)
            .locate_all("http://example.org/a", TermKindHint::NamedNode);
        assert_eq!(
            ranges.iter().map(|r| r.start.offset).collect::<Vec<_>>(),
            [0, 10, 16]
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let prefixes = ex_prefixes();
        let text = "ex:\u{e9}t\u{e9} ex:p ex:b .";
        let range = locate(text, &prefixes, "http://example.org/b", TermKindHint::NamedNode).unwrap();
        assert_eq!(range.start.column, 12);
        assert_eq!(range.start.offset, 14);
    }

    #[test]
    fn test_shape_declaration_requires_type_assertion() {
        let prefixes = ex_prefixes();
        let text = "ex:Other sh:node ex:PersonShape .\n\nex:PersonShape\n    sh:targetClass ex:Person ;\n    a sh:NodeShape .";
        let range = find_shape_declaration_range(text, &prefixes, "http://example.org/PersonShape").unwrap();
        assert_eq!(range.start.line, 2);
        assert_eq!(range.slice(text), "ex:PersonShape");
    }

    #[test]
    fn test_shape_declaration_with_full_iris() {
        let prefixes = PrefixMap::new();
        let text = "<http://example.org/S> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/ns/shacl#NodeShape> .";
        assert!(find_shape_declaration_range(text, &prefixes, "http://example.org/S").is_some());
    }

    #[test]
    fn test_shape_declaration_window() {
        let prefixes = ex_prefixes();
        let text = "ex:S\n  ex:p 1 ;\n  ex:p 2 ;\n  a sh:NodeShape .";
        let locator = TextLocator::new(text, &prefixes);
        assert!(locator.find_shape_declaration("http://example.org/S", 3).is_some());
        assert!(locator.find_shape_declaration("http://example.org/S", 2).is_none());
    }

    #[test]
    fn test_shape_declaration_stops_at_statement_end() {
        let prefixes = ex_prefixes();
        let text = "ex:S ex:p ex:o .\nex:T a sh:NodeShape .";
        assert!(find_shape_declaration_range(text, &prefixes, "http://example.org/S").is_none());
    }

    #[test]
    fn test_shape_declaration_with_other_sh_prefix() {
        let prefixes = [
            ("ex", "http://example.org/"),
            ("shacl", "http://www.w3.org/ns/shacl#"),
        ]
        .into_iter()
        .collect::<PrefixMap>();
        let text = "ex:S a ex:Thing, shacl:NodeShape .";
        assert!(find_shape_declaration_range(text, &prefixes, "http://example.org/S").is_some());
    }

    #[test]
    fn test_shape_declaration_skips_object_followed_by_type_assertion() {
        let prefixes = ex_prefixes();
        let text = "ex:PersonShape\n    sh:node ex:AddressShape ;\n    a sh:NodeShape .\n\nex:AddressShape a sh:NodeShape .";
        let range = find_shape_declaration_range(text, &prefixes, "http://example.org/AddressShape").unwrap();
        assert_eq!(range.start.line, 4);
        assert_eq!(range.start.column, 0);
        let range = find_shape_declaration_range(text, &prefixes, "http://example.org/PersonShape").unwrap();
        assert_eq!(range.start.line, 0);
    }

    #[test]
    fn test_shape_declaration_after_comments_and_directives() {
        let prefixes = ex_prefixes();
        let text = "PREFIX ex: <http://example.org/>\n# the shape\nex:S a sh:NodeShape .\nex:A ex:p ex:o . ex:T a sh:NodeShape .";
        let locator = TextLocator::new(text, &prefixes);
        assert_eq!(
            locator.find_shape_declaration("http://example.org/S", 5).unwrap().start.line,
            2
        );
        let range = locator.find_shape_declaration("http://example.org/T", 5).unwrap();
        assert_eq!(range.slice(text), "ex:T");
        assert_eq!(range.start.line, 3);
    }

    #[test]
    fn test_ranges_are_ordered_by_position() {
        let prefixes = ex_prefixes();
        let text = "ex:a ex:p ex:b .\nex:b ex:p ex:a .";
        let locator = TextLocator::new(text, &prefixes);
        let mut ranges = [
            locator.locate("http://example.org/b", TermKindHint::NamedNode).unwrap(),
            locator.locate("http://example.org/a", TermKindHint::NamedNode).unwrap(),
        ];
        ranges.sort_unstable();
        assert_eq!(ranges[0].slice(text), "ex:a");
        assert!(ranges[0] < ranges[1]);
    }

    #[test]
    fn test_hint_from_str() {
        assert_eq!("unknown".parse::<TermKindHint>().unwrap(), TermKindHint::Unknown);
        assert_eq!("Literal".parse::<TermKindHint>().unwrap(), TermKindHint::Literal);
    }
}
