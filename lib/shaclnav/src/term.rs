//! Display-ready rendering of RDF terms.
//!
//! A [`RenderedTerm`] keeps the kind, the lexical value and, for literals, the
//! language tag and datatype of an [`oxrdf::Term`]. It is the form in which terms
//! cross the boundary towards the presentation layer and the text locator.

use oxrdf::vocab::xsd;
use oxrdf::{GraphNameRef, NamedNodeRef, TermRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of an RDF term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermType {
    NamedNode,
    BlankNode,
    Literal,
    DefaultGraph,
}

impl TermType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NamedNode => "NamedNode",
            Self::BlankNode => "BlankNode",
            Self::Literal => "Literal",
            Self::DefaultGraph => "DefaultGraph",
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermType {
    type Err = UnknownTermTypeError;

    /// Accepts the RDF/JS names (`NamedNode`...) and their kebab-case spelling (`named-node`...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NamedNode" | "named-node" | "iri" => Ok(Self::NamedNode),
            "BlankNode" | "blank-node" => Ok(Self::BlankNode),
            "Literal" | "literal" => Ok(Self::Literal),
            "DefaultGraph" | "default-graph" => Ok(Self::DefaultGraph),
            _ => Err(UnknownTermTypeError(s.to_owned())),
        }
    }
}

/// Returned by [`TermType::from_str`] for an unknown term kind name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown term type '{0}'")]
pub struct UnknownTermTypeError(String);

/// An RDF term rendered for matching and display.
///
/// Equality is structural: kind, value, language tag and datatype must all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTerm {
    pub term_type: TermType,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Datatype IRI, only set on literals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl RenderedTerm {
    /// Builds an IRI term.
    pub fn named_node(iri: impl Into<String>) -> Self {
        Self {
            term_type: TermType::NamedNode,
            value: iri.into(),
            language: None,
            datatype: None,
        }
    }

    /// Builds a simple literal (datatype `xsd:string`).
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            term_type: TermType::Literal,
            value: value.into(),
            language: None,
            datatype: Some(xsd::STRING.as_str().to_owned()),
        }
    }

    pub fn from_graph_name(graph_name: GraphNameRef<'_>) -> Self {
        match graph_name {
            GraphNameRef::NamedNode(node) => Self::named_node(node.as_str()),
            GraphNameRef::BlankNode(node) => Self::from(TermRef::from(node)),
            GraphNameRef::DefaultGraph => Self {
                term_type: TermType::DefaultGraph,
                value: String::new(),
                language: None,
                datatype: None,
            },
        }
    }

    /// The identifier used to match the term against graph content and document text.
    pub fn identifier(&self) -> &str {
        &self.value
    }

    /// The short form shown in result tables: the local name for IRIs and datatypes.
    pub fn simplified(&self) -> String {
        match self.term_type {
            TermType::NamedNode => {
                let local = local_name(&self.value);
                if local.is_empty() {
                    self.value.clone()
                } else {
                    local.to_owned()
                }
            }
            TermType::Literal => {
                let mut out = format!("\"{}\"", self.value);
                if let Some(language) = &self.language {
                    out.push('@');
                    out.push_str(language);
                } else if let Some(datatype) = self.non_string_datatype() {
                    out.push_str("^^");
                    out.push_str(local_name(datatype));
                }
                out
            }
            TermType::BlankNode | TermType::DefaultGraph => self.to_string(),
        }
    }

    fn non_string_datatype(&self) -> Option<&str> {
        self.datatype
            .as_deref()
            .filter(|datatype| *datatype != xsd::STRING.as_str())
    }
}

impl<'a> From<TermRef<'a>> for RenderedTerm {
    fn from(term: TermRef<'a>) -> Self {
        match term {
            TermRef::NamedNode(node) => Self::named_node(node.as_str()),
            TermRef::BlankNode(node) => Self {
                term_type: TermType::BlankNode,
                value: node.as_str().to_owned(),
                language: None,
                datatype: None,
            },
            TermRef::Literal(literal) => Self {
                term_type: TermType::Literal,
                value: literal.value().to_owned(),
                language: literal.language().map(ToOwned::to_owned),
                datatype: Some(literal.datatype().as_str().to_owned()),
            },
        }
    }
}

impl From<&oxrdf::Term> for RenderedTerm {
    fn from(term: &oxrdf::Term) -> Self {
        Self::from(term.as_ref())
    }
}

impl<'a> From<NamedNodeRef<'a>> for RenderedTerm {
    fn from(node: NamedNodeRef<'a>) -> Self {
        Self::named_node(node.as_str())
    }
}

impl fmt::Display for RenderedTerm {
    /// N-Triples like full form: `<iri>`, `_:id`, `"value"@lang` or `"value"^^<datatype>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term_type {
            TermType::NamedNode => write!(f, "<{}>", self.value),
            TermType::BlankNode => write!(f, "_:{}", self.value),
            TermType::Literal => {
                write!(f, "\"{}\"", self.value)?;
                if let Some(language) = &self.language {
                    write!(f, "@{language}")
                } else if let Some(datatype) = self.non_string_datatype() {
                    write!(f, "^^<{datatype}>")
                } else {
                    Ok(())
                }
            }
            TermType::DefaultGraph => f.write_str("DefaultGraph"),
        }
    }
}

/// The plain identifier of a term: the IRI, the blank node id or the literal lexical form.
pub fn identifier(term: TermRef<'_>) -> &str {
    match term {
        TermRef::NamedNode(node) => node.as_str(),
        TermRef::BlankNode(node) => node.as_str(),
        TermRef::Literal(literal) => literal.value(),
    }
}

/// Returns the part of an IRI after its last `#`, or after its last `/` if it has no `#`.
///
/// Returns an empty string if the IRI contains neither.
pub fn local_name(iri: &str) -> &str {
    if let Some(position) = iri.rfind('#') {
        &iri[position + 1..]
    } else if let Some(position) = iri.rfind('/') {
        &iri[position + 1..]
    } else {
        ""
    }
}
