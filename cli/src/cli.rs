use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "shaclnav")]
/// SHACL focus nodes, shape positions and validation reports for RDF documents
pub struct Args {
    /// JSON file in which validation sessions are persisted
    ///
    /// Required by the session commands and by validate --session.
    #[arg(long, global = true, env = "SHACLNAV_SESSIONS", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,
    /// Format of the log lines written to stderr
    ///
    /// The log level is set with the RUST_LOG environment variable and defaults to "warn".
    #[arg(long, global = true, env = "SHACLNAV_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the targets of the node shapes of a shapes file
    Targets {
        /// Shapes file
        #[arg(value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// IRI of the shape to describe
        ///
        /// By default, all the node shapes of the file are described.
        #[arg(long, value_hint = ValueHint::Url)]
        shape: Option<String>,
    },
    /// List the focus nodes the node shapes of a shapes file select in a data file
    FocusNodes {
        /// Shapes file
        #[arg(long, value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// Data file
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: PathBuf,
        /// IRI of the shape to resolve
        ///
        /// By default, all the node shapes of the shapes file are resolved.
        #[arg(long, value_hint = ValueHint::Url)]
        shape: Option<String>,
    },
    /// Summarize the node shapes of a shapes file: declaration position, targets and focus nodes
    Overview {
        /// Shapes file
        #[arg(long, value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// Data file in which focus nodes are resolved
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: Option<PathBuf>,
        /// Number of lines after a shape identifier searched for its sh:NodeShape type assertion
        #[arg(long, default_value_t = 5)]
        lookahead: usize,
    },
    /// Find where an RDF term is written in a file
    Locate {
        /// File to search
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// The term: an IRI, a blank node label or a literal value
        term: String,
        /// Kind of the term
        #[arg(long, value_enum, default_value_t = TermKind::Unknown)]
        kind: TermKind,
        /// List every occurrence instead of the best one
        #[arg(long)]
        all: bool,
    },
    /// Find where a node shape is declared in a shapes file
    ShapePosition {
        /// Shapes file
        #[arg(value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// IRI of the shape
        #[arg(value_hint = ValueHint::Url)]
        shape: String,
        /// Number of lines after the shape identifier searched for its sh:NodeShape type assertion
        #[arg(long, default_value_t = 5)]
        lookahead: usize,
    },
    /// Project the report graph written by a SHACL processor into a display-ready report
    ///
    /// Documents that do not parse produce a failed report listing the syntax errors.
    Validate {
        /// Report graph produced by the SHACL processor, in the standard SHACL report vocabulary
        #[arg(long, value_hint = ValueHint::FilePath)]
        report: PathBuf,
        /// Data file
        #[arg(long, value_hint = ValueHint::FilePath, required_unless_present = "session", conflicts_with = "session")]
        data: Option<PathBuf>,
        /// Shapes file
        ///
        /// By default, the file named by a "# shapes: <path>" comment in the first lines of the data file is used.
        #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "session")]
        shapes: Option<PathBuf>,
        /// Validate the data and shapes files of this session
        #[arg(long)]
        session: Option<String>,
    },
    /// Manage validation sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Create a session pairing a data file with a shapes file
    Create {
        /// Data file
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: PathBuf,
        /// Shapes file
        #[arg(long, value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// Name of the session
        ///
        /// By default, "Session N (<data file> vs <shapes file>)".
        #[arg(long)]
        name: Option<String>,
    },
    /// List the sessions, newest first
    List,
    /// Show a session
    Show { id: String },
    /// Rename a session
    Rename { id: String, name: String },
    /// Delete a session
    Delete { id: String },
    /// Change the data file of a session
    SetData {
        id: String,
        #[arg(value_hint = ValueHint::FilePath)]
        data: PathBuf,
    },
    /// Change the shapes file of a session
    SetShapes {
        id: String,
        #[arg(value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TermKind {
    NamedNode,
    BlankNode,
    Literal,
    /// An IRI if it contains ":", searched verbatim otherwise
    Unknown,
}
