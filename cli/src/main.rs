use crate::cli::{Args, Command, LogFormat, SessionCommand, TermKind};
use anyhow::{Context, bail};
use clap::Parser;
use oxrdf::{Dataset, NamedNode, NamedOrBlankNode};
use serde::Serialize;
use shaclnav::{
    Command as WorkbenchCommand, EngineError, JsonFileSessionStore, Outcome, RawValidationReport,
    RdfDocument, ReportFileEngine, SessionRegistry, ShapeTarget, TermKindHint, TextLocator,
    Workbench, WorkbenchOptions, extract_targets, find_focus_nodes, find_node_shapes,
};
use std::collections::BTreeSet;
use std::fs;
use std::io::{Write, stdout};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

mod cli;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShapeTargets {
    shape: String,
    targets: Vec<ShapeTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    focus_nodes: Option<BTreeSet<String>>,
}

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);
    match args.command {
        Command::Targets { shapes, shape } => {
            let shapes = load_document(&shapes)?;
            let summaries = selected_shapes(&shapes, shape.as_deref())?
                .into_iter()
                .map(|shape| ShapeTargets {
                    shape: shape.to_string(),
                    targets: extract_targets(shapes.dataset(), &shape),
                    focus_nodes: None,
                })
                .collect::<Vec<_>>();
            print_json(&summaries)
        }
        Command::FocusNodes {
            shapes,
            data,
            shape,
        } => {
            let shapes = load_document(&shapes)?;
            let data = load_document(&data)?;
            let summaries = selected_shapes(&shapes, shape.as_deref())?
                .into_iter()
                .map(|shape| {
                    let targets = extract_targets(shapes.dataset(), &shape);
                    let focus_nodes = find_focus_nodes(data.dataset(), &targets);
                    ShapeTargets {
                        shape: shape.to_string(),
                        targets,
                        focus_nodes: Some(focus_nodes),
                    }
                })
                .collect::<Vec<_>>();
            print_json(&summaries)
        }
        Command::Overview {
            shapes,
            data,
            lookahead,
        } => {
            let mut workbench = Workbench::new(SessionRegistry::in_memory(), no_engine)
                .with_options(WorkbenchOptions {
                    shape_lookahead: lookahead,
                    ..WorkbenchOptions::default()
                });
            let outcome = workbench.execute(WorkbenchCommand::ShapeOverview {
                shapes: file_url(&shapes)?,
                data: data.as_deref().map(file_url).transpose()?,
            })?;
            print_json(&outcome)
        }
        Command::Locate {
            file,
            term,
            kind,
            all,
        } => {
            let kind = term_kind_hint(kind);
            if all {
                let document = load_document(&file)?;
                let ranges = TextLocator::new(document.text(), document.prefixes())
                    .locate_all(&term, kind);
                return print_json(&ranges);
            }
            let mut workbench = Workbench::new(SessionRegistry::in_memory(), no_engine);
            let outcome = workbench.execute(WorkbenchCommand::JumpTo {
                term,
                kind,
                location: file_url(&file)?,
            })?;
            print_json(&outcome)
        }
        Command::ShapePosition {
            shapes,
            shape,
            lookahead,
        } => {
            let document = load_document(&shapes)?;
            let range = TextLocator::new(document.text(), document.prefixes())
                .find_shape_declaration(&shape, lookahead);
            if range.is_none() {
                info!(%shape, "no declaration found");
            }
            print_json(&range)
        }
        Command::Validate {
            report,
            data,
            shapes,
            session,
        } => {
            let engine = ReportFileEngine::new(report);
            let outcome = if let Some(session) = session {
                let sessions = open_sessions(args.store.as_deref())?;
                Workbench::new(sessions, engine)
                    .execute(WorkbenchCommand::RunValidation { id: session })?
            } else {
                let Some(data) = data else {
                    bail!("--data or --session is required")
                };
                Workbench::new(SessionRegistry::in_memory(), engine).execute(
                    WorkbenchCommand::ValidateDocuments {
                        data: file_url(&data)?,
                        shapes: shapes.as_deref().map(file_url).transpose()?,
                    },
                )?
            };
            match outcome {
                Outcome::Report { report } => print_json(&report),
                outcome => print_json(&outcome),
            }
        }
        Command::Session { command } => {
            let sessions = open_sessions(args.store.as_deref())?;
            let mut workbench = Workbench::new(sessions, no_engine);
            let command = match command {
                SessionCommand::Create { data, shapes, name } => WorkbenchCommand::CreateSession {
                    data_graph: file_url(&data)?,
                    shapes_graph: file_url(&shapes)?,
                    name,
                },
                SessionCommand::List => {
                    return print_json(&workbench.sessions().list());
                }
                SessionCommand::Show { id } => {
                    let session = workbench
                        .sessions()
                        .get(&id)
                        .with_context(|| format!("Unknown session '{id}'"))?;
                    return print_json(session);
                }
                SessionCommand::Rename { id, name } => WorkbenchCommand::RenameSession { id, name },
                SessionCommand::Delete { id } => WorkbenchCommand::DeleteSession { id },
                SessionCommand::SetData { id, data } => WorkbenchCommand::ReplaceDataGraph {
                    id,
                    location: file_url(&data)?,
                },
                SessionCommand::SetShapes { id, shapes } => WorkbenchCommand::ReplaceShapesGraph {
                    id,
                    location: file_url(&shapes)?,
                },
            };
            let outcome = workbench.execute(command)?;
            print_json(&outcome)
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// The engine of the commands that never validate.
fn no_engine(_: &Dataset, _: &Dataset) -> Result<RawValidationReport, EngineError> {
    Err(EngineError::new("No validation engine configured"))
}

fn open_sessions(store: Option<&Path>) -> anyhow::Result<SessionRegistry> {
    let Some(store) = store else {
        bail!("The session store must be set with --store or SHACLNAV_SESSIONS")
    };
    debug!(store = %store.display(), "opening session store");
    Ok(SessionRegistry::load(JsonFileSessionStore::new(store))?)
}

fn file_url(path: &Path) -> anyhow::Result<Url> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    Url::from_file_path(&path)
        .map_err(|()| anyhow::anyhow!("Invalid file path {}", path.display()))
}

fn load_document(path: &Path) -> anyhow::Result<RdfDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = RdfDocument::parse(file_url(path)?, text);
    if let Some(diagnostic) = document.diagnostics().first() {
        bail!(
            "{} does not parse: {} (line {})",
            path.display(),
            diagnostic.message,
            diagnostic.display_line()
        );
    }
    Ok(document)
}

/// The given shape, or all the node shapes of the document.
fn selected_shapes(
    shapes: &RdfDocument,
    shape: Option<&str>,
) -> anyhow::Result<Vec<NamedOrBlankNode>> {
    Ok(match shape {
        Some(shape) => vec![
            NamedNode::new(shape)
                .with_context(|| format!("Invalid shape IRI '{shape}'"))?
                .into(),
        ],
        None => find_node_shapes(shapes.dataset()),
    })
}

fn term_kind_hint(kind: TermKind) -> TermKindHint {
    match kind {
        TermKind::NamedNode => TermKindHint::NamedNode,
        TermKind::BlankNode => TermKindHint::BlankNode,
        TermKind::Literal => TermKindHint::Literal,
        TermKind::Unknown => TermKindHint::Unknown,
    }
}

fn print_json(value: &(impl Serialize + ?Sized)) -> anyhow::Result<()> {
    let mut stdout = stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
