//! Validation sessions: named pairs of a data graph and a shapes graph, with their last report.

use crate::error::SessionError;
use crate::report::ValidationReport;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::Url;

/// A data graph and a shapes graph validated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSession {
    id: String,
    name: String,
    data_graph_uri: Url,
    shapes_graph_uri: Url,
    /// Milliseconds since the Unix epoch.
    created_at: u64,
    #[serde(skip)]
    last_report: Option<ValidationReport>,
}

impl ValidationSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_graph_uri(&self) -> &Url {
        &self.data_graph_uri
    }

    pub fn shapes_graph_uri(&self) -> &Url {
        &self.shapes_graph_uri
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// The report of the last validation run, successful or not.
    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.last_report.as_ref()
    }

    pub fn data_graph_file_name(&self) -> &str {
        file_name(&self.data_graph_uri)
    }

    pub fn shapes_graph_file_name(&self) -> &str {
        file_name(&self.shapes_graph_uri)
    }
}

fn file_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .unwrap_or(url.as_str())
}

/// Persistence of the session collection.
pub trait SessionStore {
    fn load(&self) -> Result<Vec<ValidationSession>, SessionError>;

    fn save(&mut self, sessions: &[ValidationSession]) -> Result<(), SessionError>;
}

/// Keeps sessions in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Vec<ValidationSession>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Vec<ValidationSession>, SessionError> {
        Ok(self.sessions.clone())
    }

    fn save(&mut self, sessions: &[ValidationSession]) -> Result<(), SessionError> {
        self.sessions = sessions.to_vec();
        Ok(())
    }
}

/// Stores sessions as a JSON array in a file.
///
/// A missing file is an empty collection. Entries that are not valid sessions are skipped on load.
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileSessionStore {
    fn load(&self) -> Result<Vec<ValidationSession>, SessionError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::io(&self.path, e)),
        };
        let entries = serde_json::from_slice::<Vec<serde_json::Value>>(&content)
            .map_err(|e| SessionError::format(&self.path, e))?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<ValidationSession>(entry) {
                Ok(session) => Some(session),
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "skipping invalid stored session");
                    None
                }
            })
            .collect())
    }

    fn save(&mut self, sessions: &[ValidationSession]) -> Result<(), SessionError> {
        let content =
            serde_json::to_vec_pretty(sessions).map_err(|e| SessionError::format(&self.path, e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }
        fs::write(&self.path, content).map_err(|e| SessionError::io(&self.path, e))
    }
}

/// The set of validation sessions, keyed by id.
///
/// Every mutation except [`record_report`](Self::record_report) is written through to the store.
pub struct SessionRegistry {
    sessions: FxHashMap<String, ValidationSession>,
    store: Box<dyn SessionStore>,
}

impl SessionRegistry {
    /// Loads the sessions saved in `store`.
    pub fn load(store: impl SessionStore + 'static) -> Result<Self, SessionError> {
        let sessions = store
            .load()?
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect::<FxHashMap<_, _>>();
        debug!(sessions = sessions.len(), "sessions loaded");
        Ok(Self {
            sessions,
            store: Box::new(store),
        })
    }

    /// A registry that does not persist anything.
    pub fn in_memory() -> Self {
        Self {
            sessions: FxHashMap::default(),
            store: Box::new(MemorySessionStore::default()),
        }
    }

    /// Creates a session. Without a name, it is called `Session N (<data file> vs <shapes file>)`.
    pub fn create(
        &mut self,
        data_graph_uri: Url,
        shapes_graph_uri: Url,
        name: Option<String>,
    ) -> Result<&ValidationSession, SessionError> {
        let created_at = now_millis();
        // Creation time in milliseconds, bumped until unused
        let mut id = created_at;
        while self.sessions.contains_key(&id.to_string()) {
            id += 1;
        }
        let id = id.to_string();
        let mut session = ValidationSession {
            id: id.clone(),
            name: String::new(),
            data_graph_uri,
            shapes_graph_uri,
            created_at,
            last_report: None,
        };
        session.name = name.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| {
            format!(
                "Session {} ({} vs {})",
                self.sessions.len() + 1,
                session.data_graph_file_name(),
                session.shapes_graph_file_name()
            )
        });
        info!(%id, name = %session.name, "session created");
        self.sessions.insert(id.clone(), session);
        self.save()?;
        self.get(&id).ok_or_else(|| SessionError::unknown_session(id))
    }

    pub fn get(&self, id: &str) -> Option<&ValidationSession> {
        self.sessions.get(id)
    }

    /// All sessions, newest first.
    pub fn list(&self) -> Vec<&ValidationSession> {
        let mut sessions = self.sessions.values().collect::<Vec<_>>();
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.len().cmp(&a.id.len()))
                .then_with(|| b.id.cmp(&a.id))
        });
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<&ValidationSession, SessionError> {
        let name = name.into();
        self.update(id, |session| session.name = name)
    }

    pub fn replace_data_graph(&mut self, id: &str, uri: Url) -> Result<&ValidationSession, SessionError> {
        self.update(id, |session| session.data_graph_uri = uri)
    }

    pub fn replace_shapes_graph(
        &mut self,
        id: &str,
        uri: Url,
    ) -> Result<&ValidationSession, SessionError> {
        self.update(id, |session| session.shapes_graph_uri = uri)
    }

    /// Stores the report of the last validation run. Reports are not persisted.
    pub fn record_report(&mut self, id: &str, report: ValidationReport) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::unknown_session(id))?;
        debug!(id, conforms = report.conforms(), "session report recorded");
        session.last_report = Some(report);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<ValidationSession, SessionError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::unknown_session(id))?;
        info!(id, "session deleted");
        self.save()?;
        Ok(session)
    }

    fn update(
        &mut self,
        id: &str,
        update: impl FnOnce(&mut ValidationSession),
    ) -> Result<&ValidationSession, SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::unknown_session(id))?;
        update(session);
        debug!(id, "session updated");
        self.save()?;
        self.get(id).ok_or_else(|| SessionError::unknown_session(id))
    }

    fn save(&mut self) -> Result<(), SessionError> {
        let sessions = self.list().into_iter().cloned().collect::<Vec<_>>();
        self.store.save(&sessions)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
