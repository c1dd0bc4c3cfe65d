use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::expiry::ExpiryTimer;
use super::types::Session;
use crate::config::RegistryConfig;
use crate::error::{CoreError, CoreResult};

/// Process-wide directory of active sessions.
///
/// The registry lock only protects the map itself. It is never held across
/// filesystem I/O, and never while a session lock is held.
pub struct SessionRegistry {
    storage_root: PathBuf,
    idle_timeout: Option<Duration>,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        info!(
            "Initializing session registry at {} (idle timeout: {:?})",
            config.storage_root.display(),
            config.idle_timeout
        );
        Self {
            storage_root: config.storage_root,
            idle_timeout: config.idle_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Create and register an empty session.
    ///
    /// Nothing is written to disk until the first upload. When an idle
    /// timeout is configured the expiry timer starts once the session is
    /// registered.
    pub fn new_session(self: &Arc<Self>) -> Arc<Session> {
        loop {
            let id = Uuid::new_v4();
            if self.sessions.read().contains_key(&id) {
                continue;
            }

            let timer = self.idle_timeout.and_then(ExpiryTimer::prepare);
            let expiry = timer.as_ref().map(ExpiryTimer::handle);
            let session = Arc::new(Session::new(id, &self.storage_root, expiry));

            match self.sessions.write().entry(id) {
                // Lost a race for the same id; the timer never started
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(session.clone());
                }
            }

            if let Some(timer) = timer {
                timer.start(Arc::downgrade(self), id);
            }

            info!("created session {}", id);
            return session;
        }
    }

    /// Look up a session by its textual id.
    ///
    /// Malformed ids are simply not found.
    pub fn find(&self, id: &str) -> Option<Arc<Session>> {
        let id = Uuid::parse_str(id).ok()?;
        self.sessions.read().get(&id).cloned()
    }

    /// Delete the session's directory tree and drop it from the registry.
    ///
    /// If the directory cannot be removed the session stays registered so the
    /// caller can retry. Terminating an already terminated session succeeds.
    pub fn terminate(&self, session: &Session) -> CoreResult<()> {
        {
            let mut state = session.lock();
            if state.terminated {
                debug!("session {} already terminated", session);
                return Ok(());
            }

            match std::fs::remove_dir_all(session.dir()) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!("error removing {}: {}", session.dir().display(), e);
                    return Err(CoreError::Filesystem);
                }
            }

            state.terminated = true;
            state.files.clear();
        }

        session.stop_expiry();
        self.sessions.write().remove(&session.id());
        info!("terminated session {}", session);
        Ok(())
    }

    /// Terminate by id, used by the idle timer. A session that is already
    /// gone counts as expired.
    pub(crate) fn expire(&self, id: Uuid) -> CoreResult<()> {
        let session = self.sessions.read().get(&id).cloned();
        match session {
            Some(session) => self.terminate(&session),
            None => Ok(()),
        }
    }

    /// Delete the whole storage root. Only for process shutdown, once no
    /// request is in flight; registered sessions are left as they are.
    pub fn remove_all(&self) -> CoreResult<()> {
        match std::fs::remove_dir_all(&self.storage_root) {
            Ok(()) => {
                info!("removed storage root {}", self.storage_root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("error removing {}: {}", self.storage_root.display(), e);
                Err(CoreError::Filesystem)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ids of all registered sessions, for diagnostics.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().map(Uuid::to_string).collect()
    }
}
