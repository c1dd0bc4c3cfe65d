use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use uuid::Uuid;

use super::expiry::ExpiryHandle;

/// One uploaded source file and, once cut, its tile archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub original_path: PathBuf,
    pub archive_path: Option<PathBuf>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(original_path: PathBuf) -> Self {
        Self {
            original_path,
            archive_path: None,
            uploaded_at: Utc::now(),
        }
    }
}

/// Mutable part of a session, only reachable through [`Session::lock`].
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) files: HashMap<PathBuf, FileRecord>,
    pub(crate) terminated: bool,
}

/// An isolated scope of uploaded and derived files.
///
/// The session lock guards the file index and every filesystem mutation
/// inside [`Session::dir`]. It is independent of the registry lock.
pub struct Session {
    id: Uuid,
    dir: PathBuf,
    state: Mutex<SessionState>,
    expiry: Option<ExpiryHandle>,
}

impl Session {
    pub(crate) fn new(id: Uuid, storage_root: &Path, expiry: Option<ExpiryHandle>) -> Self {
        Self {
            id,
            dir: storage_root.join(id.to_string()),
            state: Mutex::new(SessionState::default()),
            expiry,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// On-disk directory owned by this session.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Restart the idle countdown. No-op when expiry is disabled.
    pub fn touch(&self) {
        if let Some(expiry) = &self.expiry {
            expiry.reset();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub(crate) fn stop_expiry(&self) {
        if let Some(expiry) = &self.expiry {
            expiry.stop();
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}
