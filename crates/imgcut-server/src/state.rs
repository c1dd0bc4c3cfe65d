use std::sync::Arc;

use imgcut_core::{FileManager, SessionRegistry};

use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub files: Arc<FileManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, settings: Settings) -> Self {
        Self {
            registry,
            files: Arc::new(FileManager::new()),
            settings: Arc::new(settings),
        }
    }
}
