use std::path::PathBuf;
use std::time::Duration;

/// Settings the session registry needs at construction.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding one sub-directory per session.
    pub storage_root: PathBuf,
    /// Idle period after which an untouched session is terminated.
    /// `None` disables expiry.
    pub idle_timeout: Option<Duration>,
}

impl RegistryConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            idle_timeout: None,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("temp"),
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}
