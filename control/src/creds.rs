use shotclock_common::creds::Credentials;
use std::path::PathBuf;
use tracing::{debug, warn};

/// JSON-file credential persistence under the application data directory.
///
/// Constructed once at startup and handed to whoever needs it; missing or
/// corrupt state reads as "no credentials".
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, creds: &Credentials) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CredentialError::Write(parent.display().to_string(), e))?;
        }
        let json = serde_json::to_string_pretty(creds)
            .map_err(|e| CredentialError::Serialize(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| CredentialError::Write(self.path.display().to_string(), e))?;
        debug!(path = %self.path.display(), server_url = creds.server_url, "credentials saved");
        Ok(())
    }

    /// Stored credentials, or `None` when absent or unreadable.
    pub fn get(&self) -> Option<Credentials> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(creds) => Some(creds),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "credential file unreadable, treating as absent");
                None
            }
        }
    }

    /// Forget stored credentials. A missing file already is the goal state.
    pub fn clear(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::Remove(self.path.display().to_string(), e)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to serialize credentials: {0}")]
    Serialize(String),
    #[error("failed to write credentials to {0}: {1}")]
    Write(String, std::io::Error),
    #[error("failed to remove credentials at {0}: {1}")]
    Remove(String, std::io::Error),
}
