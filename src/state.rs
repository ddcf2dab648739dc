/// Baseline state file: a single integer, written as `{"size": N}`.
///
/// Uses atomic write pattern: write to temp file then rename.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// The JSON payload persisted between runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredState {
    size: u64,
}

/// Errors from persisting the baseline.
#[derive(Debug)]
pub enum StateError {
    Serialize {
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::Serialize { source } => {
                write!(f, "failed to serialize state: {}", source)
            }
            StateError::Write { path, source } => {
                write!(f, "failed to write state {}: {}", path.display(), source)
            }
            StateError::Rename { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} to {}: {}",
                    from.display(),
                    to.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Serialize { source } => Some(source),
            StateError::Write { source, .. } => Some(source),
            StateError::Rename { source, .. } => Some(source),
        }
    }
}

/// Reads and writes the baseline size file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored baseline size.
    ///
    /// Missing file means no baseline (0). Accepts both the JSON form
    /// `{"size": N}` and a bare integer, so state files written by older
    /// deployments still parse. Anything unreadable is logged and treated
    /// as no baseline rather than aborting the run.
    pub fn load(&self) -> u64 {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read state file, assuming no baseline");
                return 0;
            }
        };

        if let Ok(state) = serde_json::from_str::<StoredState>(&contents) {
            return state.size;
        }
        if let Ok(size) = contents.trim().parse::<u64>() {
            return size;
        }

        warn!(path = %self.path.display(), "could not parse state file, assuming no baseline");
        0
    }

    /// Atomically persist the new baseline size.
    ///
    /// Writes to a temporary file in the same directory, then renames
    /// so readers never see a partial write.
    pub fn save(&self, size: u64) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(&StoredState { size })
            .map_err(|e| StateError::Serialize { source: e })?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = dir.join(format!(".last.json.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| StateError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&tmp_path, &self.path).map_err(|e| StateError::Rename {
            from: tmp_path,
            to: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}
