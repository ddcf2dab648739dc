/// Best-effort commit of the state file back to the hosting repository.
///
/// This is an external collaborator, not core logic: the runner calls it
/// through the [`Publisher`] trait after persisting new state, and a
/// failure here is logged, never fatal.
use crate::config::PublishConfig;
use std::path::Path;
use std::process::Command;

/// Errors from the publish step.
#[derive(Debug)]
pub enum PublishError {
    Spawn { step: String, source: std::io::Error },
    Failed { step: String },
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Spawn { step, source } => {
                write!(f, "failed to run {}: {}", step, source)
            }
            PublishError::Failed { step } => write!(f, "{} failed", step),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Spawn { source, .. } => Some(source),
            PublishError::Failed { .. } => None,
        }
    }
}

/// Pushes a freshly written state file somewhere durable.
pub trait Publisher {
    fn publish(&self, state_file: &Path) -> Result<(), PublishError>;
}

/// Commits the state file and pushes it with a token-authenticated remote.
pub struct GitPublisher {
    remote: String,
    commit_user: String,
    commit_email: String,
    token: String,
    repository: String,
}

impl GitPublisher {
    /// Build a git publisher, or `None` when publishing is disabled or
    /// the token/repository are not available.
    pub fn from_config(
        config: &PublishConfig,
        token: Option<String>,
        repository: Option<String>,
    ) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        match (token, repository) {
            (Some(token), Some(repository)) => Some(Self {
                remote: config.remote.clone(),
                commit_user: config.commit_user.clone(),
                commit_email: config.commit_email.clone(),
                token,
                repository,
            }),
            _ => None,
        }
    }

    fn commit_message() -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        format!("ci: update baseline state {timestamp} [skip ci]")
    }
}

impl Publisher for GitPublisher {
    fn publish(&self, state_file: &Path) -> Result<(), PublishError> {
        run_git(
            &["config", "user.name", &self.commit_user],
            "git config user.name",
        )?;
        run_git(
            &["config", "user.email", &self.commit_email],
            "git config user.email",
        )?;

        let state_arg = state_file.to_string_lossy();
        run_git(&["add", &state_arg], "git add state file")?;

        // Commit fails when there is nothing to commit — not an error.
        let msg = Self::commit_message();
        let commit = Command::new("git")
            .args(["commit", "-m", &msg, "--no-verify"])
            .status();
        match commit {
            Ok(status) if !status.success() => {
                tracing::debug!("git commit reported nothing to commit");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                return Err(PublishError::Spawn {
                    step: "git commit".to_string(),
                    source: e,
                })
            }
        }

        let remote_url = format!(
            "https://x-access-token:{}@github.com/{}.git",
            self.token, self.repository
        );
        run_git(
            &["remote", "set-url", &self.remote, &remote_url],
            "git remote set-url",
        )?;
        run_git(&["push", &self.remote, "HEAD"], "git push")?;

        Ok(())
    }
}

fn run_git(args: &[&str], step: &str) -> Result<(), PublishError> {
    let status = Command::new("git")
        .args(args)
        .status()
        .map_err(|e| PublishError::Spawn {
            step: step.to_string(),
            source: e,
        })?;
    if !status.success() {
        return Err(PublishError::Failed {
            step: step.to_string(),
        });
    }
    Ok(())
}
