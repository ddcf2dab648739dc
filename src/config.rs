use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from pagewatch.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct WatchConfig {
    pub page: PageConfig,
    pub notify: NotifyConfig,
    pub state: StateConfig,
    pub publish: PublishConfig,
    pub errors: ErrorsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub endpoint: String,
    pub heading: String,
    pub message: String,
    pub link: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub remote: String,
    pub commit_user: String,
    pub commit_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ErrorsConfig {
    pub on_fetch_error: FetchErrorPolicy,
}

/// What a fetch failure does to the process exit code.
///
/// `Continue` logs the failure and exits 0 (suitable when a scheduler job
/// should not go red on transient network errors). `Fail` exits 1 so the
/// invoking job surfaces the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    #[default]
    Continue,
    Fail,
}

// --- Default implementations ---

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_agent: format!("pagewatch/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://onesignal.com/api/v1/notifications".to_string(),
            heading: "Page update".to_string(),
            message: "The watched page has changed.".to_string(),
            link: String::new(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("last.json"),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: "origin".to_string(),
            commit_user: "pagewatch[bot]".to_string(),
            commit_email: "pagewatch[bot]@users.noreply.github.com".to_string(),
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    MissingUrl,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::MissingUrl => {
                write!(f, "no target URL configured (set [page] url or pass --url)")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::MissingUrl => None,
        }
    }
}

impl WatchConfig {
    /// Load config from the given path. A missing file yields defaults;
    /// an unreadable or unparseable file is a hard error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Validate that a target URL is present after CLI merge.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        if self.page.url.is_empty() {
            Err(ConfigError::MissingUrl)
        } else {
            Ok(&self.page.url)
        }
    }
}

/// Credentials and identifiers sourced from the environment, never from
/// the config file.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub onesignal_app_id: Option<String>,
    pub onesignal_api_key: Option<String>,
    pub github_token: Option<String>,
    pub github_repository: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            onesignal_app_id: non_empty_env("ONESIGNAL_APP_ID"),
            onesignal_api_key: non_empty_env("ONESIGNAL_API_KEY"),
            github_token: non_empty_env("GITHUB_TOKEN"),
            github_repository: non_empty_env("GITHUB_REPOSITORY"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
