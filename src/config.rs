use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Total time allowed for one upstream call, connect to last byte.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `["*"]` allows any origin without credentials. An explicit list
    /// allows credentials for those origins only.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream: UpstreamConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
        }
    }
}

impl RelayConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Resolve the API key from the configured environment variable.
    /// An empty value counts as unset.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.upstream.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(RelayError::config(format!(
                "{} environment variable is not set",
                self.upstream.api_key_env
            ))),
        }
    }

    /// `<base_url>/models/<model>:generateContent`, without the key.
    #[must_use]
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.upstream.base_url.trim_end_matches('/'),
            self.upstream.model
        )
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load `KEY=value` lines from `path` into the process environment without
/// overriding variables that are already set. Returns `false` when the file
/// does not exist.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(RelayError::config(format!(
            "Failed to load {}: {}",
            path.display(),
            e
        ))),
    }
}

#[must_use]
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("gemini-relay.toml"));

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("gemini-relay")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("gemini-relay").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("gemini-relay").join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".gemini-relay.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.upstream.api_key_env, "GEMINI_API_KEY");
        assert_eq!(
            config.generate_content_url(),
            "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent"
        );
        assert_eq!(config.cors.allow_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_load_partial_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 9100

[upstream]
base_url = "http://127.0.0.1:7000/"
timeout_secs = 5

[cors]
allow_origins = ["https://chat.example.com"]
"#
        )
        .unwrap();

        let config = RelayConfig::load(f.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.upstream.model, "gemini-pro");
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(
            config.generate_content_url(),
            "http://127.0.0.1:7000/models/gemini-pro:generateContent"
        );
        assert_eq!(config.cors.allow_origins, vec!["https://chat.example.com"]);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = RelayConfig::find_and_load(Some(Path::new("/nonexistent/gemini-relay.toml")))
            .unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "port = \"not a number\"").unwrap();
        assert!(matches!(
            RelayConfig::load(f.path()),
            Err(RelayError::Toml(_))
        ));
    }

    #[test]
    fn test_env_file_missing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(&dir.path().join(".env")).unwrap());
    }

    #[test]
    fn test_env_file_sets_variables() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "GEMINI_RELAY_TEST_DOTENV_VAR=from-file").unwrap();
        assert!(load_env_file(f.path()).unwrap());
        assert_eq!(
            std::env::var("GEMINI_RELAY_TEST_DOTENV_VAR").unwrap(),
            "from-file"
        );
    }

    #[test]
    fn test_malformed_env_file_is_reported() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "BROKEN LINE WITHOUT EQUALS").unwrap();
        let err = load_env_file(f.path()).unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
    }

    #[test]
    fn test_resolve_api_key_unset() {
        let mut config = RelayConfig::default();
        config.upstream.api_key_env = "GEMINI_RELAY_TEST_UNSET_KEY".to_string();
        let err = config.resolve_api_key().unwrap_err();
        assert!(err.to_string().contains("GEMINI_RELAY_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_resolve_api_key_empty_counts_as_unset() {
        std::env::set_var("GEMINI_RELAY_TEST_EMPTY_KEY", "");
        let mut config = RelayConfig::default();
        config.upstream.api_key_env = "GEMINI_RELAY_TEST_EMPTY_KEY".to_string();
        assert!(config.resolve_api_key().is_err());
    }

    #[test]
    fn test_resolve_api_key_whitespace_is_accepted_verbatim() {
        std::env::set_var("GEMINI_RELAY_TEST_BLANK_KEY", "  ");
        let mut config = RelayConfig::default();
        config.upstream.api_key_env = "GEMINI_RELAY_TEST_BLANK_KEY".to_string();
        assert_eq!(config.resolve_api_key().unwrap(), "  ");
    }

    #[test]
    fn test_resolve_api_key_set() {
        std::env::set_var("GEMINI_RELAY_TEST_SET_KEY", "abc123");
        let mut config = RelayConfig::default();
        config.upstream.api_key_env = "GEMINI_RELAY_TEST_SET_KEY".to_string();
        assert_eq!(config.resolve_api_key().unwrap(), "abc123");
    }
}
