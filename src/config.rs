//! Relay configuration.
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Config file (`--config`, or `.exec-relay.toml` when present)
//! 3. CLI flags

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".exec-relay.toml";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Complete relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
    /// Answers the scripted engine gives in local agent sessions.
    #[serde(rename = "script")]
    pub scripts: Vec<ScriptEntry>,
}

/// How the agent reaches its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub transport: TransportKind,
    /// Address to listen on when `transport = "tcp"`.
    pub listen: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            listen: "127.0.0.1:7878".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Frames on stdin, responses on stdout.
    Stdio,
    /// The first connection accepted on `listen`.
    Tcp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Logging settings. Logs always go to stderr.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `relay_agent=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON, one object per event.
    Json,
}

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptEntry {
    pub kind: ScriptKind,
    pub class: String,
    /// Method name for `invoke`, variable name for `var`.
    pub member: String,
    #[serde(default)]
    pub result: String,
    /// Block until stopped instead of answering.
    #[serde(default)]
    pub block: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Invoke,
    Var,
}

/// Values from CLI flags; `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub transport: Option<TransportKind>,
    pub listen: Option<String>,
    pub log_filter: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl RelayConfig {
    /// Parse a TOML document on top of the defaults.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the file layer.
    ///
    /// An explicit path must exist. Without one, `default_file` is used if
    /// it exists and the built-in defaults otherwise.
    pub fn resolve(explicit: Option<&Path>, default_file: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if default_file.is_file() => Self::load(default_file),
            None => Ok(Self::default()),
        }
    }

    /// Apply the CLI layer.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(transport) = overrides.transport {
            self.agent.transport = transport;
        }
        if let Some(listen) = overrides.listen {
            self.agent.listen = listen;
        }
        if let Some(filter) = overrides.log_filter {
            self.logging.filter = filter;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.agent.transport, TransportKind::Stdio);
        assert_eq!(config.agent.listen, "127.0.0.1:7878");
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.scripts.is_empty());
    }

    #[test]
    fn test_empty_document_is_defaults() {
        assert_eq!(RelayConfig::parse("").unwrap(), RelayConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let content = r#"
            [agent]
            transport = "tcp"
            listen = "0.0.0.0:9000"

            [logging]
            filter = "relay_agent=debug"
            format = "json"

            [[script]]
            kind = "invoke"
            class = "Foo"
            member = "bar"
            result = "42"

            [[script]]
            kind = "invoke"
            class = "Loop"
            member = "forever"
            block = true
        "#;

        let config = RelayConfig::parse(content).unwrap();
        assert_eq!(config.agent.transport, TransportKind::Tcp);
        assert_eq!(config.agent.listen, "0.0.0.0:9000");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.scripts.len(), 2);
        assert_eq!(config.scripts[0].result, "42");
        assert!(!config.scripts[0].block);
        assert!(config.scripts[1].block);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = RelayConfig::parse("[agent]\ntransport = \"tcp\"\n").unwrap();
        assert_eq!(config.agent.listen, "127.0.0.1:7878");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RelayConfig::parse("[agent]\nport = 1\n").unwrap_err();
        assert!(err.to_string().contains("port"), "error should name the key: {}", err);
    }

    #[test]
    fn test_bad_transport_rejected() {
        assert!(RelayConfig::parse("[agent]\ntransport = \"pipe\"\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = 12").unwrap();

        let err = RelayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_resolve_layers() {
        let dir = TempDir::new().unwrap();
        let default_file = dir.path().join(DEFAULT_CONFIG_FILE);

        // No file at all: built-in defaults.
        let config = RelayConfig::resolve(None, &default_file).unwrap();
        assert_eq!(config, RelayConfig::default());

        // Default file present.
        fs::write(&default_file, "[agent]\nlisten = \"127.0.0.1:1\"\n").unwrap();
        let config = RelayConfig::resolve(None, &default_file).unwrap();
        assert_eq!(config.agent.listen, "127.0.0.1:1");

        // Explicit path wins and must exist.
        let missing = dir.path().join("missing.toml");
        let err = RelayConfig::resolve(Some(&missing), &default_file).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_cli_layer_wins() {
        let mut config = RelayConfig::parse("[agent]\ntransport = \"tcp\"\nlisten = \"127.0.0.1:1\"\n").unwrap();
        config.apply(Overrides {
            transport: Some(TransportKind::Stdio),
            log_format: Some(LogFormat::Json),
            ..Overrides::default()
        });
        assert_eq!(config.agent.transport, TransportKind::Stdio);
        assert_eq!(config.agent.listen, "127.0.0.1:1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "info");
    }
}
