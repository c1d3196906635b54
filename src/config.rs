use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use telnet_automata::{OptionIdentity, OptionRegistry, ProtocolSession, TerminalTypeHandler};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from an existing file
    File,
    /// File was missing; defaults were used and written out as a template
    TemplateWritten,
    /// File was missing and the template could not be written
    DefaultsOnly { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MudlinkConfig {
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    pub terminal: TerminalConfig,
    /// Options the session negotiates; anything missing is refused
    pub options: OptionRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter directive, overridden by `RUST_LOG`
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Largest chunk a single feed may hand the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Names offered, in order, when the server asks for our terminal type
    pub names: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_limit: Some(1024 * 1024),
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            names: TerminalTypeHandler::default().names().to_vec(),
        }
    }
}

impl MudlinkConfig {
    /// Load configuration from `path`
    ///
    /// A missing file is not an error: defaults are returned and written to
    /// `path` as a commented template for the user to edit.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<(Self, ConfigOrigin), ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok((Self::parse(&content)?, ConfigOrigin::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let default_config = Self::default();
                let origin = match fs::write(path, default_config.to_config_file_format()) {
                    Ok(()) => ConfigOrigin::TemplateWritten,
                    Err(e) => ConfigOrigin::DefaultsOnly {
                        reason: e.to_string(),
                    },
                };
                Ok((default_config, origin))
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.receive_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "session.receive_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(name) = self
            .terminal
            .names
            .iter()
            .find(|name| name.is_empty() || !name.is_ascii())
        {
            return Err(ConfigError::InvalidValue {
                key: "terminal.names",
                reason: format!("{:?} is not a non-empty ASCII name", name),
            });
        }
        Ok(())
    }

    /// A fresh session wired up from this configuration
    pub fn build_session(&self) -> ProtocolSession {
        let mut session = ProtocolSession::new(self.options.clone());
        if self.options.contains(OptionIdentity::TERMINAL_TYPE.code) {
            session = session.with_handler(TerminalTypeHandler::new(self.terminal.names.clone()));
        }
        match self.session.receive_limit {
            Some(limit) => session.with_receive_limit(limit),
            None => session,
        }
    }

    fn to_config_file_format(&self) -> String {
        let names = self
            .terminal
            .names
            .iter()
            .map(|name| toml::Value::String(name.clone()).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let receive_limit = match self.session.receive_limit {
            Some(limit) => format!("receive_limit = {}", limit),
            None => "# receive_limit = 1048576".to_string(),
        };

        let mut content = format!(
            r#"# Mudlink Configuration File
# Lines starting with # are comments

[logging]
# Tracing filter, e.g. "info" or "telnet_automata=debug" (RUST_LOG wins)
level = {}

[session]
# Largest number of bytes handed to the session in one go
{}

[terminal]
# Answers to the server's TERMINAL-TYPE requests, in order
names = [{}]

# Options to negotiate. accept_remote answers the server's WILL,
# accept_local answers the server's DO. Unlisted options are refused.
"#,
            toml::Value::String(self.logging.level.clone()),
            receive_limit,
            names,
        );

        for entry in self.options.entries() {
            content.push_str(&format!(
                "\n[[options]]\n# {}\ncode = {}\naccept_remote = {}\naccept_local = {}\n",
                OptionIdentity::from_code(entry.code).name,
                entry.code,
                entry.accept_remote,
                entry.accept_local
            ));
        }

        content
    }
}
