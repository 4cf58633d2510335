//! Saved connection records and client settings (TOML)
//!
//! ```toml
//! [settings]
//! setup_port_timeout_secs = 10
//!
//! [settings.document]
//! connect = 5
//! query = 30
//!
//! [[connection]]
//! name = "staging"
//! url = "postgres://app@localhost:15432/app"
//! read_only = true
//!
//! [[connection.commands]]
//! run = "ssh -N -L 15432:db.internal:5432 bastion"
//! background = true
//! wait_port = 15432
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_core::{ConnectionConfig, DocumentTimeouts, ProviderKind, Result, TesseraError};

fn default_setup_port_timeout_secs() -> u64 {
    10
}

/// Client-wide knobs handed to the registry and the connection manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// How long a setup command may take to open its port
    #[serde(default = "default_setup_port_timeout_secs")]
    pub setup_port_timeout_secs: u64,

    /// Bounds for document-store calls
    #[serde(default)]
    pub document: DocumentTimeouts,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            setup_port_timeout_secs: default_setup_port_timeout_secs(),
            document: DocumentTimeouts::default(),
        }
    }
}

impl ClientSettings {
    pub fn setup_port_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_port_timeout_secs)
    }
}

/// A shell command run before the driver connects, e.g. to open a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupCommand {
    /// Passed to the platform shell
    pub run: String,

    /// Keep the process alive for the connection's lifetime instead of
    /// waiting for it to exit
    #[serde(default)]
    pub background: bool,

    /// Local TCP port that must accept connections before connecting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_port: Option<u16>,

    /// Overrides [`ClientSettings::setup_port_timeout_secs`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_secs: Option<u64>,
}

impl SetupCommand {
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            background: false,
            wait_port: None,
            wait_timeout_secs: None,
        }
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn wait_port(mut self, port: u16) -> Self {
        self.wait_port = Some(port);
        self
    }
}

/// A saved database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConnection {
    /// Display name, unique within the file
    pub name: String,

    /// Inferred from the URL when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,

    pub url: String,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<SetupCommand>,
}

impl SavedConnection {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!(name = %name, "creating new saved connection");
        Self {
            name,
            provider: None,
            url: url.into(),
            read_only: false,
            commands: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_command(mut self, command: SetupCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// Explicit provider, or the one implied by the URL
    pub fn resolve_provider(&self) -> Result<ProviderKind> {
        match self.provider {
            Some(provider) => Ok(provider),
            None => ProviderKind::from_url(&self.url),
        }
    }

    /// The record handed to `Connect`
    pub fn to_config(&self) -> Result<ConnectionConfig> {
        Ok(ConnectionConfig::new(self.resolve_provider()?, &self.url)
            .named(&self.name)
            .read_only(self.read_only))
    }
}

/// On-disk layout of the connections file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionsFile {
    #[serde(default)]
    pub settings: ClientSettings,

    #[serde(default, rename = "connection")]
    pub connections: Vec<SavedConnection>,
}

impl ConnectionsFile {
    /// `<config dir>/tessera/connections.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("tessera").join("connections.toml"))
            .ok_or_else(|| {
                TesseraError::Configuration("Could not determine config directory".into())
            })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content)
            .map_err(|e| TesseraError::Configuration(format!("Invalid connections file: {}", e)))?;
        file.validate()?;
        Ok(file)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TesseraError::Configuration(format!("Cannot encode connections: {}", e)))
    }

    /// Load a file. A missing file is an empty configuration.
    #[tracing::instrument]
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!("connections file does not exist");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        let file = Self::from_toml_str(&content)?;
        tracing::info!(count = file.connections.len(), "connections loaded");
        Ok(file)
    }

    #[tracing::instrument(skip(self))]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_toml_string()?).await?;
        tracing::info!(count = self.connections.len(), "connections saved");
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&SavedConnection> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// Insert or replace by name
    pub fn upsert(&mut self, connection: SavedConnection) {
        match self.connections.iter_mut().find(|c| c.name == connection.name) {
            Some(existing) => *existing = connection,
            None => self.connections.push(connection),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<SavedConnection> {
        let pos = self.connections.iter().position(|c| c.name == name)?;
        Some(self.connections.remove(pos))
    }

    fn validate(&self) -> Result<()> {
        for (idx, conn) in self.connections.iter().enumerate() {
            if conn.name.trim().is_empty() {
                return Err(TesseraError::Configuration(format!(
                    "connection #{} has no name",
                    idx + 1
                )));
            }
            if self.connections[..idx].iter().any(|c| c.name == conn.name) {
                return Err(TesseraError::Configuration(format!(
                    "duplicate connection name '{}'",
                    conn.name
                )));
            }
        }
        Ok(())
    }
}
