//! Driver traits and the connection record passed to them

use crate::{Connection, Result, TesseraError};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::Arc;

/// The closed set of backends a connection can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    MySql,
    Postgres,
    Sqlite,
    Mssql,
    MongoDb,
}

/// Which contract a provider's driver implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFamily {
    Relational,
    Document,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::MySql,
        ProviderKind::Postgres,
        ProviderKind::Sqlite,
        ProviderKind::Mssql,
        ProviderKind::MongoDb,
    ];

    /// Canonical tag, also the registry key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::MySql => "mysql",
            ProviderKind::Postgres => "postgres",
            ProviderKind::Sqlite => "sqlite",
            ProviderKind::Mssql => "mssql",
            ProviderKind::MongoDb => "mongodb",
        }
    }

    pub fn family(&self) -> DriverFamily {
        match self {
            ProviderKind::MongoDb => DriverFamily::Document,
            _ => DriverFamily::Relational,
        }
    }

    /// Infer the provider from a connection URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some((scheme, _)) = lower.split_once("://") {
            return match scheme {
                "postgres" | "postgresql" => Ok(ProviderKind::Postgres),
                "mysql" | "mariadb" => Ok(ProviderKind::MySql),
                "sqlite" | "sqlite3" | "file" => Ok(ProviderKind::Sqlite),
                "sqlserver" | "mssql" => Ok(ProviderKind::Mssql),
                "mongodb" | "mongodb+srv" => Ok(ProviderKind::MongoDb),
                other => Err(TesseraError::UnsupportedDriver(other.to_string())),
            };
        }

        if lower.starts_with("file:")
            || lower == ":memory:"
            || [".db", ".sqlite", ".sqlite3"]
                .iter()
                .any(|ext| lower.ends_with(ext))
        {
            return Ok(ProviderKind::Sqlite);
        }

        if lower.starts_with("server=") || lower.contains(";server=") {
            return Ok(ProviderKind::Mssql);
        }

        Err(TesseraError::UnsupportedDriver(format!(
            "cannot infer a driver from '{}'",
            trimmed
        )))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TesseraError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(ProviderKind::MySql),
            "postgres" | "postgresql" | "pg" => Ok(ProviderKind::Postgres),
            "sqlite" | "sqlite3" => Ok(ProviderKind::Sqlite),
            "mssql" | "sqlserver" => Ok(ProviderKind::Mssql),
            "mongodb" | "mongo" => Ok(ProviderKind::MongoDb),
            other => Err(TesseraError::UnsupportedDriver(other.to_string())),
        }
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything a driver needs to open a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Display name, used in logs
    pub name: String,
    pub provider: ProviderKind,
    /// Connection string or URL in the backend's native form
    pub url: String,
    /// Rejects free-form mutations and pending-change commits
    pub read_only: bool,
}

impl ConnectionConfig {
    pub fn new(provider: ProviderKind, url: impl Into<String>) -> Self {
        Self {
            name: provider.as_str().to_string(),
            provider,
            url: url.into(),
            read_only: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// A relational database driver
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Human readable name
    fn display_name(&self) -> &'static str;

    /// Open a live connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Check reachability. No handle outlives the probe.
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        let probe = conn.query("SELECT 1", &[]).await;
        let closed = conn.close().await;
        probe?;
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tags_parse_case_insensitively() {
        assert_eq!("PostgreSQL".parse::<ProviderKind>().ok(), Some(ProviderKind::Postgres));
        assert_eq!("mariadb".parse::<ProviderKind>().ok(), Some(ProviderKind::MySql));
        assert_eq!("sqlserver".parse::<ProviderKind>().ok(), Some(ProviderKind::Mssql));
        assert_eq!("mongo".parse::<ProviderKind>().ok(), Some(ProviderKind::MongoDb));
    }

    #[test]
    fn unknown_tag_is_unsupported_driver() {
        let err = "oracle".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, TesseraError::UnsupportedDriver(ref tag) if tag == "oracle"));
    }

    #[test]
    fn provider_inferred_from_url() {
        let cases = [
            ("postgres://u@localhost/db", ProviderKind::Postgres),
            ("postgresql://u@localhost/db", ProviderKind::Postgres),
            ("mysql://root@127.0.0.1:3306/shop", ProviderKind::MySql),
            ("sqlite:///tmp/app.db", ProviderKind::Sqlite),
            ("./data/app.sqlite", ProviderKind::Sqlite),
            (":memory:", ProviderKind::Sqlite),
            ("sqlserver://sa:pw@localhost:1433?database=master", ProviderKind::Mssql),
            ("server=tcp:localhost,1433;user=sa", ProviderKind::Mssql),
            ("mongodb+srv://cluster.example.net", ProviderKind::MongoDb),
        ];
        for (url, expected) in cases {
            assert_eq!(ProviderKind::from_url(url).ok(), Some(expected), "{}", url);
        }
        assert!(ProviderKind::from_url("redis://localhost").is_err());
    }

    #[test]
    fn family_split() {
        assert_eq!(ProviderKind::MongoDb.family(), DriverFamily::Document);
        assert_eq!(ProviderKind::Sqlite.family(), DriverFamily::Relational);
    }
}
