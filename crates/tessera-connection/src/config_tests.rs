//! Unit tests for the connections file

use super::*;
use std::time::Duration;
use tessera_core::{ProviderKind, TesseraError};

const SAMPLE: &str = r#"
[settings]
setup_port_timeout_secs = 20

[settings.document]
connect = 2
query = 45

[[connection]]
name = "local"
url = "./dev.db"

[[connection]]
name = "staging"
url = "postgres://app@localhost:15432/app"
read_only = true

[[connection.commands]]
run = "ssh -N -L 15432:db.internal:5432 bastion"
background = true
wait_port = 15432

[[connection]]
name = "legacy"
provider = "sqlserver"
url = "Server=tcp:legacy,1433;User Id=sa;Password=pw"
"#;

// ============================================================================
// Parsing Tests
// ============================================================================

mod parsing_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_file() {
        let file = ConnectionsFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(file.settings.setup_port_timeout(), Duration::from_secs(20));
        assert_eq!(file.settings.document.connect, Duration::from_secs(2));
        assert_eq!(file.settings.document.query, Duration::from_secs(45));
        assert_eq!(file.connections.len(), 3);

        let staging = file.find("staging").unwrap();
        assert!(staging.read_only);
        assert_eq!(
            staging.commands,
            vec![SetupCommand::new("ssh -N -L 15432:db.internal:5432 bastion")
                .background()
                .wait_port(15432)]
        );
    }

    #[test]
    fn test_missing_settings_use_defaults() {
        let file = ConnectionsFile::from_toml_str("[[connection]]\nname = \"a\"\nurl = \":memory:\"\n")
            .unwrap();
        assert_eq!(file.settings, ClientSettings::default());
        assert_eq!(file.settings.setup_port_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(ConnectionsFile::from_toml_str("").unwrap(), ConnectionsFile::default());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = "[[connection]]\nname = \"a\"\nurl = \"x.db\"\n[[connection]]\nname = \"a\"\nurl = \"y.db\"\n";
        let err = ConnectionsFile::from_toml_str(content).unwrap_err();
        assert!(matches!(err, TesseraError::Configuration(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let content = "[[connection]]\nname = \"a\"\nprovider = \"oracle\"\nurl = \"x\"\n";
        assert!(matches!(
            ConnectionsFile::from_toml_str(content),
            Err(TesseraError::Configuration(_))
        ));
    }
}

// ============================================================================
// Provider Resolution Tests
// ============================================================================

mod provider_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_provider_inferred_from_url() {
        let file = ConnectionsFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            file.find("local").unwrap().resolve_provider().unwrap(),
            ProviderKind::Sqlite
        );
        assert_eq!(
            file.find("staging").unwrap().resolve_provider().unwrap(),
            ProviderKind::Postgres
        );
    }

    #[test]
    fn test_explicit_provider_wins() {
        let file = ConnectionsFile::from_toml_str(SAMPLE).unwrap();
        let config = file.find("legacy").unwrap().to_config().unwrap();
        assert_eq!(config.provider, ProviderKind::Mssql);
        assert_eq!(config.name, "legacy");
        assert!(!config.read_only);
    }

    #[test]
    fn test_uninferable_url_is_unsupported() {
        let saved = SavedConnection::new("cache", "redis://localhost");
        assert!(matches!(saved.to_config(), Err(TesseraError::UnsupportedDriver(_))));
    }
}

// ============================================================================
// Persistence Tests
// ============================================================================

mod persistence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConnectionsFile::load(&dir.path().join("none.toml")).await.unwrap();
        assert!(file.connections.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("connections.toml");

        let mut file = ConnectionsFile::default();
        file.upsert(
            SavedConnection::new("tunnel", "mysql://root@127.0.0.1:13306/shop")
                .read_only(true)
                .with_command(SetupCommand::new("./open-tunnel.sh").background().wait_port(13306)),
        );
        file.upsert(SavedConnection::new("docs", "mongodb://localhost").with_provider(ProviderKind::MongoDb));
        file.save(&path).await.unwrap();

        let loaded = ConnectionsFile::load(&path).await.unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut file = ConnectionsFile::default();
        file.upsert(SavedConnection::new("a", "one.db"));
        file.upsert(SavedConnection::new("a", "two.db"));
        assert_eq!(file.connections.len(), 1);
        assert_eq!(file.find("a").unwrap().url, "two.db");
        assert!(file.remove("a").is_some());
        assert!(file.remove("a").is_none());
    }
}
