//! Unit tests for the driver registry

use super::*;
use pretty_assertions::assert_eq;
use tessera_core::DriverFamily;

#[test]
fn test_empty_registry_rejects_everything() {
    let registry = DriverRegistry::new();
    for provider in ProviderKind::ALL {
        let err = registry.resolve(provider).unwrap_err();
        assert!(
            matches!(err, TesseraError::UnsupportedDriver(ref tag) if tag == provider.as_str()),
            "{err}"
        );
    }
}

#[test]
fn test_unknown_tag_is_unsupported_driver() {
    let registry = DriverRegistry::with_defaults();
    let err = registry.resolve_tag("oracle").unwrap_err();
    assert!(matches!(err, TesseraError::UnsupportedDriver(ref tag) if tag == "oracle"));
}

#[cfg(feature = "sqlite")]
#[test]
fn test_sqlite_resolves_to_relational() {
    let registry = DriverRegistry::with_defaults();
    let handle = registry.resolve_tag("sqlite3").unwrap();
    assert_eq!(handle.provider(), ProviderKind::Sqlite);
    assert_eq!(handle.family(), DriverFamily::Relational);
    assert!(handle.as_relational().is_some());
    assert!(registry.document(ProviderKind::Sqlite).is_err());
}

#[cfg(feature = "mongodb")]
#[test]
fn test_mongodb_resolves_to_document() {
    let registry = DriverRegistry::with_defaults();
    let handle = registry.resolve(ProviderKind::MongoDb).unwrap();
    assert_eq!(handle.family(), DriverFamily::Document);
    assert_eq!(handle.display_name(), "MongoDB");
    assert!(matches!(
        registry.relational(ProviderKind::MongoDb),
        Err(TesseraError::NotSupported(_))
    ));
}

#[cfg(all(feature = "sqlite", feature = "postgres", feature = "mysql", feature = "mssql", feature = "mongodb"))]
#[test]
fn test_default_features_register_every_provider() {
    assert_eq!(DriverRegistry::default().list(), ProviderKind::ALL.to_vec());
}
