//! Unit tests for MongoDB JSON conversion

use super::*;
use bson::{Bson, doc, oid::ObjectId};
use serde_json::json;
use tessera_core::TesseraError;

// ============================================================================
// Filter Parsing Tests
// ============================================================================

mod filter_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_filter_is_empty_document() {
        assert!(parse_json_document(None).unwrap().is_empty());
        assert!(parse_json_document(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn test_plain_filter() {
        let filter = parse_json_document(Some(r#"{"age": {"$gt": 30}, "name": "Ada"}"#)).unwrap();
        assert_eq!(filter.get_str("name").unwrap(), "Ada");
        assert_eq!(filter.get_document("age").unwrap(), &doc! { "$gt": 30 });
    }

    #[test]
    fn test_extended_json_object_id() {
        let hex = "65a1f0c2b3d4e5f601234567";
        let filter = parse_json_document(Some(&format!(r#"{{"_id": {{"$oid": "{}"}}}}"#, hex)))
            .unwrap();
        assert_eq!(
            filter.get("_id"),
            Some(&Bson::ObjectId(ObjectId::parse_str(hex).unwrap()))
        );
    }

    #[test]
    fn test_sort_document_keeps_key_order() {
        let sort = parse_json_document(Some(r#"{"last": 1, "first": -1}"#)).unwrap();
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["last", "first"]);
    }

    #[test]
    fn test_invalid_json_is_query_error() {
        let err = parse_json_document(Some("{name: ")).unwrap_err();
        assert!(matches!(err, TesseraError::Query(_)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_json_document(Some("[1, 2]")).unwrap_err();
        assert!(matches!(err, TesseraError::Query(_)));
    }
}

// ============================================================================
// Relaxed Rendering Tests
// ============================================================================

mod rendering_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relaxed_numbers_are_plain() {
        let rendered = to_relaxed_json(doc! { "n": 3_i32, "big": 5_i64, "ratio": 0.5 });
        assert_eq!(rendered, json!({ "n": 3, "big": 5, "ratio": 0.5 }));
    }

    #[test]
    fn test_object_id_uses_oid_wrapper() {
        let oid = ObjectId::parse_str("65a1f0c2b3d4e5f601234567").unwrap();
        let rendered = to_relaxed_json(doc! { "_id": oid });
        assert_eq!(rendered, json!({ "_id": { "$oid": "65a1f0c2b3d4e5f601234567" } }));
    }

    #[test]
    fn test_nested_documents_and_arrays() {
        let rendered = to_relaxed_json(doc! { "tags": ["a", "b"], "address": { "city": "Oslo" } });
        assert_eq!(rendered, json!({ "tags": ["a", "b"], "address": { "city": "Oslo" } }));
    }
}
