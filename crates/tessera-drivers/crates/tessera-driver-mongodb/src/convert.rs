//! JSON <-> BSON conversion for filters and result documents

use bson::{Bson, Document};
use tessera_core::{Result, TesseraError};

/// Parse a filter or sort given as (extended) JSON.
///
/// Blank input is the empty document. `{"_id": {"$oid": "..."}}` and the
/// other canonical/relaxed forms are understood.
pub fn parse_json_document(input: Option<&str>) -> Result<Document> {
    let Some(text) = input.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Document::new());
    };

    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| TesseraError::Query(format!("Invalid JSON document: {}", e)))?;

    match Bson::try_from(json) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(TesseraError::Query(format!(
            "Expected a JSON object, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(TesseraError::Query(format!("Invalid extended JSON: {}", e))),
    }
}

/// Render a document the way the grid shows it: relaxed extended JSON.
pub fn to_relaxed_json(document: Document) -> serde_json::Value {
    Bson::Document(document).into_relaxed_extjson()
}
