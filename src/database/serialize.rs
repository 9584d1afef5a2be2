//! Relaxed Extended JSON rendering of query results.
//!
//! Identifiers, dates, regexes and binaries keep their `$oid`/`$date`/... wrappers;
//! 64-bit integers are written as exact JSON integers rather than floats.

use crate::error::{McpError, Result};
use mongodb::bson::{Bson, Document};
use serde_json::Value;

/// Render one value as relaxed Extended JSON with 2-space indentation.
pub fn to_relaxed_json(value: &Bson) -> Result<String> {
    Ok(serde_json::to_string_pretty(&value.clone().into_relaxed_extjson())?)
}

/// Render a result set as a JSON array.
pub fn documents_to_json(documents: &[Document]) -> Result<String> {
    let values: Vec<Value> = documents
        .iter()
        .map(|doc| Bson::Document(doc.clone()).into_relaxed_extjson())
        .collect();
    Ok(serde_json::to_string_pretty(&values)?)
}

/// Parse relaxed or canonical Extended JSON back into a BSON value.
pub fn from_extended_json(value: Value) -> Result<Bson> {
    Bson::try_from(value).map_err(|e| McpError::Internal {
        message: format!("Invalid extended JSON: {}", e).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{DateTime, doc, oid::ObjectId};

    #[test]
    fn test_int64_round_trip() {
        let big: i64 = 9_007_199_254_740_993;
        let doc = doc! { "n": big };

        let text = documents_to_json(std::slice::from_ref(&doc)).unwrap();
        assert!(text.contains("9007199254740993"));

        let parsed: Value = serde_json::from_str(&text).unwrap();
        let back = from_extended_json(parsed[0].clone()).unwrap();
        let Bson::Document(back) = back else {
            panic!("expected document");
        };
        assert_eq!(back.get_i64("n").unwrap(), big);
    }

    #[test]
    fn test_extended_types_preserved() {
        let id = ObjectId::new();
        let when = DateTime::from_millis(1_700_000_000_000);
        let doc = doc! { "_id": id, "at": when };

        let text = to_relaxed_json(&Bson::Document(doc)).unwrap();
        assert!(text.contains("\"$oid\""));
        assert!(text.contains("\"$date\""));

        let back = from_extended_json(serde_json::from_str(&text).unwrap()).unwrap();
        let Bson::Document(back) = back else {
            panic!("expected document");
        };
        assert_eq!(back.get_object_id("_id").unwrap(), id);
        assert_eq!(*back.get_datetime("at").unwrap(), when);
    }

    #[test]
    fn test_two_space_indentation() {
        let text = to_relaxed_json(&Bson::Document(doc! { "a": 1 })).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }
}
