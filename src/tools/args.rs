//! Argument decoding shared by the tools.
//!
//! Structured arguments arrive as JSON and are read as Extended JSON so that
//! typed values such as `{"$oid": ...}` reach the server intact.

use crate::database::from_extended_json;
use crate::error::{Result, ToolError};
use mongodb::bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize a tool's argument object.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()).into())
}

/// Decode an optional JSON object argument into a document.
pub fn parse_document(value: Option<Value>, field: &str) -> Result<Option<Document>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => match from_extended_json(value) {
            Ok(Bson::Document(doc)) => Ok(Some(doc)),
            Ok(_) => Err(ToolError::InvalidArguments(format!("'{}' must be a document", field)).into()),
            Err(e) => Err(ToolError::InvalidArguments(format!("{}: {}", field, e)).into()),
        },
        Some(_) => Err(ToolError::InvalidArguments(format!("'{}' must be an object", field)).into()),
    }
}

/// Decode a JSON array of stage objects.
pub fn parse_pipeline(value: Value) -> Result<Vec<Document>> {
    let Value::Array(stages) = value else {
        return Err(ToolError::InvalidArguments("'pipeline' must be an array".into()).into());
    };

    stages
        .into_iter()
        .enumerate()
        .map(|(index, stage)| -> Result<Document> {
            parse_document(Some(stage), "pipeline")?.ok_or_else(|| {
                ToolError::InvalidArguments(format!("pipeline stage {} is null", index)).into()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn test_parse_document_extended_json() {
        let id = ObjectId::new();
        let doc = parse_document(Some(json!({ "_id": { "$oid": id.to_hex() } })), "filter")
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_object_id("_id").unwrap(), id);
    }

    #[test]
    fn test_parse_document_absent() {
        assert!(parse_document(None, "filter").unwrap().is_none());
        assert!(parse_document(Some(Value::Null), "filter").unwrap().is_none());
    }

    #[test]
    fn test_parse_document_rejects_non_object() {
        assert!(parse_document(Some(json!([1, 2])), "filter").is_err());
        assert!(parse_document(Some(json!("x")), "filter").is_err());
        assert!(parse_document(Some(json!({ "$oid": ObjectId::new().to_hex() })), "filter").is_err());
    }

    #[test]
    fn test_parse_pipeline() {
        let pipeline =
            parse_pipeline(json!([{ "$match": { "a": 1 } }, { "$limit": 5 }])).unwrap();
        assert_eq!(pipeline, vec![doc! { "$match": { "a": 1 } }, doc! { "$limit": 5 }]);

        assert!(parse_pipeline(json!({ "$match": {} })).is_err());
        assert!(parse_pipeline(json!([1])).is_err());
    }
}
