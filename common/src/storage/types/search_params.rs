use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Request fields the worker needs to run a resource search.
///
/// Only `location` is interpreted by the job pipeline. Everything else a
/// client sends (stage metadata, assessment answers) rides along in `extra`
/// and is handed to the searcher untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchParams {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchParams {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            preference: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    /// Builds params from a raw request object, rejecting a missing or blank `location`.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, AppError> {
        let location = match payload.remove("location") {
            Some(Value::String(location)) if !location.trim().is_empty() => location,
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(AppError::Validation("location is required".into()))
            }
            Some(_) => return Err(AppError::Validation("location must be a string".into())),
        };

        let preference = match payload.remove("preference") {
            Some(Value::String(preference)) => Some(preference),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(AppError::Validation("preference must be a string".into()))
            }
        };

        Ok(Self {
            location,
            preference,
            extra: payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn keeps_unknown_fields_verbatim() {
        let params = SearchParams::from_payload(object(json!({
            "location": "Austin, TX",
            "preference": "both",
            "stage": { "name": "contemplation", "score": 7 }
        })))
        .expect("valid payload");

        assert_eq!(params.location, "Austin, TX");
        assert_eq!(params.preference.as_deref(), Some("both"));
        assert_eq!(params.extra.get("stage"), Some(&json!({ "name": "contemplation", "score": 7 })));

        let serialized = serde_json::to_value(&params).expect("serialize");
        assert_eq!(serialized["stage"]["score"], 7);
        assert_eq!(serialized["location"], "Austin, TX");
    }

    #[test]
    fn rejects_missing_or_blank_location() {
        for payload in [json!({}), json!({ "location": "   " }), json!({ "location": null })] {
            let err = SearchParams::from_payload(object(payload)).expect_err("should reject");
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn rejects_non_string_location() {
        let err = SearchParams::from_payload(object(json!({ "location": 78701 })))
            .expect_err("should reject");
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("string")));
    }
}
