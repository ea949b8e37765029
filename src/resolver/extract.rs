//! Reading primitive fields and models out of the request.

use std::sync::Arc;

use serde_json::Value;

use crate::arguments::AnyArc;
use crate::error::{Location, ValidationError};
use crate::request::RequestData;
use crate::signature::{Field, Model};

/// Reads `field` for the parameter `name`.
///
/// Found values are passed through as raw JSON. A missing field yields its
/// default, `null` when it is optional, and a [`ValidationError`] otherwise.
pub(crate) fn field(request: &RequestData, name: &str, field: &Field) -> Result<AnyArc, ValidationError> {
    let key = field.key(name);
    let value = match request.get(field.location(), &key) {
        Some(value) => value.clone(),
        None => match field.default_value() {
            Some(default) => default.clone(),
            None if !field.is_required() => Value::Null,
            None => {
                return Err(ValidationError {
                    location: field.location(),
                    key,
                    message: "field required".to_string(),
                })
            }
        },
    };
    Ok(Arc::new(value))
}

/// Deserializes `model` from the body: the whole body, or the member named
/// after the parameter when the model is embedded.
pub(crate) fn model(request: &RequestData, name: &'static str, model: &Model) -> Result<AnyArc, ValidationError> {
    let (key, raw) = if model.is_embedded() {
        let key = model.key(name);
        (key, request.get(Location::Body, key))
    } else {
        (name, request.body())
    };

    let raw = raw.ok_or_else(|| ValidationError {
        location: Location::Body,
        key: key.to_string(),
        message: "field required".to_string(),
    })?;

    (model.adapter())(raw).map_err(|err| ValidationError {
        location: Location::Body,
        key: key.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
        price: f64,
    }

    #[test]
    fn header_fields_read_dashed_keys() {
        let request = RequestData::new().with_header("User-Agent", json!("curl"));
        let value = field(&request, "user_agent", &Field::header()).unwrap();
        assert_eq!(*value.downcast::<Value>().unwrap(), json!("curl"));
    }

    #[test]
    fn missing_fields_use_default_then_null_then_fail() {
        let request = RequestData::new();

        let limit = field(&request, "limit", &Field::query().default(json!(10))).unwrap();
        assert_eq!(*limit.downcast::<Value>().unwrap(), json!(10));

        let q = field(&request, "q", &Field::query().optional()).unwrap();
        assert_eq!(*q.downcast::<Value>().unwrap(), Value::Null);

        let err = field(&request, "item_id", &Field::path()).unwrap_err();
        assert_eq!(err.location, Location::Path);
        assert_eq!(err.key, "item_id");
    }

    #[test]
    fn whole_and_embedded_models() {
        let request = RequestData::new().with_body(json!({ "name": "boots", "price": 12.5 }));
        let item = model(&request, "item", &Model::of::<Item>()).unwrap();
        assert_eq!(item.downcast::<Item>().unwrap().name, "boots");

        let request = RequestData::new().with_body(json!({ "item": { "name": "hat", "price": 3.0 } }));
        let item = model(&request, "item", &Model::of::<Item>().embed()).unwrap();
        assert_eq!(item.downcast::<Item>().unwrap().price, 3.0);
    }

    #[test]
    fn invalid_models_are_validation_errors() {
        let request = RequestData::new().with_body(json!({ "name": "boots" }));
        let err = model(&request, "item", &Model::of::<Item>()).unwrap_err();
        assert_eq!(err.location, Location::Body);
        assert!(err.message.contains("price"), "{}", err.message);

        let err = model(&RequestData::new(), "item", &Model::of::<Item>().alias("product")).unwrap_err();
        assert_eq!(err.key, "product");
    }
}
