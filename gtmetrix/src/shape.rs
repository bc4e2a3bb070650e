//! Predicates checking that a decoded JSON value has the shape of a given
//! API resource before it is turned into a typed entity.

use serde_json::{Map, Value};

pub const TEST_TYPE: &str = "test";
pub const REPORT_TYPE: &str = "report";
pub const USER_TYPE: &str = "user";

/// An error object: `status`, `code` and `title` must be present.
pub fn is_error(value: &Value) -> bool {
    value.as_object().is_some_and(|object| {
        object.contains_key("status") && object.contains_key("code") && object.contains_key("title")
    })
}

pub fn is_test(value: &Value) -> bool {
    typed_resource(value, TEST_TYPE).is_some()
}

pub fn is_report(value: &Value) -> bool {
    typed_resource(value, REPORT_TYPE)
        .is_some_and(|object| object.get("links").is_some_and(Value::is_object))
}

pub fn is_user(value: &Value) -> bool {
    value.as_object().is_some_and(is_user_object)
}

/// [`is_user`] for a value already known to be an object.
pub fn is_user_object(object: &Map<String, Value>) -> bool {
    is_typed_object(object, USER_TYPE)
        && object
            .get("attributes")
            .and_then(Value::as_object)
            .is_some_and(|attributes| {
                attributes.contains_key("api_credits") && attributes.contains_key("api_refill")
            })
}

fn typed_resource<'a>(value: &'a Value, kind: &str) -> Option<&'a Map<String, Value>> {
    value
        .as_object()
        .filter(|object| is_typed_object(object, kind))
}

fn is_typed_object(object: &Map<String, Value>, kind: &str) -> bool {
    object.get("type").and_then(Value::as_str) == Some(kind)
        && object.contains_key("id")
        && object.get("attributes").is_some_and(Value::is_object)
}
