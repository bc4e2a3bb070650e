use crate::error::{json_to_string, FailurePayload, GtmetrixError, GtmetrixResult};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

/// The JSON:API record behind a test or a report.
///
/// Known members are kept in typed fields; any other top-level member is
/// preserved in `extra` so that serialising the record gives back what the
/// API sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceData {
    /// Converts a decoded value into a record if `check` accepts it,
    /// otherwise reports a protocol failure with `message`.
    pub(crate) fn checked(
        value: Value,
        check: fn(&Value) -> bool,
        message: &str,
        status: Option<StatusCode>,
    ) -> GtmetrixResult<Self> {
        if !check(&value) {
            return Err(GtmetrixError::failure(
                message,
                status,
                FailurePayload::Json(value),
            ));
        }

        match value {
            Value::Object(object) => Ok(Self::from_object(object)),
            other => Err(GtmetrixError::failure(
                message,
                status,
                FailurePayload::Json(other),
            )),
        }
    }

    fn from_object(mut object: Map<String, Value>) -> Self {
        let kind = object
            .remove("type")
            .map(|value| json_to_string(&value))
            .unwrap_or_default();
        let id = object
            .remove("id")
            .map(|value| json_to_string(&value))
            .unwrap_or_default();
        let attributes = match object.remove("attributes") {
            Some(Value::Object(attributes)) => attributes,
            _ => Map::new(),
        };
        let links = match object.remove("links") {
            Some(Value::Object(links)) => Some(links),
            _ => None,
        };

        Self {
            kind,
            id,
            attributes,
            links,
            extra: object,
        }
    }

    /// Overwrites every member present in `fresh`, keeping members `fresh`
    /// does not carry.
    pub(crate) fn update(&mut self, fresh: ResourceData) {
        self.kind = fresh.kind;
        self.id = fresh.id;
        self.attributes = fresh.attributes;
        if fresh.links.is_some() {
            self.links = fresh.links;
        }
        self.extra.extend(fresh.extra);
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.get(name))
            .and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;
    use serde_json::json;

    #[test]
    fn test_checked_accepts_test_shape() {
        let value = json!({
            "type": "test",
            "id": "a",
            "attributes": {"n": 1},
            "links": {"report": "https://gtmetrix.com/api/2.0/reports/r"},
            "meta": {"credits_left": 10}
        });
        let data = ResourceData::checked(value.clone(), shape::is_test, "non-test", None).unwrap();
        assert_eq!(data.kind, "test");
        assert_eq!(data.id, "a");
        assert_eq!(data.attribute("n"), Some(&json!(1)));
        assert_eq!(data.link("report"), Some("https://gtmetrix.com/api/2.0/reports/r"));
        assert_eq!(data.extra.get("meta"), Some(&json!({"credits_left": 10})));
        assert_eq!(data.to_value(), value);
    }

    #[test]
    fn test_checked_rejects_missing_attributes() {
        let err = ResourceData::checked(
            json!({"type": "test", "id": "a"}),
            shape::is_test,
            "API returned non-test for a test",
            Some(StatusCode::OK),
        )
        .unwrap_err();
        let failure = err.as_failure().unwrap();
        assert_eq!(failure.message, "API returned non-test for a test");
        assert_eq!(
            failure.payload,
            FailurePayload::Json(json!({"type": "test", "id": "a"}))
        );
    }

    #[test]
    fn test_numeric_id_is_kept_as_text() {
        let data = ResourceData::checked(
            json!({"type": "test", "id": 17, "attributes": {}}),
            shape::is_test,
            "non-test",
            None,
        )
        .unwrap();
        assert_eq!(data.id, "17");
    }

    #[test]
    fn test_update_replaces_present_members() {
        let mut data = ResourceData::checked(
            json!({
                "type": "test",
                "id": "a",
                "attributes": {"n": 1, "state": "started"},
                "links": {"self": "tests/a"}
            }),
            shape::is_test,
            "non-test",
            None,
        )
        .unwrap();
        let fresh = ResourceData::checked(
            json!({"type": "test", "id": "a", "attributes": {"n": 2}}),
            shape::is_test,
            "non-test",
            None,
        )
        .unwrap();

        data.update(fresh);
        assert_eq!(data.attribute("n"), Some(&json!(2)));
        assert_eq!(data.attribute("state"), None);
        assert_eq!(data.link("self"), Some("tests/a"));
    }
}
