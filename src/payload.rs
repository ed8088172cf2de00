use serde::Serialize;
use serde_json::Value;

/// A climatology response as returned by the API.
///
/// JSON documents are kept opaque (key order preserved, fill values such as
/// `-999.0` left as they are). Other formats keep each chunk's raw body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClimatologyPayload {
    Json(Value),
    Text(Vec<String>),
}

impl ClimatologyPayload {
    /// Folds the next chunk of the same fetch into this one.
    pub fn absorb(&mut self, next: ClimatologyPayload) {
        match (self, next) {
            (ClimatologyPayload::Json(acc), ClimatologyPayload::Json(v)) => deep_merge(acc, v),
            (ClimatologyPayload::Text(acc), ClimatologyPayload::Text(v)) => acc.extend(v),
            (this, next) => *this = next,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ClimatologyPayload::Json(v) => Some(v),
            ClimatologyPayload::Text(_) => None,
        }
    }

    /// `properties.parameter.<code>` of a JSON payload.
    pub fn parameter(&self, code: &str) -> Option<&Value> {
        self.as_json()?.get("properties")?.get("parameter")?.get(code)
    }

    /// Codes present under `properties.parameter`, in response order.
    pub fn parameter_codes(&self) -> Vec<&str> {
        self.as_json()
            .and_then(|v| v.get("properties"))
            .and_then(|v| v.get("parameter"))
            .and_then(Value::as_object)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Recursive union of two JSON values: objects are merged key by key and
/// anything else is replaced by `incoming`.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}
