//! Lazy JSON values
//!
//! `json` and `jsonb` columns arrive as text. Parsing is deferred: the raw
//! server text is kept verbatim and only turned into a `serde_json::Value`
//! (or a user type) when asked.

use serde::de::DeserializeOwned;

/// A JSON value decoded from a `json`/`jsonb` column, parsed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json {
    raw: String,
}

impl Json {
    pub(crate) fn from_raw(raw: String) -> Self {
        Self { raw }
    }

    /// The raw JSON text exactly as the server sent it
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parse into a [`serde_json::Value`]
    pub fn value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.raw)
    }

    /// Deserialize into any [`serde::Deserialize`] type
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.raw)
    }
}

impl std::fmt::Display for Json {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_is_kept_verbatim() {
        let json = Json::from_raw("{\"a\": 1}".to_string());
        assert_eq!(json.as_str(), "{\"a\": 1}");
    }

    #[test]
    fn test_scalar_string_round_trip() {
        // `SELECT 'foo'::jsonb` arrives as the JSON text `"foo"`
        let json = Json::from_raw("\"foo\"".to_string());
        let value = json.value().unwrap();
        assert_eq!(value, serde_json::Value::String("foo".to_string()));
        assert_eq!(value.to_string(), "\"foo\"");
    }

    #[test]
    fn test_deserialize_into_map() {
        let json = Json::from_raw("{\"x\": 3, \"y\": 4}".to_string());
        let p: std::collections::HashMap<String, i32> = json.deserialize().unwrap();
        assert_eq!(p["x"], 3);
        assert_eq!(p["y"], 4);
    }

    #[test]
    fn test_invalid_json_fails_only_on_parse() {
        let json = Json::from_raw("not json".to_string());
        assert_eq!(json.as_str(), "not json");
        assert!(json.value().is_err());
    }
}
