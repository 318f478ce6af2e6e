//! JSON-safe value cleaning
//!
//! Flattens arbitrary serializable data into plain `serde_json::Value`s so
//! it can be dumped, diffed, or persisted without surprises.

use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

/// Convert any serializable value into a JSON-safe [`Value`].
///
/// Anything `serde_json` refuses to represent (map keys that are neither
/// strings nor integers, serializers that error) is stringified via its
/// `Debug` rendering instead of failing. Non-finite floats become `null`,
/// following `serde_json`'s own rule.
pub fn clean<T: Serialize + Debug>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")))
}

/// Empty-to-`None` normalization.
pub fn or_none(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Serde helper encoding byte fields as base64 strings in JSON.
///
/// Usage: `#[serde(with = "magpie_core::base64_bytes")]` on a `Vec<u8>`
/// field.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[test]
    fn test_clean_struct_to_object() {
        let record = Record {
            name: "feeds".to_string(),
            count: 3,
        };
        assert_eq!(clean(&record), json!({"name": "feeds", "count": 3}));
    }

    #[test]
    fn test_clean_datetime_to_iso_string() {
        let time = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let cleaned = clean(&time);
        assert_eq!(cleaned, json!("2024-05-01T10:30:00Z"));
    }

    #[test]
    fn test_clean_integer_map_keys_become_strings() {
        let mut map = BTreeMap::new();
        map.insert(7i64, "seen");
        assert_eq!(clean(&map), json!({"7": "seen"}));
    }

    #[test]
    fn test_clean_unrepresentable_falls_back_to_string() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8, 2], "bytes-keyed");
        let cleaned = clean(&map);
        assert!(cleaned.is_string());
        assert!(cleaned.as_str().unwrap().contains("bytes-keyed"));
    }

    #[test]
    fn test_clean_non_finite_float_is_null() {
        assert_eq!(clean(&f64::NAN), Value::Null);
    }

    #[test]
    fn test_or_none() {
        assert_eq!(or_none(""), None);
        assert_eq!(or_none("x"), Some("x"));
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Blob {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn test_base64_bytes_round_trip() {
        let blob = Blob {
            data: vec![0, 159, 146, 150],
        };
        let encoded = serde_json::to_string(&blob).unwrap();
        assert!(encoded.contains("AJ+Slg=="));
        let decoded: Blob = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, blob);
    }
}
