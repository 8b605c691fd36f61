//! Forgiving deserializers for model-generated fields.
//!
//! Models emit `"seq": "2"` as often as `"seq": 2`. These helpers accept both
//! and turn anything unusable into `None` instead of rejecting the item.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Integer from a number or numeric string; anything else is `None`.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Text from a string, number or bool; `null` and empty strings are `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Item {
        #[serde(default, deserialize_with = "opt_i64")]
        seq: Option<i64>,
        #[serde(default, deserialize_with = "opt_string")]
        detail: Option<String>,
    }

    fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(item(json!({"seq": 3})).seq, Some(3));
        assert_eq!(item(json!({"seq": " 4 "})).seq, Some(4));
        assert_eq!(item(json!({"seq": 2.0})).seq, Some(2));
    }

    #[test]
    fn test_unusable_values_become_none() {
        assert_eq!(item(json!({"seq": "first"})).seq, None);
        assert_eq!(item(json!({"seq": null})).seq, None);
        assert_eq!(item(json!({})).seq, None);
        assert_eq!(item(json!({"detail": "  "})).detail, None);
        assert_eq!(item(json!({"detail": 12})).detail.as_deref(), Some("12"));
    }
}
