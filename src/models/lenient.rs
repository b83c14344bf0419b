//! Serde helpers for upstream records that send `null` where a value is optional.

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as `T::default()`. Pair with `#[serde(default)]` to also cover a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
    }

    #[test]
    fn test_null_and_missing_become_default() {
        let nulls: Record = serde_json::from_value(json!({ "tags": null, "name": null })).unwrap();
        assert!(nulls.tags.is_empty());
        assert_eq!(nulls.name, "");

        let missing: Record = serde_json::from_value(json!({})).unwrap();
        assert!(missing.tags.is_empty());

        let present: Record = serde_json::from_value(json!({ "tags": ["a"], "name": "x" })).unwrap();
        assert_eq!(present.tags, vec!["a"]);
        assert_eq!(present.name, "x");
    }

    #[test]
    fn test_wrong_type_is_still_an_error() {
        assert!(serde_json::from_value::<Record>(json!({ "tags": "a" })).is_err());
    }
}
