//! Store users as seen through the platform user directory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient::null_as_default;

/// A platform user that represents a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreUser {
    /// Platform user identifier
    pub id: String,
    /// External store identifier typed in by operators
    pub csv_id: String,
    #[serde(default)]
    pub name: String,
}

/// A raw record from `GET /users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profile: HashMap<String, Value>,
}

impl DirectoryUser {
    /// Convert to a store user if the profile carries a store identifier under `attribute`.
    pub fn to_store_user(&self, attribute: &str) -> Option<StoreUser> {
        let csv_id = match self.profile.get(attribute)? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string();

        Some(StoreUser {
            id: self.id.clone(),
            csv_id,
            name,
        })
    }
}

/// Minimal user reference returned by directory searches.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub id: String,
}

/// Result of checking operator-supplied store identifiers against the directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub found_users: Vec<StoreUser>,
    pub not_found_ids: Vec<String>,
}
