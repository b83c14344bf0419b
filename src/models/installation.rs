//! Upstream installation (channel / task list) and post records.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::lenient::null_as_default;

/// Locale key whose title is treated as canonical.
pub const PRIMARY_LOCALE: &str = "en_US";

/// A plugin installation inside a space.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "pluginID", default, deserialize_with = "null_as_default")]
    pub plugin_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: InstallationConfig,
    #[serde(rename = "accessorIDs", default, deserialize_with = "null_as_default")]
    pub accessor_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallationConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub localization: HashMap<String, Option<LocalizedTitle>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedTitle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

impl Installation {
    /// Title in the primary locale, or an empty string.
    pub fn title(&self) -> &str {
        self.config
            .localization
            .get(PRIMARY_LOCALE)
            .and_then(Option::as_ref)
            .map(|l| l.title.as_str())
            .unwrap_or_default()
    }

    /// Creation timestamp as reported upstream, if any.
    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.created.as_deref())
    }
}

/// A post inside a channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "null_as_default")]
    pub contents: HashMap<String, Option<PostContent>>,
    #[serde(default)]
    pub published: Option<Value>,
    #[serde(default)]
    pub planned: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teaser: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kicker: String,
}

impl Post {
    pub fn primary_content(&self) -> Option<&PostContent> {
        self.contents.get(PRIMARY_LOCALE).and_then(Option::as_ref)
    }

    pub fn is_published(&self) -> bool {
        self.published.as_ref().is_some_and(is_set)
    }

    pub fn is_planned(&self) -> bool {
        self.planned.as_ref().is_some_and(is_set)
    }
}

/// Publication flags are timestamps or booleans; anything non-empty counts as set.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Identifier returned by creation endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Created {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}
