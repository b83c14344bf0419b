//! Broadcast request, result and summary models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ManualTask, StoreUser, Task};
use crate::errors::AppError;

/// Everything the orchestrator needs to create one broadcast.
#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub store_users: Vec<StoreUser>,
    pub title: String,
    pub department: String,
    pub deadline: Option<String>,
    pub tasks: Vec<Task>,
}

/// Identifiers of a created broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastCreated {
    pub channel_id: String,
    pub post_id: String,
    /// Tasks times discovered installations; not a confirmed delivery count
    pub task_count: usize,
}

/// Publication state derived from the first post of a channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BroadcastStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
}

/// One row of the past-broadcasts listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastSummary {
    pub channel_id: String,
    pub title: String,
    pub department: String,
    pub user_count: usize,
    pub created_at: String,
    pub status: BroadcastStatus,
}

/// What happened when distributing tasks to one store's installation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionOutcome {
    pub store_id: String,
    pub installation_id: String,
    /// Task entries created before success or failure
    pub created: usize,
    pub error: Option<AppError>,
}

impl DistributionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Body of `POST /api/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBroadcastRequest {
    #[serde(default)]
    pub verified_users: Vec<StoreUser>,
    /// Used to resolve users through the directory when `verified_users` is empty
    #[serde(default)]
    pub store_ids: Vec<Value>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub manual_tasks: Vec<ManualTask>,
    /// Raw `title;description;date` rows from an uploaded file
    #[serde(default)]
    pub task_csv: Option<String>,
}

/// Body of `POST /api/verify-users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub store_ids: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub store_id: Option<String>,
}

/// Render a loosely typed identifier the way operators typed it.
pub fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
