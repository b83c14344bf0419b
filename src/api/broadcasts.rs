//! Broadcast API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{
    id_to_string, BroadcastCreated, BroadcastSummary, CreateBroadcastRequest, ListQuery,
    NewBroadcast,
};
use crate::{tasks, AppState};

/// POST /api/create - Create a channel, its post and the store tasks.
pub async fn create_broadcast(
    State(state): State<AppState>,
    Json(request): Json<CreateBroadcastRequest>,
) -> ApiResult<BroadcastCreated> {
    let mut store_users = request.verified_users;

    // Fall back to resolving raw store ids when the page did not verify first
    if store_users.is_empty() && !request.store_ids.is_empty() {
        let store_ids: Vec<String> = request.store_ids.iter().map(id_to_string).collect();
        let snapshot = state.directory.get().await?;
        store_users = snapshot.resolve(&store_ids);
    }

    let tasks = tasks::aggregate(request.task_csv.as_deref(), request.manual_tasks);

    let created = state
        .broadcaster
        .create(NewBroadcast {
            store_users,
            title: request.title,
            department: request.department.unwrap_or_default(),
            deadline: request.deadline,
            tasks,
        })
        .await?;

    success(created)
}

/// GET /api/items - List past broadcasts, optionally for one store.
pub async fn list_broadcasts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<BroadcastSummary>> {
    let items = state.reader.list(query.store_id.as_deref()).await?;
    success(items)
}

/// DELETE /api/delete/:id - Delete a broadcast's channel.
pub async fn delete_broadcast(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.broadcaster.delete(&id).await?;
    success(())
}
