//! Broadcast orchestration.
//!
//! A broadcast is created in strictly sequential phases: resolve the audience,
//! create the channel, create its post, then fan tasks out to every store task list
//! that could be discovered. Channel and post failures abort the broadcast; nothing
//! already created is rolled back. Task fan-out is best-effort per installation.

mod render;

pub use render::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::SecondsFormat;
use futures::future::join_all;
use serde_json::{json, Value};

use crate::audience::AudienceResolver;
use crate::config::BroadcastConfig;
use crate::directory::Clock;
use crate::discovery::InstallationDiscoverer;
use crate::errors::{AppError, AppResult};
use crate::models::{BroadcastCreated, Created, DistributionOutcome, NewBroadcast, Task};
use crate::upstream::{call_as, installations_path, Upstream, UpstreamRequest};

pub struct Broadcaster {
    upstream: Arc<dyn Upstream>,
    audience: AudienceResolver,
    discoverer: InstallationDiscoverer,
    clock: Arc<dyn Clock>,
    config: BroadcastConfig,
}

impl Broadcaster {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        audience: AudienceResolver,
        discoverer: InstallationDiscoverer,
        clock: Arc<dyn Clock>,
        config: BroadcastConfig,
    ) -> Self {
        Self {
            upstream,
            audience,
            discoverer,
            clock,
            config,
        }
    }

    /// Create the channel, its post, and distribute the tasks.
    pub async fn create(&self, broadcast: NewBroadcast) -> AppResult<BroadcastCreated> {
        if broadcast.store_users.is_empty() {
            return Err(AppError::Validation("No verified users provided.".to_string()));
        }
        let title = broadcast.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let department = normalize_department(Some(broadcast.department.as_str()));
        let deadline = broadcast
            .deadline
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let accessors = self.audience.resolve(&broadcast.store_users).await;
        tracing::info!(
            stores = broadcast.store_users.len(),
            accessors = accessors.len(),
            tasks = broadcast.tasks.len(),
            "Creating broadcast"
        );

        let name = channel_name(&department, deadline);
        let channel: Created = call_as(
            self.upstream.as_ref(),
            UpstreamRequest::post(
                installations_path(&self.config.space_id),
                json!({
                    "pluginID": self.config.plugin_id,
                    "externalID": self.clock.now().timestamp_millis().to_string(),
                    "config": {
                        "localization": {
                            "en_US": { "title": name },
                            "de_DE": { "title": name },
                        }
                    },
                    "accessorIDs": accessors,
                }),
            ),
        )
        .await
        .map_err(|e| e.in_phase("Create channel"))?;
        let channel_id = require_id(channel, "Create channel")?;

        let post: Created = call_as(
            self.upstream.as_ref(),
            UpstreamRequest::post(
                format!("/channels/{}/posts", channel_id),
                json!({
                    "contents": {
                        "en_US": {
                            "title": title,
                            "content": post_body(title, &broadcast.tasks),
                            "teaser": teaser(&department, broadcast.store_users.len(), deadline),
                            "kicker": department,
                        }
                    }
                }),
            ),
        )
        .await
        .map_err(|e| {
            tracing::error!(channel_id = %channel_id, "Post creation failed, channel left in place");
            e.in_phase("Create post")
        })?;
        let post_id = require_id(post, "Create post")?;

        let mut task_count = 0;
        if !broadcast.tasks.is_empty() {
            let store_ids: Vec<String> = broadcast
                .store_users
                .iter()
                .map(|user| user.csv_id.clone())
                .collect();
            let installations = self
                .discoverer
                .discover(&store_ids)
                .await
                .map_err(|e| e.in_phase("Discover store task lists"))?;

            let outcomes = self.distribute(title, &broadcast.tasks, &installations).await;
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            tracing::info!(
                channel_id = %channel_id,
                installations = outcomes.len(),
                failed,
                "Task distribution finished"
            );

            task_count = broadcast.tasks.len() * installations.len();
        }

        Ok(BroadcastCreated {
            channel_id,
            post_id,
            task_count,
        })
    }

    /// Create one task list per installation and every task inside it.
    ///
    /// Installations are processed in batches of `batch_size`; a batch finishes
    /// completely before the next starts. A failure only stops its own installation.
    pub async fn distribute(
        &self,
        list_name: &str,
        tasks: &[Task],
        installations: &BTreeMap<String, String>,
    ) -> Vec<DistributionOutcome> {
        let targets: Vec<(&String, &String)> = installations.iter().collect();
        let mut outcomes = Vec::with_capacity(targets.len());

        for batch in targets.chunks(self.config.batch_size.max(1)) {
            let results = join_all(batch.iter().map(|(store_id, installation_id)| {
                self.distribute_to(store_id, installation_id, list_name, tasks)
            }))
            .await;
            outcomes.extend(results);
        }

        outcomes
    }

    async fn distribute_to(
        &self,
        store_id: &str,
        installation_id: &str,
        list_name: &str,
        tasks: &[Task],
    ) -> DistributionOutcome {
        let mut outcome = DistributionOutcome {
            store_id: store_id.to_string(),
            installation_id: installation_id.to_string(),
            created: 0,
            error: None,
        };

        let list: Created = match call_as(
            self.upstream.as_ref(),
            UpstreamRequest::post(
                format!("/tasks/{}/lists", installation_id),
                json!({ "name": list_name }),
            ),
        )
        .await
        {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(store_id, installation_id, error = %err, "Task list creation failed");
                outcome.error = Some(err);
                return outcome;
            }
        };

        for task in tasks {
            let request = UpstreamRequest::post(
                format!("/tasks/{}/task", installation_id),
                task_payload(&list.id, task),
            );
            if let Err(err) = self.upstream.call(request).await {
                tracing::warn!(
                    store_id,
                    installation_id,
                    created = outcome.created,
                    error = %err,
                    "Task creation failed"
                );
                outcome.error = Some(err);
                return outcome;
            }
            outcome.created += 1;
        }

        outcome
    }

    /// Delete a broadcast's channel.
    pub async fn delete(&self, channel_id: &str) -> AppResult<()> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(AppError::Validation("Channel id is required".to_string()));
        }
        self.upstream
            .call(UpstreamRequest::delete(format!("/installations/{}", channel_id)))
            .await?;
        tracing::info!(channel_id, "Broadcast deleted");
        Ok(())
    }
}

fn task_payload(list_id: &str, task: &Task) -> Value {
    json!({
        "taskListId": list_id,
        "title": task.title,
        "description": task.description,
        "dueDate": task
            .due_date
            .map(|due| due.to_rfc3339_opts(SecondsFormat::Millis, true)),
        "status": "OPEN",
        "assigneeIds": [],
    })
}

fn require_id(created: Created, phase: &str) -> AppResult<String> {
    if created.id.is_empty() {
        return Err(AppError::Internal(format!(
            "{}: upstream returned no identifier",
            phase
        )));
    }
    Ok(created.id)
}
