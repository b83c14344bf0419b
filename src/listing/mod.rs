//! Past broadcast listing.
//!
//! Scans the space for announcement channels, optionally keeps only those visible to
//! one store, and enriches each with its first post. Enrichment never drops an item.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use futures::stream::{self, StreamExt};
use regex::Regex;

use crate::broadcast::DEFAULT_DEPARTMENT;
use crate::config::BroadcastConfig;
use crate::directory::{Clock, DirectoryCache};
use crate::errors::AppResult;
use crate::models::{BroadcastStatus, BroadcastSummary, Installation, Post};
use crate::upstream::{call_as, installations_path, Page, Pager, Upstream, UpstreamRequest};

const UNTITLED: &str = "Untitled";

fn department_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:Category|Department):\s*([^;]+)").expect("department pattern is valid")
    })
}

pub struct BroadcastReader {
    upstream: Arc<dyn Upstream>,
    directory: Arc<DirectoryCache>,
    clock: Arc<dyn Clock>,
    config: BroadcastConfig,
    page_size: usize,
}

impl BroadcastReader {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        directory: Arc<DirectoryCache>,
        clock: Arc<dyn Clock>,
        config: BroadcastConfig,
        page_size: usize,
    ) -> Self {
        Self {
            upstream,
            directory,
            clock,
            config,
            page_size,
        }
    }

    /// Broadcast summaries, newest first, optionally limited to one store's channels.
    ///
    /// An unknown store yields an empty list without scanning installations.
    pub async fn list(&self, store_id: Option<&str>) -> AppResult<Vec<BroadcastSummary>> {
        let target_user = match store_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(store_id) => {
                let snapshot = self.directory.get().await?;
                match snapshot.get(store_id) {
                    Some(user) => Some(user.id.clone()),
                    None => {
                        tracing::debug!(store_id, "Unknown store filter, nothing to list");
                        return Ok(Vec::new());
                    }
                }
            }
            None => None,
        };

        let mut channels = Vec::new();
        let mut pager: Pager<Installation> = Pager::new(
            self.upstream.as_ref(),
            installations_path(&self.config.space_id),
            self.page_size,
        );
        while let Some(page) = pager.next_page().await? {
            channels.extend(page.into_iter().filter(|installation| {
                installation.plugin_id == self.config.plugin_id
                    && target_user
                        .as_ref()
                        .map_or(true, |user| installation.accessor_ids.contains(user))
            }));
        }

        let mut items: Vec<BroadcastSummary> = stream::iter(channels)
            .map(|installation| self.summarize(installation))
            .buffered(self.config.batch_size.max(1))
            .collect()
            .await;

        items.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        Ok(items)
    }

    async fn summarize(&self, installation: Installation) -> BroadcastSummary {
        let title = match installation.title() {
            "" => UNTITLED.to_string(),
            title => title.to_string(),
        };
        let created_at = installation
            .created_at()
            .map(str::to_string)
            .unwrap_or_else(|| self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true));

        let mut summary = BroadcastSummary {
            channel_id: installation.id.clone(),
            title,
            department: DEFAULT_DEPARTMENT.to_string(),
            user_count: installation.accessor_ids.len(),
            created_at,
            status: BroadcastStatus::Draft,
        };

        let request = UpstreamRequest::get(format!("/channels/{}/posts", installation.id))
            .with_query("limit", 1);
        match call_as::<Page<Post>>(self.upstream.as_ref(), request).await {
            Ok(page) => {
                if let Some(post) = page.data.first() {
                    apply_post(&mut summary, post);
                }
            }
            Err(err) => {
                tracing::debug!(channel_id = %installation.id, error = %err, "Post lookup failed");
            }
        }

        summary
    }
}

/// Overlay title, department and status from a channel's first post.
pub fn apply_post(summary: &mut BroadcastSummary, post: &Post) {
    if let Some(content) = post.primary_content() {
        if !content.title.trim().is_empty() {
            summary.title = content.title.clone();
        }

        if !content.kicker.trim().is_empty() {
            summary.department = content.kicker.trim().to_string();
        } else if let Some(caps) = department_pattern().captures(&content.teaser) {
            summary.department = caps[1].trim().to_string();
        }
    }

    if post.is_published() {
        summary.status = BroadcastStatus::Published;
    } else if post.is_planned() {
        summary.status = BroadcastStatus::Scheduled;
    }
}

/// Unparseable timestamps sort after every parseable one.
fn sort_key(summary: &BroadcastSummary) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&summary.created_at).ok()
}
