//! Audience resolution for new channels.
//!
//! A channel is visible to its target stores, to every member of the operations
//! group, and to a fixed set of operators. The group lookup is best-effort.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::DirectoryConfig;
use crate::models::{StoreUser, UserRef};
use crate::upstream::{call_as, Page, Upstream, UpstreamRequest};

/// Versioned media type required by the user search endpoint.
pub const USERS_SEARCH_ACCEPT: &str = "application/vnd.staffbase.accessors.users-search.v1+json";

pub struct AudienceResolver {
    upstream: Arc<dyn Upstream>,
    ops_group_id: String,
    fixed_ops_ids: Vec<String>,
}

impl AudienceResolver {
    pub fn new(upstream: Arc<dyn Upstream>, config: &DirectoryConfig) -> Self {
        Self {
            upstream,
            ops_group_id: config.ops_group_id.clone(),
            fixed_ops_ids: config.fixed_ops_ids.clone(),
        }
    }

    /// Union of store users, operations group members and fixed operators.
    pub async fn resolve(&self, store_users: &[StoreUser]) -> BTreeSet<String> {
        let mut accessors: BTreeSet<String> =
            store_users.iter().map(|user| user.id.clone()).collect();
        accessors.extend(self.privileged_members().await);
        accessors.extend(self.fixed_ops_ids.iter().cloned());
        accessors
    }

    /// Members of the operations group, or nothing if the lookup fails.
    pub async fn privileged_members(&self) -> Vec<String> {
        if self.ops_group_id.is_empty() {
            return Vec::new();
        }

        let request = UpstreamRequest::get("/users/search")
            .with_query("filter", format!("groups eq \"{}\"", self.ops_group_id))
            .with_accept(USERS_SEARCH_ACCEPT);

        match call_as::<Page<UserRef>>(self.upstream.as_ref(), request).await {
            Ok(page) => {
                tracing::debug!(
                    group = %self.ops_group_id,
                    members = page.data.len(),
                    "Fetched operations group"
                );
                page.data.into_iter().map(|user| user.id).collect()
            }
            Err(err) => {
                tracing::warn!(
                    group = %self.ops_group_id,
                    error = %err,
                    "Operations group lookup failed, continuing without it"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::upstream::fake::FakePlatform;
    use reqwest::Method;

    fn store(id: &str, csv: &str) -> StoreUser {
        StoreUser {
            id: id.to_string(),
            csv_id: csv.to_string(),
            name: String::new(),
        }
    }

    fn resolver(platform: &Arc<FakePlatform>) -> AudienceResolver {
        let config = DirectoryConfig {
            ops_group_id: "ops".to_string(),
            fixed_ops_ids: vec!["fixed-1".to_string(), "fixed-2".to_string()],
            ..DirectoryConfig::default()
        };
        AudienceResolver::new(platform.clone(), &config)
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_union_is_deduplicated() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_group_member("ops-1");
        platform.add_group_member("fixed-1");
        platform.add_group_member("a");

        let accessors = resolver(&platform)
            .resolve(&[store("a", "S1"), store("b", "S2"), store("a", "S1")])
            .await;

        assert_eq!(accessors, set(&["a", "b", "ops-1", "fixed-1", "fixed-2"]));
    }

    #[tokio::test]
    async fn test_group_lookup_uses_filter_and_accept_header() {
        let platform = Arc::new(FakePlatform::new());
        resolver(&platform).resolve(&[]).await;

        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "/users/search");
        assert_eq!(calls[0].query_param("filter"), Some("groups eq \"ops\""));
        assert_eq!(calls[0].accept.as_deref(), Some(USERS_SEARCH_ACCEPT));
    }

    #[tokio::test]
    async fn test_group_failure_degrades_to_baseline() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_group_member("ops-1");
        platform.fail(
            Method::GET,
            "/users/search",
            AppError::Upstream {
                status: 403,
                body: "forbidden".to_string(),
            },
        );

        let accessors = resolver(&platform).resolve(&[store("a", "S1")]).await;
        assert_eq!(accessors, set(&["a", "fixed-1", "fixed-2"]));
    }

    #[tokio::test]
    async fn test_resolution_is_order_independent_and_idempotent() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_group_member("ops-1");
        let resolver = resolver(&platform);

        let users = vec![store("a", "S1"), store("b", "S2"), store("c", "S3")];
        let mut reversed = users.clone();
        reversed.reverse();

        let first = resolver.resolve(&users).await;
        let second = resolver.resolve(&reversed).await;
        let third = resolver.resolve(&users).await;

        assert_eq!(first, second);
        assert_eq!(first, third);
    }
}
