//! Discovery of per-store task-list installations.
//!
//! Store task lists are installations titled `Store #<id>` (case-insensitive, the `#`
//! and surrounding whitespace optional). The title is the only link between an
//! installation and its store.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::errors::AppResult;
use crate::models::Installation;
use crate::upstream::{installations_path, Pager, Upstream};

fn store_title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^Store\s*#?\s*([0-9A-Za-z_]+)$").expect("store title pattern is valid")
    })
}

/// Extract the store identifier encoded in an installation title.
pub fn parse_store_token(title: &str) -> Option<&str> {
    store_title_pattern()
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub struct InstallationDiscoverer {
    upstream: Arc<dyn Upstream>,
    space_id: String,
    page_size: usize,
}

impl InstallationDiscoverer {
    pub fn new(upstream: Arc<dyn Upstream>, space_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            upstream,
            space_id: space_id.into(),
            page_size,
        }
    }

    /// Map each requested store identifier to its task-list installation.
    ///
    /// Stores without a matching installation are simply absent. When two
    /// installations carry the same store title, the later one in scan order wins.
    pub async fn discover(&self, store_ids: &[String]) -> AppResult<BTreeMap<String, String>> {
        let wanted: HashSet<&str> = store_ids.iter().map(String::as_str).collect();
        let mut found = BTreeMap::new();

        let mut pager: Pager<Installation> = Pager::new(
            self.upstream.as_ref(),
            installations_path(&self.space_id),
            self.page_size,
        );

        while let Some(page) = pager.next_page().await? {
            for installation in page {
                let Some(token) = parse_store_token(installation.title()) else {
                    continue;
                };
                if !wanted.contains(token) {
                    continue;
                }
                if let Some(previous) = found.insert(token.to_string(), installation.id.clone()) {
                    tracing::debug!(
                        store_id = token,
                        previous = %previous,
                        replacement = %installation.id,
                        "Duplicate store task list title"
                    );
                }
            }
        }

        tracing::info!(
            requested = wanted.len(),
            discovered = found.len(),
            "Store installations discovered"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::fake::FakePlatform;
    use reqwest::Method;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_store_token_variants() {
        assert_eq!(parse_store_token("Store #42"), Some("42"));
        assert_eq!(parse_store_token("Store42"), Some("42"));
        assert_eq!(parse_store_token("store # 42"), Some("42"));
        assert_eq!(parse_store_token("STORE#abc_1"), Some("abc_1"));
        assert_eq!(parse_store_token("Store # abc"), Some("abc"));
    }

    #[test]
    fn test_parse_store_token_rejects_other_titles() {
        assert_eq!(parse_store_token("42"), None);
        assert_eq!(parse_store_token("Main Store #42"), None);
        assert_eq!(parse_store_token("Store #42 Berlin"), None);
        assert_eq!(parse_store_token("Store #"), None);
        assert_eq!(parse_store_token("Stores #42-b"), None);
        assert_eq!(parse_store_token(""), None);
    }

    #[tokio::test]
    async fn test_discover_keeps_only_requested_stores() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_installation("i1", "tasks", "Store #42", &[]);
        platform.add_installation("i2", "tasks", "Store # abc", &[]);
        platform.add_installation("i3", "tasks", "Store 7", &[]);
        platform.add_installation("i4", "news", "Ops - No Deadline", &[]);

        let discoverer = InstallationDiscoverer::new(platform.clone(), "space", 2);

        let numeric = discoverer.discover(&ids(&["42", "7", "99"])).await.unwrap();
        assert_eq!(numeric.len(), 2);
        assert_eq!(numeric["42"], "i1");
        assert_eq!(numeric["7"], "i3");
        assert!(!numeric.contains_key("abc"));

        let alpha = discoverer.discover(&ids(&["abc"])).await.unwrap();
        assert_eq!(alpha["abc"], "i2");
    }

    #[tokio::test]
    async fn test_discover_skips_installations_with_null_fields() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_installation("i1", "tasks", "Store #1", &[]);
        platform.add_raw_installation(serde_json::json!({
            "id": "broken",
            "pluginID": null,
            "config": { "localization": { "en_US": { "title": null } } },
            "accessorIDs": null
        }));
        platform.add_raw_installation(serde_json::json!({ "id": "bare", "config": null }));
        platform.add_installation("i3", "tasks", "Store #3", &[]);

        let discoverer = InstallationDiscoverer::new(platform.clone(), "space", 2);
        let found = discoverer.discover(&ids(&["1", "3"])).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found["1"], "i1");
        assert_eq!(found["3"], "i3");
        assert_eq!(platform.count(Method::GET, "/spaces/space/installations"), 3);
    }

    #[tokio::test]
    async fn test_duplicate_titles_last_wins() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_installation("old", "tasks", "Store #1", &[]);
        platform.add_installation("new", "tasks", "store#1", &[]);

        let discoverer = InstallationDiscoverer::new(platform.clone(), "space", 100);
        let found = discoverer.discover(&ids(&["1"])).await.unwrap();

        assert_eq!(found["1"], "new");
    }

    #[tokio::test]
    async fn test_discover_scans_every_page_of_the_space() {
        let platform = Arc::new(FakePlatform::new());
        for i in 0..5 {
            platform.add_installation(&format!("i{}", i), "tasks", &format!("Store #{}", i), &[]);
        }

        let discoverer = InstallationDiscoverer::new(platform.clone(), "space-9", 2);
        let found = discoverer.discover(&ids(&["4"])).await.unwrap();

        assert_eq!(found["4"], "i4");
        assert_eq!(platform.count(Method::GET, "/spaces/space-9/installations"), 3);
    }
}
