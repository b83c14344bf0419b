//! In-memory stand-in for the platform API, used by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{Upstream, UpstreamRequest};
use crate::errors::{AppError, AppResult};

type FailureRule = Box<dyn Fn(&UpstreamRequest) -> Option<AppError> + Send + Sync>;

#[derive(Default)]
struct PlatformState {
    users: Vec<Value>,
    group_members: Vec<String>,
    installations: Vec<Value>,
    posts: HashMap<String, Vec<Value>>,
    lists: HashMap<String, Vec<String>>,
    tasks: HashMap<String, Vec<Value>>,
    next_id: u64,
}

/// Records every call and answers from mutable in-memory collections.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
    calls: Mutex<Vec<UpstreamRequest>>,
    failures: Mutex<Vec<FailureRule>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: &str, first: &str, last: &str, store_id: Option<&str>) {
        let profile = match store_id {
            Some(store) => json!({ "storeId": store }),
            None => json!({}),
        };
        self.state.lock().unwrap().users.push(json!({
            "id": id,
            "firstName": first,
            "lastName": last,
            "profile": profile,
        }));
    }

    /// Push a user record exactly as the platform would send it.
    pub fn add_raw_user(&self, user: Value) {
        self.state.lock().unwrap().users.push(user);
    }

    pub fn clear_users(&self) {
        self.state.lock().unwrap().users.clear();
    }

    pub fn add_group_member(&self, id: &str) {
        self.state.lock().unwrap().group_members.push(id.to_string());
    }

    pub fn add_installation(&self, id: &str, plugin: &str, title: &str, accessors: &[&str]) {
        self.add_installation_at(id, plugin, title, accessors, "2026-01-01T00:00:00.000Z");
    }

    pub fn add_installation_at(
        &self,
        id: &str,
        plugin: &str,
        title: &str,
        accessors: &[&str],
        created_at: &str,
    ) {
        self.state.lock().unwrap().installations.push(json!({
            "id": id,
            "pluginID": plugin,
            "config": { "localization": { "en_US": { "title": title } } },
            "accessorIDs": accessors,
            "createdAt": created_at,
        }));
    }

    pub fn add_raw_installation(&self, installation: Value) {
        self.state.lock().unwrap().installations.push(installation);
    }

    pub fn add_post(&self, channel_id: &str, post: Value) {
        self.state
            .lock()
            .unwrap()
            .posts
            .entry(channel_id.to_string())
            .or_default()
            .push(post);
    }

    /// Fail every call matching `method` whose path starts with `prefix`.
    pub fn fail(&self, method: Method, prefix: &str, error: AppError) {
        let prefix = prefix.to_string();
        self.fail_when(move |req| {
            (req.method == method && req.path.starts_with(&prefix)).then(|| error.clone())
        });
    }

    pub fn fail_when(
        &self,
        rule: impl Fn(&UpstreamRequest) -> Option<AppError> + Send + Sync + 'static,
    ) {
        self.failures.lock().unwrap().push(Box::new(rule));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls with `method` whose path starts with `prefix`.
    pub fn count(&self, method: Method, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path.starts_with(prefix))
            .count()
    }

    pub fn installations(&self) -> Vec<Value> {
        self.state.lock().unwrap().installations.clone()
    }

    pub fn posts(&self, channel_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .posts
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn lists(&self, installation_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .lists
            .get(installation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tasks(&self, installation_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(installation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn handle(&self, req: &UpstreamRequest) -> AppResult<Value> {
        let mut state = self.state.lock().unwrap();
        let segments: Vec<&str> = req.path.trim_start_matches('/').split('/').collect();

        match (req.method.as_str(), segments.as_slice()) {
            ("GET", ["users", "search"]) => {
                let data: Vec<Value> = state
                    .group_members
                    .iter()
                    .map(|id| json!({ "id": id }))
                    .collect();
                Ok(json!({ "data": data }))
            }
            ("GET", ["users"]) => Ok(page(req, &state.users)),
            ("GET", ["spaces", _, "installations"]) => Ok(page(req, &state.installations)),
            ("POST", ["spaces", _, "installations"]) => {
                let id = next_id(&mut state, "channel");
                let body = req.body.clone().unwrap_or_default();
                let created_at = format!("2026-02-01T00:00:{:02}.000Z", state.next_id % 60);
                state.installations.push(json!({
                    "id": id,
                    "pluginID": body["pluginID"],
                    "config": body["config"],
                    "accessorIDs": body["accessorIDs"],
                    "createdAt": created_at,
                }));
                Ok(json!({ "id": id }))
            }
            ("GET", ["channels", channel, "posts"]) => {
                let posts = state.posts.get(*channel).cloned().unwrap_or_default();
                let limit = req
                    .query_param("limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(posts.len());
                let data: Vec<Value> = posts.into_iter().take(limit).collect();
                Ok(json!({ "data": data }))
            }
            ("POST", ["channels", channel, "posts"]) => {
                let id = next_id(&mut state, "post");
                let mut post = req.body.clone().unwrap_or_default();
                post["id"] = json!(id);
                state.posts.entry(channel.to_string()).or_default().push(post);
                Ok(json!({ "id": id }))
            }
            ("POST", ["tasks", installation, "lists"]) => {
                let id = next_id(&mut state, "list");
                let name = req
                    .body
                    .as_ref()
                    .and_then(|b| b["name"].as_str())
                    .unwrap_or_default()
                    .to_string();
                state.lists.entry(installation.to_string()).or_default().push(name);
                Ok(json!({ "id": id }))
            }
            ("POST", ["tasks", installation, "task"]) => {
                let id = next_id(&mut state, "task");
                state
                    .tasks
                    .entry(installation.to_string())
                    .or_default()
                    .push(req.body.clone().unwrap_or_default());
                Ok(json!({ "id": id }))
            }
            ("DELETE", ["installations", id]) => {
                let before = state.installations.len();
                state.installations.retain(|i| i["id"] != json!(id));
                if state.installations.len() == before {
                    return Err(AppError::Upstream {
                        status: 404,
                        body: format!("installation {} not found", id),
                    });
                }
                Ok(json!({}))
            }
            _ => Err(AppError::Upstream {
                status: 404,
                body: format!("no route for {} {}", req.method, req.path),
            }),
        }
    }
}

fn next_id(state: &mut PlatformState, kind: &str) -> String {
    state.next_id += 1;
    format!("{}-{}", kind, state.next_id)
}

fn page(req: &UpstreamRequest, all: &[Value]) -> Value {
    let limit: usize = req
        .query_param("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(all.len());
    let offset: usize = req
        .query_param("offset")
        .and_then(|o| o.parse().ok())
        .unwrap_or(0);
    let data: Vec<Value> = all.iter().skip(offset).take(limit).cloned().collect();
    json!({ "data": data })
}

#[async_trait]
impl Upstream for FakePlatform {
    async fn call(&self, request: UpstreamRequest) -> AppResult<Value> {
        self.calls.lock().unwrap().push(request.clone());
        // Yield so concurrent callers interleave the way network calls would.
        tokio::task::yield_now().await;

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find_map(|rule| rule(&request));
        if let Some(err) = failure {
            return Err(err);
        }

        self.handle(&request)
    }
}
