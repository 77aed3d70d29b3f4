//! In-memory [`Repository`] implementation.
//!
//! Stands in for the external persistence collaborator `dispatch-core`
//! declares out of scope — it exists to exercise the dispatch core end to
//! end in tests and the demo binary, not as a production store. Endpoint
//! path patterns are matched with [`matchit`], the same route-matching
//! crate the wider mocking/proxying stack this core was lifted from already
//! depends on.

use async_trait::async_trait;
use dispatch_core::model::{Endpoint, MockResponse, Project};
use dispatch_core::repository::Repository;
use std::collections::HashMap;
use std::sync::RwLock;

/// A `HashMap`-backed, thread-safe [`Repository`].
#[derive(Default)]
pub struct MemoryRepository {
    projects_by_alias: RwLock<HashMap<String, Project>>,
    endpoints_by_project: RwLock<HashMap<String, HashMap<String, matchit::Router<Endpoint>>>>,
    responses_by_endpoint: RwLock<HashMap<String, Vec<MockResponse>>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a project, keyed by its alias.
    pub fn insert_project(&self, project: Project) {
        self.projects_by_alias.write().unwrap().insert(project.alias.clone(), project);
    }

    /// Register an endpoint under its owning project and method.
    ///
    /// `endpoint.path` is a `matchit` pattern (e.g. `/widgets/{id}`); a
    /// pattern that collides with one already registered for the same
    /// project/method is dropped with a warning rather than panicking, since
    /// this is a runtime collaborator, not a compile-time-checked route
    /// table.
    pub fn insert_endpoint(&self, endpoint: Endpoint) {
        let mut guard = self.endpoints_by_project.write().unwrap();
        let per_method = guard.entry(endpoint.project_id.clone()).or_default();
        let router =
            per_method.entry(endpoint.method.to_ascii_uppercase()).or_insert_with(matchit::Router::new);
        if let Err(err) = router.insert(endpoint.path.clone(), endpoint.clone()) {
            tracing::warn!(
                path = %endpoint.path,
                project_id = %endpoint.project_id,
                error = %err,
                "failed to register endpoint path pattern"
            );
        }
    }

    /// Register a response under its owning endpoint, in insertion order.
    pub fn insert_response(&self, response: MockResponse) {
        self.responses_by_endpoint
            .write()
            .unwrap()
            .entry(response.endpoint_id.clone())
            .or_default()
            .push(response);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_project_by_alias(&self, alias: &str) -> Option<Project> {
        self.projects_by_alias.read().unwrap().get(alias).cloned()
    }

    async fn find_matching_endpoint(
        &self,
        project_id: &str,
        method: &str,
        path: &str,
    ) -> Option<Endpoint> {
        let guard = self.endpoints_by_project.read().unwrap();
        let router = guard.get(project_id)?.get(&method.to_ascii_uppercase())?;
        router.at(path).ok().map(|matched| matched.value.clone())
    }

    async fn find_responses_by_endpoint_id(&self, endpoint_id: &str) -> Vec<MockResponse> {
        self.responses_by_endpoint.read().unwrap().get(endpoint_id).cloned().unwrap_or_default()
    }
}
