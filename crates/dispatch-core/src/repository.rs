//! The read-only storage collaborator the dispatch core depends on.
//!
//! Everything in this module is an interface; persistence, the admin UI, and
//! tenant/auth management are external concerns the core never touches
//! directly. A concrete implementation (database-backed, in-memory, or
//! otherwise) is supplied by the embedding application.

use crate::model::{Endpoint, MockResponse, Project};
use async_trait::async_trait;

/// Read-only lookup surface the dispatch core needs from storage.
///
/// All methods are async to allow a database-backed implementation without
/// forcing the core to block a worker thread.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Find a project by its unique alias.
    async fn find_project_by_alias(&self, alias: &str) -> Option<Project>;

    /// Find the endpoint matching `(project_id, method, path)`.
    ///
    /// Path-rule evaluation (spec data model: `Rule::rule_type ==
    /// RuleType::Path`) happens inside this lookup; the Rule Matcher never
    /// sees path rules.
    async fn find_matching_endpoint(
        &self,
        project_id: &str,
        method: &str,
        path: &str,
    ) -> Option<Endpoint>;

    /// Load all responses configured for an endpoint, in storage order.
    async fn find_responses_by_endpoint_id(&self, endpoint_id: &str) -> Vec<MockResponse>;
}
