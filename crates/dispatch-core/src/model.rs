//! Data model shared by the dispatch core. These types are read-only to the
//! core; creation, mutation, and persistence live in an external collaborator
//! that implements [`crate::repository::Repository`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A logical tenant project, addressed by its unique [`Project::alias`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Opaque project id.
    pub id: String,
    /// Unique URL-safe alias used as the first inbound path segment.
    pub alias: String,
    /// Dispatch mode for this project.
    pub mode: ProjectMode,
    /// Upstream target used by `proxy` and `forwarder` modes.
    pub active_proxy: Option<ProxyTarget>,
    /// Advance-config blob; at minimum carries `delay_ms`.
    pub advance_config: AdvanceConfig,
}

/// Dispatch mode of a [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectMode {
    /// Serve requests from stored mock responses.
    Mock,
    /// Try mocks first, forward unmatched requests upstream.
    Proxy,
    /// Forward every request upstream unconditionally.
    Forwarder,
    /// Reject every request with a 503.
    Disabled,
}

/// An upstream target: scheme + host + optional base path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyTarget {
    /// Absolute base URL, e.g. `https://api.example.com/v1`.
    pub url: String,
}

/// A configured route within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Opaque endpoint id.
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// HTTP method this endpoint matches.
    pub method: String,
    /// Path pattern this endpoint matches (resolution is the Repository's job).
    pub path: String,
    /// Response selection mode among this endpoint's responses.
    pub response_mode: ResponseMode,
    /// Whether this endpoint forwards to `proxy_target` instead of mocking.
    pub use_proxy: bool,
    /// Upstream target used when `use_proxy` is set.
    pub proxy_target: Option<ProxyTarget>,
    /// Advance-config blob, same schema as the project's.
    pub advance_config: AdvanceConfig,
}

/// Response selection mode for an [`Endpoint`]'s responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Always the highest-priority valid response.
    Static,
    /// Uniformly random among valid responses.
    #[default]
    Random,
    /// Round-robin among valid responses.
    RoundRobin,
}

impl ResponseMode {
    /// Parse a response mode case-insensitively; unknown values fall back to
    /// [`ResponseMode::Random`] per the data model's stated contract.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "static" => Self::Static,
            "round_robin" | "roundrobin" | "round-robin" => Self::RoundRobin,
            _ => Self::Random,
        }
    }
}

/// A stored mock response belonging to an [`Endpoint`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    /// Opaque response id.
    pub id: String,
    /// Owning endpoint id.
    pub endpoint_id: String,
    /// HTTP status code to return.
    pub status_code: u16,
    /// Opaque response body.
    pub body: String,
    /// Response headers as a JSON object (header name -> value).
    pub headers: String,
    /// Selection priority; higher precedes lower in `static` mode.
    pub priority: i64,
    /// Delay contribution of this response, in milliseconds.
    pub delay_ms: u64,
    /// Whether this response should serve when no rule-bearing response matches.
    pub is_fallback: bool,
    /// Ordered predicates gating this response.
    pub rules: Vec<Rule>,
}

/// A declarative predicate gating a [`MockResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// What part of the request this rule inspects.
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Header name, query name, or JSON dot-path.
    pub key: String,
    /// Comparison operator.
    pub operator: RuleOperator,
    /// Value to compare against.
    pub value: String,
}

/// Kind of predicate a [`Rule`] evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Compare against a request header.
    Header,
    /// Compare against a query parameter.
    Query,
    /// Compare against a value extracted from the JSON request body.
    Body,
    /// Resolved during endpoint lookup; ignored by the Rule Matcher.
    Path,
}

/// Comparison operator for a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOperator {
    /// Byte-exact string equality.
    Equals,
    /// Substring containment.
    Contains,
}

impl RuleOperator {
    /// Parse an operator case-insensitively; unknown operators collapse to
    /// [`RuleOperator::Equals`] per the data model's stated contract.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "contains" => Self::Contains,
            _ => Self::Equals,
        }
    }

    /// Evaluate this operator against an extracted value and a rule value.
    pub fn matches(&self, extracted: &str, expected: &str) -> bool {
        match self {
            Self::Equals => extracted == expected,
            Self::Contains => extracted.contains(expected),
        }
    }
}

/// Advance-config blob carried by both [`Project`] and [`Endpoint`].
///
/// The real schema is owned by the external configuration collaborator; the
/// core only relies on `delay_ms` being present and non-negative. Unknown
/// keys are preserved in `extra` so a round-trip through the Repository does
/// not silently drop caller data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceConfig {
    /// Delay contribution at this tier, in milliseconds. Zero means "no
    /// contribution at this tier".
    #[serde(default)]
    pub delay_ms: u64,
    /// Any additional keys the blob carries, preserved opaquely.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AdvanceConfig {
    /// Parse an advance-config blob from raw JSON text. Malformed input is
    /// tolerated by returning `None` rather than propagating a parse error —
    /// spec section 7 treats config parse errors as "no delay at this tier",
    /// not as a dispatch failure.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
