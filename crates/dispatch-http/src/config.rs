//! Service configuration: bind address and envelope-text overrides, loaded
//! from an optional TOML file and/or CLI flags. Not part of the spec this
//! core implements — the teacher never ships a bare-argv binary, so neither
//! does this one.

use dispatch_core::EnvelopeTexts;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level configuration for the `dispatch-http` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,
    /// Override for the "project not found" envelope text.
    pub project_not_found_text: Option<String>,
    /// Override for the "endpoint not found" envelope text.
    pub endpoint_not_found_text: Option<String>,
    /// Override for the "no response configured" envelope text.
    pub no_response_configured_text: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".parse().expect("hardcoded bind address is valid"),
            project_not_found_text: None,
            endpoint_not_found_text: None,
            no_response_configured_text: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// [`ServiceConfig::default`].
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Build an [`EnvelopeTexts`], applying any configured overrides on top
    /// of the dispatch core's defaults.
    pub fn envelope_texts(&self) -> EnvelopeTexts {
        let mut texts = EnvelopeTexts::default();
        if let Some(text) = &self.project_not_found_text {
            texts.project_not_found = text.clone();
        }
        if let Some(text) = &self.endpoint_not_found_text {
            texts.endpoint_not_found = text.clone();
        }
        if let Some(text) = &self.no_response_configured_text {
            texts.no_response_configured = text.clone();
        }
        texts
    }
}
