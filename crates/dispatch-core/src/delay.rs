//! Delay Composer: resolves the effective delay across response, endpoint,
//! and project tiers, and sleeps the caller.

use crate::model::AdvanceConfig;
use std::time::Duration;

/// Compute the effective delay in milliseconds as the first non-zero value,
/// checked in this order: response delay, endpoint advance-config delay,
/// project advance-config delay. A zero or missing value at a tier is
/// skipped; once a positive value is found the search stops (no fallthrough
/// past it).
pub fn effective_delay_ms(
    response_delay_ms: Option<u64>,
    endpoint_advance_config: Option<&AdvanceConfig>,
    project_advance_config: Option<&AdvanceConfig>,
) -> u64 {
    if let Some(ms) = response_delay_ms {
        if ms > 0 {
            return ms;
        }
    }

    if let Some(cfg) = endpoint_advance_config {
        if cfg.delay_ms > 0 {
            return cfg.delay_ms;
        }
    }

    if let Some(cfg) = project_advance_config {
        if cfg.delay_ms > 0 {
            return cfg.delay_ms;
        }
    }

    0
}

/// Sleep the caller for the given number of milliseconds. A zero delay is a
/// no-op — no scheduler yield is forced.
pub async fn apply(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
