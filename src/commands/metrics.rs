//! Paywall counters for debugging checkout and unlock behaviour.

use serde::Serialize;

use crate::metrics::{self, PaywallMetricsSnapshot};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaywallMetricsResponse {
    pub success: bool,
    pub counters: Option<PaywallMetricsSnapshot>,
    pub error: Option<String>,
}

/// Unlock, reset, escalation and checkout counters. Release builds refuse so
/// purchase activity is not exposed to end users.
pub async fn get_metrics() -> Result<PaywallMetricsResponse, String> {
    if cfg!(debug_assertions) {
        return Ok(PaywallMetricsResponse {
            success: true,
            counters: Some(metrics::snapshot()),
            error: None,
        });
    }

    Ok(PaywallMetricsResponse {
        success: false,
        counters: None,
        error: Some("Paywall counters are disabled in release builds".to_string()),
    })
}
