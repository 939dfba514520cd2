//! Health-check triggers
//!
//! A trigger encapsulates one health-check strategy: it collects data from an
//! upstream resource, decides whether it has fired, and knows how to render
//! its own payload into a human-readable message.

pub mod late_runs;
pub mod prefect_agents;
pub mod vpn;

pub use late_runs::LateRunsTrigger;
pub use prefect_agents::PrefectAgentsTrigger;
pub use vpn::{Endpoint, VpnTrigger};

use async_trait::async_trait;
use serde_json::Value;

/// Outcome of one trigger invocation
#[derive(Debug, Clone)]
pub struct TriggerResult {
    /// Whether an alert should be sent this cycle
    pub fired: bool,
    /// Trigger-specific payload; only the owning trigger's render function
    /// interprets its shape
    pub info: Value,
}

impl TriggerResult {
    /// Result for a collection failure: an error is itself alert-worthy, so
    /// the trigger fires with an error-marker payload.
    pub fn collection_failure() -> Self {
        Self {
            fired: true,
            info: serde_json::json!({ "error": true }),
        }
    }
}

/// Pure function rendering a trigger payload into a message.
///
/// It belongs to a specific trigger type (payload shapes are type-specific)
/// but takes no instance state, so handlers can call it without holding a
/// live trigger.
pub type RenderFn = fn(&Value) -> String;

/// One health-check strategy
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Trigger type name, for executor logging
    fn name(&self) -> &'static str;

    /// Run one check. Never propagates an error: collection failures are
    /// logged and converted to a firing [`TriggerResult::collection_failure`].
    async fn trigger(&self) -> TriggerResult;

    /// The render function for this trigger's payload shape
    fn renderer(&self) -> RenderFn;
}

/// Whether a payload is the error marker produced by a collection failure
pub(crate) fn is_error_payload(info: &Value) -> bool {
    info.get("error").is_some()
}
