//! Late flow run trigger
//!
//! Queries the Prefect API for runs still in Scheduled/Queued state and fires
//! when any of them is past its scheduled start time by more than the
//! configured tolerance.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prefect::{ApiError, PrefectClient};
use crate::text::to_human_readable_time;
use crate::triggers::{is_error_payload, RenderFn, Trigger, TriggerResult};

const LATE_RUNS_QUERY: &str = r#"
    query UpcomingFlowRuns {
        flow_run(
            where: {state: {_in: ["Scheduled", "Queued"]}}
            order_by: [{scheduled_start_time: asc}, {flow: {name: asc}}]
        ) {
            id
            name
            state
            scheduled_start_time
            flow {
                name
            }
        }
    }
"#;

/// One row per distinct flow name among currently late runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRunRecord {
    pub flow_name: String,
    pub count: usize,
    pub max_delay_seconds: f64,
}

/// Fires when scheduled flow runs are late beyond a tolerance
pub struct LateRunsTrigger {
    client: PrefectClient,
    time_tolerance: Duration,
}

impl LateRunsTrigger {
    pub fn new(api_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: PrefectClient::new(api_url, auth_token),
            time_tolerance: Duration::from_secs(5 * 60),
        }
    }

    /// Set the grace duration before a run counts as late
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.time_tolerance = tolerance;
        self
    }

    async fn query_late_runs(&self) -> Result<Vec<FlowRunRecord>, ApiError> {
        let response = self
            .client
            .query(LATE_RUNS_QUERY, serde_json::json!({}))
            .await?;
        let runs = response
            .pointer("/data/flow_run")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let late = late_runs(&runs, Utc::now(), self.time_tolerance);
        Ok(group_late_runs(late))
    }

    /// Render the late-runs payload into an alert message
    pub fn render(info: &Value) -> String {
        if is_error_payload(info) {
            return "🚨 Failed to query late flow runs 🚨".to_string();
        }

        let records: Vec<FlowRunRecord> = match info
            .get("records")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
        {
            Some(records) => records,
            None => return "🚨 Failed to format late runs message 🚨".to_string(),
        };

        let mut message = "🚨 Late flow runs alert 🚨\n\n".to_string();
        for record in &records {
            let name: String = record.flow_name.chars().take(60).collect();
            message.push_str(&format!(
                "- `{:<3}x {:<60} (max delay: {})`\n",
                record.count,
                name,
                to_human_readable_time(record.max_delay_seconds),
            ));
        }
        message
    }
}

#[async_trait]
impl Trigger for LateRunsTrigger {
    fn name(&self) -> &'static str {
        "LateRunsTrigger"
    }

    async fn trigger(&self) -> TriggerResult {
        match self.query_late_runs().await {
            Ok(records) => TriggerResult {
                fired: !records.is_empty(),
                info: serde_json::json!({ "records": records }),
            },
            Err(error) => {
                tracing::error!(error = %error, "failed to collect late flow runs");
                TriggerResult::collection_failure()
            }
        }
    }

    fn renderer(&self) -> RenderFn {
        Self::render
    }
}

/// Extract `(flow_name, amount_late_seconds)` for every run that is late
/// beyond the tolerance. Runs with unparseable fields are skipped.
fn late_runs(runs: &[Value], now: DateTime<Utc>, tolerance: Duration) -> Vec<(String, f64)> {
    runs.iter()
        .filter_map(|run| {
            let flow_name = run.pointer("/flow/name")?.as_str()?.to_string();
            let scheduled = run.get("scheduled_start_time")?.as_str()?;
            let scheduled = DateTime::parse_from_rfc3339(scheduled).ok()?;
            let amount_late = (now - scheduled.with_timezone(&Utc)
                - chrono::Duration::from_std(tolerance).ok()?)
            .num_milliseconds() as f64
                / 1000.0;
            (amount_late > 0.0).then_some((flow_name, amount_late))
        })
        .collect()
}

/// Group late runs by flow name: count per flow, maximum lateness per flow,
/// sorted by maximum lateness descending.
fn group_late_runs(late: Vec<(String, f64)>) -> Vec<FlowRunRecord> {
    let mut groups: HashMap<String, (usize, f64)> = HashMap::new();
    for (flow_name, amount_late) in late {
        let entry = groups.entry(flow_name).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 = entry.1.max(amount_late);
    }

    let mut records: Vec<FlowRunRecord> = groups
        .into_iter()
        .map(|(flow_name, (count, max_delay_seconds))| FlowRunRecord {
            flow_name,
            count,
            max_delay_seconds,
        })
        .collect();
    records.sort_by(|a, b| {
        b.max_delay_seconds
            .total_cmp(&a.max_delay_seconds)
            .then_with(|| a.flow_name.cmp(&b.flow_name))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run(flow_name: &str, scheduled: &str) -> Value {
        serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "name": "test-run",
            "state": "Scheduled",
            "scheduled_start_time": scheduled,
            "flow": { "name": flow_name }
        })
    }

    #[test]
    fn test_runs_within_tolerance_are_excluded() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let runs = vec![
            // 4 minutes overdue, within the 5 minute tolerance
            run("flow-a", "2023-01-01T11:56:00.000+00:00"),
            // scheduled in the future
            run("flow-b", "2023-01-01T12:30:00.000+00:00"),
        ];
        let late = late_runs(&runs, now, Duration::from_secs(300));
        assert!(late.is_empty());
    }

    #[test]
    fn test_lateness_is_measured_past_the_tolerance() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        // Scheduled 10 minutes ago, 5 minute tolerance: 300s late.
        let runs = vec![run("flow-a", "2023-01-01T11:50:00.000+00:00")];
        let late = late_runs(&runs, now, Duration::from_secs(300));
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].0, "flow-a");
        assert!((late[0].1 - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_runs_are_skipped() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let runs = vec![
            serde_json::json!({ "flow": { "name": "flow-a" } }),
            serde_json::json!({ "scheduled_start_time": "not-a-timestamp",
                                "flow": { "name": "flow-b" } }),
        ];
        assert!(late_runs(&runs, now, Duration::from_secs(300)).is_empty());
    }

    #[test]
    fn test_grouping_counts_and_sorts_by_max_delay() {
        let late = vec![
            ("A".to_string(), 100.0),
            ("B".to_string(), 10.0),
            ("A".to_string(), 50.0),
        ];
        let records = group_late_runs(late);
        assert_eq!(
            records,
            vec![
                FlowRunRecord {
                    flow_name: "A".to_string(),
                    count: 2,
                    max_delay_seconds: 100.0,
                },
                FlowRunRecord {
                    flow_name: "B".to_string(),
                    count: 1,
                    max_delay_seconds: 10.0,
                },
            ]
        );
    }

    #[test]
    fn test_render_lists_each_record() {
        let info = serde_json::json!({
            "records": [
                { "flow_name": "A", "count": 2, "max_delay_seconds": 100.0 },
                { "flow_name": "B", "count": 1, "max_delay_seconds": 10.0 },
            ]
        });
        let message = LateRunsTrigger::render(&info);
        assert!(message.starts_with("🚨 Late flow runs alert 🚨"));
        assert!(message.contains("2  x A"));
        assert!(message.contains("(max delay: 1m 40s)"));
        assert!(message.contains("1  x B"));
        assert!(message.contains("(max delay: 10s)"));
    }

    #[test]
    fn test_render_error_payload() {
        let info = serde_json::json!({ "error": true });
        assert_eq!(
            LateRunsTrigger::render(&info),
            "🚨 Failed to query late flow runs 🚨"
        );
    }

    #[test]
    fn test_render_malformed_payload_falls_back() {
        let info = serde_json::json!({ "records": "not-a-list" });
        assert_eq!(
            LateRunsTrigger::render(&info),
            "🚨 Failed to format late runs message 🚨"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let info = serde_json::json!({
            "records": [{ "flow_name": "A", "count": 1, "max_delay_seconds": 42.0 }]
        });
        assert_eq!(LateRunsTrigger::render(&info), LateRunsTrigger::render(&info));
    }
}
