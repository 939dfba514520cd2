//! VPN reachability trigger
//!
//! Probes a static list of endpoints with concurrent TCP connects and fires
//! when any of them cannot be reached within the timeout. One dead endpoint
//! never aborts the other probes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;

use crate::triggers::{RenderFn, Trigger, TriggerResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One statically configured probe target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub label: String,
}

/// Fires when any configured endpoint is unreachable over TCP
pub struct VpnTrigger {
    endpoints: Vec<Endpoint>,
    connect_timeout: Duration,
}

impl VpnTrigger {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Probe one endpoint: success iff a TCP connection can be established
    /// within the timeout. The connection is closed immediately.
    async fn probe(endpoint: &Endpoint, timeout: Duration) -> bool {
        let addr = format!("{}:{}", endpoint.host, endpoint.port);
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(label = %endpoint.label, addr = %addr, "VPN connection is OK");
                true
            }
            _ => {
                tracing::error!(label = %endpoint.label, addr = %addr, "VPN connection failed");
                false
            }
        }
    }

    /// Render the failed-endpoints payload into an alert message
    pub fn render(info: &Value) -> String {
        let failed: Vec<Endpoint> = match info
            .get("failed")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
        {
            Some(failed) => failed,
            None => return "🚨 Failed to format connection failure message 🚨".to_string(),
        };

        let mut message = "🚨 Connection failure alert 🚨\n\n".to_string();
        for endpoint in &failed {
            message.push_str(&format!(
                "❌ {} -> {}:{}\n",
                endpoint.label, endpoint.host, endpoint.port
            ));
        }
        message
    }
}

#[async_trait]
impl Trigger for VpnTrigger {
    fn name(&self) -> &'static str {
        "VpnTrigger"
    }

    async fn trigger(&self) -> TriggerResult {
        let probes = self
            .endpoints
            .iter()
            .map(|endpoint| Self::probe(endpoint, self.connect_timeout));
        let results = futures::future::join_all(probes).await;

        // join_all preserves input order, so failures come out in the
        // configured endpoint order regardless of probe completion order.
        let failed: Vec<&Endpoint> = self
            .endpoints
            .iter()
            .zip(results)
            .filter_map(|(endpoint, reachable)| (!reachable).then_some(endpoint))
            .collect();

        TriggerResult {
            fired: !failed.is_empty(),
            info: serde_json::json!({ "failed": failed }),
        }
    }

    fn renderer(&self) -> RenderFn {
        Self::render
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn endpoint(host: &str, port: u16, label: &str) -> Endpoint {
        Endpoint {
            host: host.to_string(),
            port,
            label: label.to_string(),
        }
    }

    async fn listening_endpoint(label: &str) -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, endpoint("127.0.0.1", port, label))
    }

    /// A 127.0.0.1 port with nothing listening on it.
    async fn dead_endpoint(label: &str) -> Endpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        endpoint("127.0.0.1", port, label)
    }

    #[tokio::test]
    async fn test_all_endpoints_reachable_does_not_fire() {
        let (_l1, e1) = listening_endpoint("one").await;
        let (_l2, e2) = listening_endpoint("two").await;
        let trigger = VpnTrigger::new(vec![e1, e2]);

        let result = trigger.trigger().await;
        assert!(!result.fired);
        assert_eq!(result.info["failed"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_one_unreachable_endpoint_fires() {
        let (_l1, e1) = listening_endpoint("one").await;
        let dead = dead_endpoint("dead").await;
        let (_l2, e2) = listening_endpoint("two").await;
        let trigger = VpnTrigger::new(vec![e1, dead.clone(), e2])
            .with_connect_timeout(Duration::from_secs(1));

        let result = trigger.trigger().await;
        assert!(result.fired);

        let failed: Vec<Endpoint> =
            serde_json::from_value(result.info["failed"].clone()).unwrap();
        assert_eq!(failed, vec![dead]);
    }

    #[tokio::test]
    async fn test_failures_preserve_configured_order() {
        let dead_a = dead_endpoint("a").await;
        let (_l, alive) = listening_endpoint("alive").await;
        let dead_b = dead_endpoint("b").await;
        let trigger = VpnTrigger::new(vec![dead_a.clone(), alive, dead_b.clone()])
            .with_connect_timeout(Duration::from_secs(1));

        let result = trigger.trigger().await;
        let failed: Vec<Endpoint> =
            serde_json::from_value(result.info["failed"].clone()).unwrap();
        assert_eq!(failed, vec![dead_a, dead_b]);
    }

    #[test]
    fn test_render_lists_failed_endpoints() {
        let info = serde_json::json!({
            "failed": [
                { "host": "10.0.0.1", "port": 443, "label": "gateway" },
                { "host": "10.0.0.2", "port": 22, "label": "bastion" },
            ]
        });
        let message = VpnTrigger::render(&info);
        assert!(message.starts_with("🚨 Connection failure alert 🚨"));
        assert!(message.contains("❌ gateway -> 10.0.0.1:443"));
        assert!(message.contains("❌ bastion -> 10.0.0.2:22"));
    }

    #[test]
    fn test_render_malformed_payload_falls_back() {
        let info = serde_json::json!({ "error": true });
        assert_eq!(
            VpnTrigger::render(&info),
            "🚨 Failed to format connection failure message 🚨"
        );
    }
}
