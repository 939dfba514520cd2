//! Vigil daemon
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - DISCORD_WEBHOOK_URL: Discord webhook to post alerts to
//! - TELEGRAM_TOKEN: Telegram bot token
//! - TELEGRAM_CHAT_ID: Telegram chat to send alerts to
//! - PREFECT_API_URL: Prefect GraphQL API endpoint
//! - PREFECT_API_AUTH_TOKEN: Bearer token for the Prefect API
//! - VPN_ENDPOINTS: Comma-separated host:port:label list (optional)
//! - LATE_RUNS_TOLERANCE_SECS: Lateness grace period (default: 300)
//! - AGENT_STALENESS_TOLERANCE_SECS: Agent staleness grace period (default: 300)
//! - CHECK_INTERVAL_SECS: Poll interval per executor (default: 60)
//! - RUST_LOG: Log level (default: info)

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil::executor::Executor;
use vigil::handlers::{DiscordHandler, Handler, TelegramHandler};
use vigil::triggers::{LateRunsTrigger, PrefectAgentsTrigger, VpnTrigger};
use vigil::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let handlers = || -> Vec<Box<dyn Handler>> {
        vec![
            Box::new(DiscordHandler::new(&config.discord_webhook_url)),
            Box::new(TelegramHandler::new(
                &config.telegram_token,
                &config.telegram_chat_id,
            )),
        ]
    };

    let mut executors = vec![
        Executor::new(
            Box::new(
                LateRunsTrigger::new(&config.prefect_api_url, &config.prefect_api_auth_token)
                    .with_tolerance(config.late_runs_tolerance),
            ),
            handlers(),
        ),
        Executor::new(
            Box::new(
                PrefectAgentsTrigger::new(&config.prefect_api_url, &config.prefect_api_auth_token)
                    .with_tolerance(config.agent_staleness_tolerance),
            ),
            handlers(),
        ),
    ];
    if config.vpn_endpoints.is_empty() {
        tracing::info!("no VPN endpoints configured, skipping VPN executor");
    } else {
        executors.push(Executor::new(
            Box::new(VpnTrigger::new(config.vpn_endpoints.clone())),
            handlers(),
        ));
    }

    let tasks: Vec<_> = executors
        .into_iter()
        .map(|executor| spawn_executor(executor, config.check_interval))
        .collect();

    tokio::signal::ctrl_c().await?;
    tracing::warn!("scheduler stopped, reason=ctrl-c");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

/// Drive one executor on its own fixed-interval schedule. Ticks are awaited
/// in sequence, so an overlapping tick of the same executor is skipped
/// rather than run concurrently.
fn spawn_executor(executor: Executor, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            executor.run().await;
        }
    })
}
