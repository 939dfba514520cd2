//! Vigil: Watchdog Alerting Daemon
//!
//! Periodically runs a set of independent health-check triggers and pushes
//! human-readable alerts through notification handlers when one fires.
//!
//! # Components
//!
//! - **Triggers**: one health-check strategy each — late Prefect flow runs,
//!   VPN endpoint reachability, Prefect agent liveness
//! - **Handlers**: one notification transport each — Discord webhook,
//!   Telegram bot
//! - **Executor**: binds a trigger to its handlers and drives one poll cycle
//!
//! Failures never escape a poll cycle: triggers convert collection errors
//! into firing alerts, handlers are isolated from each other, and the
//! scheduler keeps ticking regardless.
//!
//! # Example
//!
//! ```no_run
//! use vigil::executor::Executor;
//! use vigil::handlers::DiscordHandler;
//! use vigil::triggers::{Endpoint, VpnTrigger};
//!
//! # async fn demo() {
//! let trigger = VpnTrigger::new(vec![Endpoint {
//!     host: "10.0.0.1".to_string(),
//!     port: 443,
//!     label: "gateway".to_string(),
//! }]);
//! let handler = DiscordHandler::new("https://discord.com/api/webhooks/...");
//!
//! let executor = Executor::new(Box::new(trigger), vec![Box::new(handler)]);
//! executor.run().await;
//! # }
//! ```

pub mod config;
pub mod executor;
pub mod handlers;
pub mod prefect;
pub mod text;
pub mod triggers;

// Re-export commonly used types
pub use config::Config;
pub use executor::Executor;
pub use handlers::{DiscordHandler, Handler, TelegramHandler};
pub use triggers::{Endpoint, LateRunsTrigger, PrefectAgentsTrigger, Trigger, VpnTrigger};
