//! Executor: binds one trigger to its handlers and drives one poll cycle

use rand::seq::SliceRandom;

use crate::handlers::Handler;
use crate::triggers::Trigger;

/// Binds one trigger to a list of handlers. Each invocation of [`run`]
/// checks the trigger once and, if it fired, feeds the payload to every
/// handler in turn.
///
/// [`run`]: Executor::run
pub struct Executor {
    trigger: Box<dyn Trigger>,
    handlers: Vec<Box<dyn Handler>>,
    friendly_name: String,
}

impl Executor {
    pub fn new(trigger: Box<dyn Trigger>, handlers: Vec<Box<dyn Handler>>) -> Self {
        Self::with_name(friendly_name(), trigger, handlers)
    }

    pub fn with_name(
        name: impl Into<String>,
        trigger: Box<dyn Trigger>,
        handlers: Vec<Box<dyn Handler>>,
    ) -> Self {
        let friendly_name = name.into();
        let handler_names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
        tracing::info!(
            executor = %friendly_name,
            trigger = %trigger.name(),
            handlers = ?handler_names,
            "starting executor"
        );
        Self {
            trigger,
            handlers,
            friendly_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.friendly_name
    }

    /// Run one poll cycle. Nothing escapes to the caller: the trigger
    /// absorbs collection failures and handler failures are logged per
    /// handler, so a bad tick never stops the next one.
    pub async fn run(&self) {
        tracing::info!(executor = %self.friendly_name, "executor running");
        let result = self.trigger.trigger().await;
        tracing::info!(executor = %self.friendly_name, fired = result.fired, "trigger checked");
        if !result.fired {
            return;
        }

        let render = self.trigger.renderer();
        for handler in &self.handlers {
            tracing::info!(executor = %self.friendly_name, handler = %handler.name(), "calling handler");
            if let Err(error) = handler.handle(&result.info, render).await {
                tracing::error!(
                    executor = %self.friendly_name,
                    handler = %handler.name(),
                    error = %error,
                    "handler failed"
                );
            }
        }
    }
}

const ADJECTIVES: &[&str] = &[
    "bold", "calm", "eager", "fervent", "jolly", "keen", "quirky", "stoic", "vigilant", "wary",
];

const SURNAMES: &[&str] = &[
    "archer", "beacon", "curie", "darwin", "galileo", "hopper", "lovelace", "noether", "tesla",
    "turing",
];

/// Docker-style random executor name, e.g. `vigilant_hopper`.
fn friendly_name() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}_{}",
        ADJECTIVES.choose(&mut rng).unwrap_or(&"nameless"),
        SURNAMES.choose(&mut rng).unwrap_or(&"watcher"),
    )
}
