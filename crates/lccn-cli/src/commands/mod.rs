//! CLI command implementations

pub mod notify;
pub mod subscription;

use std::sync::Arc;

use anyhow::Result;
use lccn_core::error::ProblemDetails;
use lccn_core::LccnConfig;
use lccn_metadata::SqliteSubscriptionStore;
use lccn_service::{NotificationRouter, SubscriptionManager};
use serde::Serialize;
use tracing::debug;

use crate::OutputFormat;

/// Context passed to all commands
pub struct CommandContext {
    pub manager: SubscriptionManager,
    pub router: NotificationRouter,
    pub output_format: OutputFormat,
}

impl CommandContext {
    pub async fn connect(config: &LccnConfig, output_format: OutputFormat) -> Result<Self> {
        debug!("Opening subscription store at {}", config.database.url);
        let store = Arc::new(SqliteSubscriptionStore::with_config(&config.database).await?);
        Ok(Self {
            manager: SubscriptionManager::new(store.clone(), config.subscriptions.clone()),
            router: NotificationRouter::new(store),
            output_format,
        })
    }

    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print a value as pretty JSON
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a failed command to stderr
    ///
    /// Domain errors are shown as problem details in JSON mode.
    pub fn report_error(&self, err: &anyhow::Error) {
        match err.downcast_ref::<lccn_core::Error>() {
            Some(e) if self.is_json() => {
                let problem = ProblemDetails::from(e);
                match serde_json::to_string_pretty(&problem) {
                    Ok(body) => eprintln!("{}", body),
                    Err(_) => eprintln!("Error: {}", e),
                }
            }
            _ => eprintln!("Error: {:#}", err),
        }
    }
}
