//! LCCN - Lifecycle change notification subscriptions
//!
//! Manage subscriptions and resolve which of them a notification reaches.

mod commands;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};
use lccn_core::config::LccnConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::CommandContext;

#[derive(Parser)]
#[command(name = "lccn")]
#[command(author = "LCCN Team")]
#[command(version = lccn_core::VERSION)]
#[command(about = "Lifecycle change notification subscription manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Database URL
    #[arg(long, global = true, env = "LCCN_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LCCN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a subscription
    Subscribe {
        /// Callback URI notifications are delivered to
        #[arg(long)]
        callback_uri: String,

        /// Filter as JSON, or @path to a JSON file
        #[arg(long)]
        filter: Option<String>,

        /// Callback credentials as JSON, or @path to a JSON file
        #[arg(long)]
        auth: Option<String>,
    },

    /// List active subscriptions
    List,

    /// Show one subscription
    Show {
        /// Subscription id
        id: String,
    },

    /// Delete a subscription
    Delete {
        /// Subscription id
        id: String,
    },

    /// Resolve the subscriptions a notification would be delivered to
    Match {
        /// Notification event as JSON, or @path to a JSON file
        #[arg(long)]
        event: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Needs neither config nor database
    if let Commands::Version = cli.command {
        println!("lccn {}", lccn_core::VERSION);
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config);

    let ctx = CommandContext::connect(&config, cli.output).await?;
    let result = match cli.command {
        Commands::Subscribe {
            callback_uri,
            filter,
            auth,
        } => commands::subscription::create(&ctx, &callback_uri, filter.as_deref(), auth.as_deref()).await,
        Commands::List => commands::subscription::list(&ctx).await,
        Commands::Show { id } => commands::subscription::show(&ctx, &id).await,
        Commands::Delete { id } => commands::subscription::delete(&ctx, &id).await,
        Commands::Match { event } => commands::notify::execute(&ctx, &event).await,
        Commands::Version => Ok(()),
    };

    if let Err(e) = result {
        ctx.report_error(&e);
        std::process::exit(1);
    }
    Ok(())
}

/// File or environment config with CLI flags applied on top
fn load_config(cli: &Cli) -> anyhow::Result<LccnConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        LccnConfig::from_file(config_path)?
    } else {
        LccnConfig::from_env()
    };

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &LccnConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr, command output to stdout
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
