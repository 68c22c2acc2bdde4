//! `einkauf-tail` — connect to the list server's realtime channel and
//! print every subscribed event as one JSON line.
//!
//! Useful for debugging the server's broadcasts and the client's
//! reconnect behavior without a browser attached:
//!
//! ```text
//! EINKAUF_TOKEN=... einkauf-tail --host localhost:8000
//! einkauf-tail --token ... --secure --category item:added --category item:deleted
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use einkauf_core::events::{
    CONNECTION_CLOSE, CONNECTION_ERROR, CONNECTION_OPEN, SERVER_CATEGORIES,
};
use einkauf_realtime::{ConnectionManager, RealtimeConfig, TokenProvider, Transport, WsTransport};

#[derive(Parser, Debug)]
#[command(name = "einkauf-tail", version, about = "Tail realtime events from the Einkauf list server")]
struct Args {
    /// Server authority, e.g. `localhost:8000` (default from config/env).
    #[arg(long)]
    host: Option<String>,

    /// Connect with `wss://` instead of `ws://`.
    #[arg(long)]
    secure: bool,

    /// Authentication token; falls back to the `EINKAUF_TOKEN` env var.
    #[arg(long)]
    token: Option<String>,

    /// Category to subscribe to; repeatable. Defaults to the connection
    /// lifecycle plus every known server broadcast.
    #[arg(long = "category")]
    categories: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = RealtimeConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if args.secure {
        config.secure = true;
    }

    let token = args
        .token
        .or_else(|| std::env::var("EINKAUF_TOKEN").ok())
        .filter(|t| !t.is_empty())
        .context("a token is required (--token or EINKAUF_TOKEN)")?;

    let tokens: Arc<dyn TokenProvider> = Arc::new(move || Some(token.clone()));
    let transport: Arc<dyn Transport> = Arc::new(WsTransport);
    let manager = ConnectionManager::new(config, tokens, transport);

    let categories = if args.categories.is_empty() {
        [CONNECTION_OPEN, CONNECTION_CLOSE, CONNECTION_ERROR]
            .iter()
            .chain(SERVER_CATEGORIES)
            .map(ToString::to_string)
            .collect()
    } else {
        args.categories
    };

    let mut subscriptions = Vec::with_capacity(categories.len());
    for category in &categories {
        let name = category.clone();
        subscriptions.push(manager.subscribe(category, move |payload| {
            println!(
                "{}",
                serde_json::json!({"category": name, "payload": payload})
            );
        }));
    }
    info!(categories = categories.len(), "subscribed");

    manager.connect()?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    manager.disconnect("client shutdown");
    // Give the close frame a moment to flush.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    Ok(())
}
