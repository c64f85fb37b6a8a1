//! Impostor game server.
//!
//! Configured through the environment:
//!
//! - `IMPOSTOR_BIND`: listen address (default `0.0.0.0:8080`)
//! - `IMPOSTOR_WORDS`: path to a JSON word list, e.g.
//!   `[{"innocent": "Coffee", "impostor": "Tea"}]` (default: built-in list)
//! - `IMPOSTOR_RETENTION_SECS`: how long a finished game stays visible
//!   before it is closed (default 10)
//! - `RUST_LOG`: log filter (default `info`)
//!
//! Clients connect with a WebSocket to the bind address and speak JSON:
//!
//! ```text
//! → {"command":"CreateSession","player_name":"Ana"}
//! ← {"type":"Welcome","session_id":"3fa9c01b","player_id":"...","is_host":true,"reconnect_token":"..."}
//! ← {"type":"StateUpdate","state":{...}}
//! ```

use std::time::Duration;

use impostor::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("IMPOSTOR_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let mut builder = ImpostorServerBuilder::new().bind(&bind);

    if let Ok(path) = std::env::var("IMPOSTOR_WORDS") {
        let pairs = load_words(&path)?;
        tracing::info!(%path, pairs = pairs.len(), "loaded word list");
        builder = builder.word_pairs(pairs)?;
    }

    if let Ok(secs) = std::env::var("IMPOSTOR_RETENTION_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|e| format!("IMPOSTOR_RETENTION_SECS must be a number of seconds: {e}"))?;
        builder = builder.finished_retention(Duration::from_secs(secs));
    }

    let server = builder.build().await?;
    tracing::info!(addr = %server.local_addr()?, "starting impostor server");
    server.run().await?;
    Ok(())
}

/// Reads the pairs from a JSON word list. The builder validates them.
fn load_words(path: &str) -> Result<Vec<WordPair>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read word list {path}: {e}"))?;
    let pairs = serde_json::from_str(&text)
        .map_err(|e| format!("invalid word list {path}: {e}"))?;
    Ok(pairs)
}
