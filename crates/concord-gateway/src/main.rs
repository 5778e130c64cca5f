//! Gateway client entry point
//!
//! Run with:
//! ```bash
//! BOT_TOKEN=... cargo run -p concord-gateway
//! ```
//!
//! Configuration is loaded from environment variables. Every received
//! event is logged until Ctrl-C.

use concord_common::{try_init_tracing_with_config, AppError, ClientConfig, TracingConfig};
use concord_gateway::{listener_fn, Event, EventCategories, GatewayClient};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(AppError::from(e).exit_code());
        }
    };

    let tracing = TracingConfig::for_environment(config.env).with_frames(config.log_frames);
    if let Err(e) = try_init_tracing_with_config(tracing) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Gateway client stopped");
        std::process::exit(e.exit_code());
    }
}

async fn run(config: ClientConfig) -> Result<(), AppError> {
    info!(
        env = ?config.env,
        intents = %config.intents,
        shard_id = config.shard.id,
        shard_count = config.shard.count,
        "Configuration loaded"
    );

    let client = Arc::new(GatewayClient::builder(config).build()?);

    client.add_listener(
        EventCategories::ALL,
        listener_fn("event_logger", |event: Arc<Event>| async move {
            info!(event_type = event.name(), "{event}");
            Ok(())
        }),
    );

    client.start()?;

    let signal_client = Arc::clone(&client);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal_client.shutdown();
        }
    });

    client.run().await?;
    Ok(())
}
