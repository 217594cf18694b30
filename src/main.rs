//! PayCall Bridge
//!
//! Standalone voice server for the finance dashboard: bridges a telephony
//! provider's media-stream WebSocket to a conversational voice agent so the
//! agent can talk a client through paying an open invoice over the phone.
//!
//! The server owns three concerns:
//! - the inbound media listener (one WebSocket per live call)
//! - the agent connector (signed URL + outbound WebSocket per call)
//! - the payment tool-call relay (one HTTP hop to the payments API)

mod config;
mod models;
mod server;

use config::BridgeConfig;

fn main() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("paycall_bridge=info".parse().unwrap()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match BridgeConfig::from_env() {
        Some(c) => c,
        None => {
            eprintln!("Missing configuration: AGENT_API_KEY, AGENT_ID and PAYMENT_API_URL must be set");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime")
        .block_on(async {
            tracing::info!("Starting paycall-bridge on port {}", config.port);

            if let Err(e) = server::run_server(config).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        });
}
