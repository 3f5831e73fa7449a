mod config;
mod logging;

use bridge_core::BridgeEvent;
use bridge_pushbullet::spawn_runtime;
use config::SmokeConfig;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "smoke config invalid");
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    info!(
        api_base = %config.init_config.api_base,
        stream_base = %config.init_config.stream_base,
        ring_doorbell = config.ring_doorbell,
        "smoke config loaded"
    );

    let handle = spawn_runtime(config.init_config.clone());
    let mut events = handle.subscribe();

    if let Err(err) = handle.initialize(config.access_token.clone()).await {
        eprintln!("Failed to initialize bridge: {err}");
        std::process::exit(1);
    }
    if config.ring_doorbell {
        match handle.doorbell().await {
            Ok(client_txn_id) => info!(%client_txn_id, "doorbell requested"),
            Err(err) => warn!(error = %err, "doorbell request failed"),
        }
    }

    let deadline = tokio::time::sleep(config.run_for);
    tokio::pin!(deadline);
    loop {
        let event = tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => event,
        };

        match event {
            Ok(BridgeEvent::Action { action }) => println!("action: {action:?}"),
            Ok(BridgeEvent::OutboundComplete(ack)) => match ack.error_code {
                None => println!("doorbell {} delivered", ack.client_txn_id),
                Some(code) => println!("doorbell {} failed: {code}", ack.client_txn_id),
            },
            Ok(BridgeEvent::Status { online, message }) => {
                println!("[{}] {message}", if online { "online" } else { "offline" });
            }
            Ok(BridgeEvent::ConnectionChanged { state }) => println!("connection: {state:?}"),
            Err(_) => break,
        }
    }

    info!(missed_events = events.missed(), "smoke run finished");
}
