use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use realtime_bridge::cli::{resolve_config, Args, PrintStore};
use realtime_bridge::{UpdateBridgeBuilder, WsConnection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = resolve_config(&args)?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let server_url = config.server_url.clone();
    let mut bridge = UpdateBridgeBuilder::new(config.base_path.clone())
        .store(Arc::new(PrintStore))
        .transports(config.transports.clone())
        .reconnect(config.reconnect.clone())
        .build(|opts| WsConnection::open(&server_url, opts, events_tx))?;

    info!(url = %bridge.connection().url(), "following push endpoint");
    let session_ended = bridge.connection().session_ended();

    tokio::select! {
        _ = bridge.run(&mut events_rx) => {}
        _ = session_ended.notified() => {
            info!("push session ended, no further reconnection");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, closing push connection");
        }
    }

    while let Ok(event) = events_rx.try_recv() {
        bridge.handle(event);
    }

    bridge.shutdown();
    Ok(())
}
