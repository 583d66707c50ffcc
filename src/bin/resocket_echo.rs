//! Interactive managed-connection client
//!
//! Opens a managed connection, forwards each stdin line as a text frame
//! and logs every lifecycle notification. Runs until Ctrl+C or EOF.
//!
//! ```text
//! RESOCKET_URL=wss://echo.example.com cargo run --bin resocket-echo
//! cargo run --bin resocket-echo -- ws://127.0.0.1:9000
//! ```

use anyhow::{Context, Result};
use resocket::{Handlers, WebSocketConnection, WsMessage};
use resocket_tools::bin_common::{
    endpoint_from_env, init_tracing, load_config_from_env, load_connection_options, parse_args,
    ConfigType, ShutdownManager,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = parse_args();
    let url = endpoint_from_env(&args)
        .context("no endpoint: pass a ws:// URL or set RESOCKET_URL")?;

    let config_path = load_config_from_env(ConfigType::Connection);
    let options = load_connection_options(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    info!("Options: {:?}", options);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let handlers = Handlers::new()
        .on_open(|event| info!("Open: {} (protocol: {:?})", event.url, event.protocol))
        .on_message(|message| match message {
            WsMessage::Text(text) => info!("<< {}", text),
            WsMessage::Binary(data) => info!("<< {} bytes", data.len()),
        })
        .on_error(|err| warn!("Error: {}", err))
        .on_close(|event| info!("Closed: {} {}", event.code, event.reason))
        .on_reconnect(|| info!("Reconnected"))
        .on_reconnect_fail(|| error!("Reconnect attempts exhausted"))
        .on_ping(|| info!("Ping sent"));

    let connection = WebSocketConnection::builder()
        .url(url)
        .options(options)
        .handler(handlers)
        .build()?;

    info!("");
    info!("========================================");
    info!("Starting resocket-echo");
    info!("Type a line to send it, Ctrl+C to stop");
    info!("========================================");

    connection.open().await.context("initial open failed")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            line = lines.next_line() => match line? {
                Some(line) if line.is_empty() => {}
                Some(line) => {
                    if let Err(e) = connection.send(line).await {
                        warn!("Send failed: {}", e);
                    }
                }
                None => break,
            },
        }
    }

    connection.close(None).await?;
    info!("resocket-echo stopped gracefully");
    Ok(())
}
