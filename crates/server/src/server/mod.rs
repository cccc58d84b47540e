//! WebSocket front end: the accept loop and per-connection tasks.

pub mod session;

pub use session::SessionDirectory;

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::ServerMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let directory = SessionDirectory::new(config);

    loop {
        let (stream, addr) = listener.accept().await?;
        let directory = Arc::clone(&directory);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, directory).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
///
/// Outbound traffic flows through an unbounded channel so broadcasts
/// never block on a slow socket; this task owns the only writer.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    directory: Arc<SessionDirectory>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client_id = directory.register(tx).await;
    directory
        .send_to(
            client_id,
            ServerMessage::Success {
                msg: "New socket opened".to_string(),
            },
        )
        .await;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        directory.handle_message(client_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        let text = protocol::encode(&message)?;
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    directory.handle_disconnect(client_id).await;
    Ok(())
}
