use crate::core::relay::event::{EventSender, RelayEvent};
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::types::SubscriberId;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

/// Accepts WebSocket subscribers and turns their traffic into relay events
pub struct WsServer {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    shutdown_sender: Option<mpsc::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WsServer {
    /// Bind the listener. This is the only fatal error at runtime.
    pub async fn bind(addr: SocketAddr) -> RelayResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;

        let actual_addr = listener.local_addr()?;
        info!("WebSocket server listening on {}", actual_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr: actual_addr,
            shutdown_sender: None,
            server_handle: None,
        })
    }

    pub fn get_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }

    /// Start the accept loop; each subscriber gets its own task
    pub fn start(&mut self, events: EventSender) -> RelayResult<()> {
        let listener = self.listener.take().ok_or_else(|| RelayError::Server {
            message: "WebSocket server is already running".to_string(),
        })?;

        let (shutdown_sender, mut shutdown_receiver) = mpsc::channel::<()>(1);

        let server_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                debug!("TCP connection from {}", addr);
                                let events = events.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_subscriber(stream, addr, events).await {
                                        warn!("Websocket session {} ended with error: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }

                    _ = shutdown_receiver.recv() => {
                        info!("WebSocket server stopping");
                        break;
                    }
                }
            }
        });

        self.shutdown_sender = Some(shutdown_sender);
        self.server_handle = Some(server_handle);
        Ok(())
    }

    /// Stop accepting. Open sessions end when the relay closes their outboxes.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            if let Some(sender) = self.shutdown_sender.take() {
                if let Err(e) = sender.send(()).await {
                    warn!("Failed to send shutdown signal: {}", e);
                }
            }

            if let Err(e) = handle.await {
                warn!("Server task completed with error: {}", e);
            }

            info!("WebSocket server stopped");
        }
    }
}

impl Drop for WsServer {
    fn drop(&mut self) {
        if self.server_handle.is_some() {
            warn!("WsServer dropped while still running - server may not shutdown gracefully");
        }
    }
}

/// Run one subscriber from handshake to close
async fn handle_subscriber(stream: TcpStream, addr: SocketAddr, events: EventSender) -> RelayResult<()> {
    let ws_stream = accept_async(stream).await?;
    let id = SubscriberId::new();
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<String>();

    events
        .send(RelayEvent::Connected { id, addr, outbox })
        .map_err(|_| RelayError::ChannelClosed)?;

    loop {
        tokio::select! {
            frame = inbox.recv() => match frame {
                Some(text) => {
                    if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
                        debug!("Send to {} failed: {}", id, e);
                        break;
                    }
                }
                None => {
                    debug!("Relay closed the outbox of {}", id);
                    if let Err(e) = ws_tx.close().await {
                        debug!("Close handshake with {} failed: {}", id, e);
                    }
                    break;
                }
            },

            incoming = ws_rx.next() => match incoming {
                Some(Ok(WsMessage::Text(message))) => {
                    if events.send(RelayEvent::FromSubscriber { id, message }).is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    let message = String::from_utf8_lossy(&data).into_owned();
                    if events.send(RelayEvent::FromSubscriber { id, message }).is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("Subscriber {} closed the connection", id);
                    break;
                }
                Some(Ok(_)) => {
                    // ping/pong handled by tungstenite
                }
                Some(Err(e)) => {
                    debug!("Websocket error from {}: {}", id, e);
                    break;
                }
            },
        }
    }

    if events.send(RelayEvent::Disconnected { id }).is_err() {
        debug!("Relay gone before {} disconnected", id);
    }
    Ok(())
}
