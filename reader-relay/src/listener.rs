use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{RelayConfig, PORT_RETRY_RANGE};
use crate::error::RelayError;
use crate::registry::ViewerRegistry;
use crate::render;
use crate::request::{self, Decoded};

const MAX_REQUEST_LINE: u64 = 8 * 1024;

/// The loopback relay server.
///
/// Owns the listening socket and the viewer registry. Connections are
/// accepted on a background task and handled one at a time: read one
/// request line, decode, resolve through the addressed viewer, stream the
/// rendered response back, close. Every per-connection failure is logged
/// and contained; nothing that happens on one connection stops the loop.
pub struct RelayServer {
    config: RelayConfig,
    registry: ViewerRegistry,
    handshake_tx: Option<mpsc::Sender<String>>,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            registry: ViewerRegistry::new(),
            handshake_tx: None,
            running: None,
        }
    }

    /// Register the handler handshake messages are forwarded to.
    pub fn with_handshake(mut self, tx: mpsc::Sender<String>) -> Self {
        self.handshake_tx = Some(tx);
        self
    }

    /// Handle to the process-wide viewer registry.
    pub fn registry(&self) -> ViewerRegistry {
        self.registry.clone()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bind the loopback socket and spawn the accept loop.
    ///
    /// Tries the configured port, and with `use_retry_range` up to nine
    /// subsequent ports. When no port is available the failure is logged
    /// and the relay simply stays unbound: callers treat `None` as
    /// "relay disabled", not as a fault.
    pub async fn start(&mut self, use_retry_range: bool) -> Option<SocketAddr> {
        if self.running.is_some() {
            return self.local_addr();
        }
        let listener = bind_loopback(self.config.port, use_retry_range).await?;
        let addr = listener.local_addr().ok()?;

        let registry = self.registry.clone();
        let handshake_tx = self.handshake_tx.clone();
        let read_timeout = self.config.read_timeout();
        let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
        let join = tokio::spawn(async move {
            info!(%addr, "content relay listening");
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        info!("relay shutdown requested");
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                // one request is fully served before the
                                // next accept; cancellation is only
                                // observed between connections
                                let outcome = handle_connection(
                                    stream,
                                    &registry,
                                    handshake_tx.as_ref(),
                                    read_timeout,
                                )
                                .await;
                                if let Err(err) = outcome {
                                    warn!(%peer, error = %err, "relay connection failed");
                                }
                            }
                            Err(err) => warn!(error = %err, "accept failed"),
                        }
                    }
                }
            }
        });

        self.running = Some(Running {
            addr,
            cancel_tx,
            join,
        });
        Some(addr)
    }

    /// Cancel the accept loop and close the listening socket. An in-flight
    /// connection finishes first; no response is cut off mid-write.
    pub async fn stop(&mut self) -> Result<(), RelayError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let _ = running.cancel_tx.send(());
        running.join.await.map_err(RelayError::from)
    }
}

async fn bind_loopback(port: u16, use_retry_range: bool) -> Option<TcpListener> {
    let attempts = if use_retry_range { PORT_RETRY_RANGE + 1 } else { 1 };
    for offset in 0..attempts {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::from(([127, 0, 0, 1], candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if offset > 0 {
                    info!(%addr, "default relay port taken, bound fallback");
                }
                return Some(listener);
            }
            Err(err) => debug!(%addr, error = %err, "relay port unavailable"),
        }
    }
    warn!(port, "no relay port available, relay stays disabled");
    None
}

async fn handle_connection(
    stream: TcpStream,
    registry: &ViewerRegistry,
    handshake_tx: Option<&mpsc::Sender<String>>,
    read_timeout: Duration,
) -> Result<(), RelayError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half).take(MAX_REQUEST_LINE);
    let mut line = String::new();
    tokio::time::timeout(read_timeout, reader.read_line(&mut line)).await??;

    match request::decode(&line) {
        Decoded::Handshake(token) => match handshake_tx {
            Some(tx) => tx
                .send(token)
                .await
                .map_err(|_| RelayError::HandshakeClosed)?,
            None => debug!("handshake received but no handler registered"),
        },
        Decoded::Malformed => {
            debug!(line = line.trim_end(), "malformed request, no content to serve");
        }
        Decoded::Display(request) => {
            let source = registry.lookup(&request.viewer_id);
            let items = match &source {
                Some(source) => match source.resolve(&request.refs()).await {
                    Ok(items) => items,
                    Err(err) => {
                        warn!(error = %err, "reference resolution failed");
                        Vec::new()
                    }
                },
                None => {
                    debug!(viewer = %request.viewer_id, "unknown viewer id");
                    Vec::new()
                }
            };
            let response = render::render_response(source.as_deref(), &items, Utc::now());
            write_half.write_all(&response).await?;
            write_half.shutdown().await?;
        }
    }
    Ok(())
}
