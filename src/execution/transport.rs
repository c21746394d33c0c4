//! # Request/Reply Transport
//!
//! Newline-framed TCP request/reply socket for worker messages. Each
//! connection task reads one line at a time and hands it to the manager as
//! an [`InboundRequest`] over a single channel, then waits for the reply
//! before reading the next line. The manager therefore sees requests
//! strictly one after another no matter how many workers are connected,
//! and every request gets exactly one reply because replying consumes it.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::messaging::Message;

/// Requests queued between connection tasks and the manager loop
const REQUEST_QUEUE_SIZE: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to bind {address}: {error}")]
    Bind { address: String, error: String },

    /// The requesting connection went away before the reply was sent
    #[error("Connection {connection_id} closed before reply")]
    ReplyDropped { connection_id: String },
}

/// One framed request awaiting its reply
#[derive(Debug)]
pub struct InboundRequest {
    /// Raw line, terminator included when present
    pub body: Vec<u8>,
    pub peer: SocketAddr,
    pub connection_id: String,
    reply_tx: oneshot::Sender<String>,
}

impl InboundRequest {
    /// Send the reply for this request
    pub fn reply(self, reply: &Message) -> Result<(), TransportError> {
        self.reply_tx
            .send(reply.encode())
            .map_err(|_| TransportError::ReplyDropped {
                connection_id: self.connection_id,
            })
    }
}

/// Bound listening socket plus the queue of inbound requests
pub struct Transport {
    local_addr: SocketAddr,
    requests: mpsc::Receiver<InboundRequest>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Transport {
    /// Bind `address` and start accepting connections
    pub async fn bind(address: &str) -> Result<Self, TransportError> {
        let bind_error = |e: std::io::Error| TransportError::Bind {
            address: address.to_string(),
            error: e.to_string(),
        };

        let listener = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (request_tx, requests) = mpsc::channel(REQUEST_QUEUE_SIZE);
        let (shutdown_tx, _) = broadcast::channel(16);

        tokio::spawn(accept_connections(listener, request_tx, shutdown_tx.clone()));
        info!(address = %local_addr, "Transport listening");

        Ok(Self {
            local_addr,
            requests,
            shutdown_tx,
        })
    }

    /// Address actually bound; differs from the requested one for port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next request from any connection
    ///
    /// Returns `None` once the transport has shut down.
    pub async fn receive(&mut self) -> Option<InboundRequest> {
        self.requests.recv().await
    }

    /// Stop accepting connections and close every open one
    pub fn shutdown(&self) {
        // No receivers just means every task has already finished
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_connections(
    listener: TcpListener,
    request_tx: mpsc::Sender<InboundRequest>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let connection_id = uuid::Uuid::new_v4().to_string();
                        debug!(connection_id = %connection_id, peer = %peer, "New connection");
                        tokio::spawn(handle_connection(
                            connection_id,
                            stream,
                            peer,
                            request_tx.clone(),
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                debug!("Connection acceptance loop shutting down");
                break;
            }
        }
    }
}

async fn handle_connection(
    connection_id: String,
    stream: TcpStream,
    peer: SocketAddr,
    request_tx: mpsc::Sender<InboundRequest>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read_result = tokio::select! {
            read_result = reader.read_until(b'\n', &mut line) => read_result,
            _ = shutdown_rx.recv() => break,
        };

        match read_result {
            Ok(0) => {
                debug!(connection_id = %connection_id, "Connection closed by peer");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Error reading from connection");
                break;
            }
        }
        let at_eof = line.last() != Some(&b'\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = InboundRequest {
            body: std::mem::take(&mut line),
            peer,
            connection_id: connection_id.clone(),
            reply_tx,
        };
        if request_tx.send(request).await.is_err() {
            debug!(connection_id = %connection_id, "Manager no longer receiving requests");
            break;
        }

        let reply = tokio::select! {
            reply = reply_rx => reply,
            _ = shutdown_rx.recv() => break,
        };
        let Ok(mut reply) = reply else {
            warn!(connection_id = %connection_id, "Request dropped without a reply");
            break;
        };
        reply.push('\n');

        if let Err(e) = writer.write_all(reply.as_bytes()).await {
            warn!(connection_id = %connection_id, error = %e, "Failed to send reply");
            break;
        }
        if at_eof {
            break;
        }
    }

    debug!(connection_id = %connection_id, "Connection handler completed");
}
