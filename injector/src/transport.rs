//! Outgoing peer connections to the nodes under test.
//!
//! Broadcast is best effort: a frame is queued on every matching peer
//! writer and nothing is acknowledged.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use log::{debug, info, trace, warn};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::mpsc,
    time::timeout,
};
use txbench_common::{
    config::{PEER_SEND_CHANNEL_SIZE, PROTOCOL_VERSION},
    network::{encode_frame, read_packet, write_packet, ConnectionError, Handshake, Packet},
    tokio::spawn_task,
};

// Tag sent in our handshake
pub const NODE_TAG: &str = "txbench";

pub type PeerId = u64;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No peer connected on the requested lane")]
    NoPeer,
    #[error("Error while sending to every peer")]
    SendError,
    #[error("Timed out while connecting to {0}")]
    ConnectTimeout(String),
    #[error("Handshake rejected by {0}: {1}")]
    HandshakeRejected(SocketAddr, String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Broadcast capability over established peer connections.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    // Queue a ready to send frame on every peer of the lane
    // Only waits for channel capacity, never for the peer itself
    async fn broadcast(&self, frame: Bytes, consensus: bool) -> Result<(), TransportError>;

    fn connection_count(&self) -> usize;
}

pub struct Peer {
    id: PeerId,
    addr: SocketAddr,
    node_tag: String,
    consensus: bool,
    // Frames waiting to be written by the writer task
    tx: mpsc::Sender<Bytes>,
}

impl Peer {
    pub fn get_id(&self) -> PeerId {
        self.id
    }

    pub fn get_addr(&self) -> &SocketAddr {
        &self.addr
    }

    pub fn get_node_tag(&self) -> &str {
        &self.node_tag
    }

    pub fn is_consensus(&self) -> bool {
        self.consensus
    }

    pub async fn send_bytes(&self, bytes: Bytes) -> Result<(), TransportError> {
        self.tx
            .send(bytes)
            .await
            .map_err(|_| TransportError::SendError)
    }
}

pub struct PeerNetwork {
    peers: Arc<DashMap<PeerId, Arc<Peer>>>,
    next_id: AtomicU64,
    connect_timeout: Duration,
}

impl PeerNetwork {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            connect_timeout,
        }
    }

    // Connect to a node, exchange handshakes and start the peer tasks
    pub async fn connect(&self, address: &str, consensus: bool) -> Result<PeerId, TransportError> {
        info!("Connecting to {}", address);
        let stream = timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::ConnectTimeout(address.to_owned()))??;
        stream.set_nodelay(true)?;
        let addr = stream.peer_addr()?;

        let (mut reader, mut writer) = stream.into_split();
        write_packet(
            &mut writer,
            &Packet::Handshake(Handshake::new(NODE_TAG, consensus)),
        )
        .await?;

        let reply = timeout(self.connect_timeout, read_packet(&mut reader))
            .await
            .map_err(|_| TransportError::ConnectTimeout(address.to_owned()))??;
        let handshake = match reply {
            Packet::Handshake(handshake) => handshake,
            other => {
                return Err(TransportError::HandshakeRejected(
                    addr,
                    format!("expected handshake, got packet {}", other.id()),
                ))
            }
        };

        if handshake.version != PROTOCOL_VERSION {
            return Err(TransportError::HandshakeRejected(
                addr,
                format!("unsupported protocol version {}", handshake.version),
            ));
        }

        // Ask the height right away, the reply is only logged
        write_packet(&mut writer, &Packet::GetChainHeight).await?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = mpsc::channel::<Bytes>(PEER_SEND_CHANNEL_SIZE);
        let peer = Arc::new(Peer {
            id,
            addr,
            node_tag: handshake.node_tag,
            consensus,
            tx,
        });

        info!(
            "Connected to {} ({}), consensus lane: {}",
            addr, peer.node_tag, consensus
        );
        // Registered before the reader task starts so it can always remove it
        self.peers.insert(id, peer);

        spawn_task(format!("peer-{}-writer", id), async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!("Error while writing to peer {}: {}", addr, e);
                    break;
                }
            }
            debug!("Writer task of peer {} exited", addr);
        });

        let peers = Arc::clone(&self.peers);
        spawn_task(format!("peer-{}-reader", id), async move {
            loop {
                match read_packet(&mut reader).await {
                    Ok(Packet::ChainHeight(height)) => {
                        info!("Peer {} is at height {}", addr, height)
                    }
                    Ok(Packet::Ping) => trace!("Ping from {}", addr),
                    Ok(packet) => debug!("Ignoring packet {} from {}", packet.id(), addr),
                    Err(ConnectionError::Closed) => {
                        info!("Peer {} disconnected", addr);
                        break;
                    }
                    Err(e) => {
                        warn!("Error while reading from peer {}: {}", addr, e);
                        break;
                    }
                }
            }

            // Dropping the peer closes its writer channel
            peers.remove(&id);
        });

        Ok(id)
    }

    pub fn get_peer(&self, id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    // Drop every peer, their tasks exit once their connection is gone
    pub fn disconnect_all(&self) {
        self.peers.clear();
    }
}

#[async_trait]
impl PeerTransport for PeerNetwork {
    async fn broadcast(&self, frame: Bytes, consensus: bool) -> Result<(), TransportError> {
        // Collect first, the map must not stay locked across await points
        let peers: Vec<Arc<Peer>> = self
            .peers
            .iter()
            .filter(|entry| entry.value().consensus == consensus)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        if peers.is_empty() {
            return Err(TransportError::NoPeer);
        }

        let mut delivered = 0;
        for peer in peers {
            match peer.send_bytes(frame.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Error while queueing frame for {}: {}", peer.addr, e),
            }
        }

        if delivered == 0 {
            return Err(TransportError::SendError);
        }

        Ok(())
    }

    fn connection_count(&self) -> usize {
        self.peers.len()
    }
}

// Frame a serialized transaction for broadcast
pub fn transaction_frame(bytes: Bytes) -> Result<Bytes, TransportError> {
    Ok(encode_frame(&Packet::Transaction(bytes))?)
}
