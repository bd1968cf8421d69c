//! TCP server accepting injector connections.
//!
//! Each peer gets its own task which:
//! - answers the handshake
//! - decodes transactions and adds them to the pool
//! - answers chain height requests from the ledger

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, error, info, trace, warn};
use tokio_util::sync::CancellationToken;
use txbench_common::config::PROTOCOL_VERSION;
use txbench_common::network::{read_packet, write_packet, ConnectionError, Handshake, Packet};
use txbench_common::serializer::Serializer;
use txbench_common::tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use txbench_common::tokio::net::{TcpListener, TcpStream};
use txbench_common::tokio::spawn_task;
use txbench_common::tokio::time::{interval, timeout, MissedTickBehavior};
use txbench_common::transaction::Transaction;

use crate::config::NodeConfig;
use crate::error::{ServerError, ServerResult};
use crate::ledger::Ledger;
use crate::txpool::TxPool;

/// Tag sent in our handshake.
pub const NODE_TAG: &str = "txbench_daemon";

/// Time given to a new peer to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub type PeerId = u64;

/// Connected peer, as announced in its handshake.
#[derive(Debug)]
pub struct PeerInfo {
    pub addr: SocketAddr,
    pub node_tag: String,
    pub consensus: bool,
    received: AtomicU64,
}

impl PeerInfo {
    pub fn get_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

pub struct NodeServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: NodeConfig,
    ledger: Ledger,
    pool: Arc<TxPool>,
    peers: DashMap<PeerId, Arc<PeerInfo>>,
    next_id: AtomicU64,
}

impl NodeServer {
    /// Bind the listener, use port 0 to let the OS pick one.
    pub async fn bind(address: &str, config: NodeConfig) -> ServerResult<Arc<Self>> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::BindFailed(address.to_owned(), e))?;
        let local_addr = listener.local_addr()?;

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Node listening on {} (max peers: {}, verify signatures: {})",
                local_addr, config.max_peers, config.verify_signatures
            );
        }

        Ok(Arc::new(Self {
            listener,
            local_addr,
            config,
            ledger: Ledger::new(),
            pool: Arc::new(TxPool::new()),
            peers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn pool(&self) -> &Arc<TxPool> {
        &self.pool
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn get_peer(&self, id: &PeerId) -> Option<Arc<PeerInfo>> {
        self.peers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Accept peers until the token is cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> ServerResult<()> {
        let reporter = spawn_task(
            "node-reporter",
            Arc::clone(&self).report_loop(cancel.clone()),
        );

        loop {
            let accepted = txbench_common::tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    if self.peers.len() >= self.config.max_peers {
                        if log::log_enabled!(log::Level::Warn) {
                            warn!(
                                "Refusing {}: {}",
                                addr,
                                ServerError::TooManyPeers(self.config.max_peers)
                            );
                        }
                        continue;
                    }

                    let server = Arc::clone(&self);
                    let cancel = cancel.child_token();
                    spawn_task(format!("peer-{}", addr), async move {
                        if let Err(e) = server.handle_peer(stream, addr, cancel).await {
                            if log::log_enabled!(log::Level::Debug) {
                                debug!("Peer {} dropped: {}", addr, e);
                            }
                        }
                    });
                }
                Err(e) => {
                    if log::log_enabled!(log::Level::Error) {
                        error!("Error while accepting a peer: {}", e);
                    }
                }
            }
        }

        info!("Node server stopped, {} transactions received", self.pool.get_total());
        let _ = reporter.await;
        Ok(())
    }

    /// Log the pool throughput at every report interval.
    async fn report_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut timer = interval(self.config.report_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes right away
        timer.tick().await;
        let mut last = Instant::now();

        loop {
            txbench_common::tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    let now = Instant::now();
                    self.pool.report(now.duration_since(last));
                    last = now;
                }
            }
        }
    }

    async fn handle_peer(
        self: Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> ServerResult<()> {
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();

        let handshake = match timeout(HANDSHAKE_TIMEOUT, read_packet(&mut reader)).await {
            Ok(Ok(Packet::Handshake(handshake))) => handshake,
            Ok(Ok(_)) | Err(_) => return Err(ServerError::ExpectedHandshake),
            Ok(Err(e)) => return Err(e.into()),
        };

        if handshake.version != PROTOCOL_VERSION {
            return Err(ServerError::UnsupportedVersion(handshake.version));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let peer = Arc::new(PeerInfo {
            addr,
            node_tag: handshake.node_tag,
            consensus: handshake.consensus,
            received: AtomicU64::new(0),
        });
        // Registered before our handshake so the peer is visible once it gets the reply
        self.peers.insert(id, Arc::clone(&peer));

        if log::log_enabled!(log::Level::Info) {
            info!(
                "New peer {} ({}), consensus lane: {}",
                addr, peer.node_tag, peer.consensus
            );
        }

        let res = self.serve_peer(&peer, &mut reader, &mut writer, cancel).await;
        self.peers.remove(&id);

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Peer {} disconnected after {} transactions",
                addr,
                peer.get_received()
            );
        }

        res
    }

    async fn serve_peer(
        &self,
        peer: &PeerInfo,
        reader: &mut OwnedReadHalf,
        writer: &mut OwnedWriteHalf,
        cancel: CancellationToken,
    ) -> ServerResult<()> {
        write_packet(
            writer,
            &Packet::Handshake(Handshake::new(NODE_TAG, peer.consensus)),
        )
        .await?;

        loop {
            let packet = txbench_common::tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                packet = read_packet(reader) => packet,
            };

            match packet {
                Ok(Packet::Transaction(bytes)) => match Transaction::from_bytes(&bytes) {
                    Ok(tx) => {
                        peer.received.fetch_add(1, Ordering::Relaxed);
                        let hash = self.pool.add_transaction(&tx, self.config.verify_signatures);
                        if log::log_enabled!(log::Level::Trace) {
                            trace!("Transaction {} from {}", hash, peer.addr);
                        }
                    }
                    Err(e) => {
                        // A bad transaction does not close the connection
                        if log::log_enabled!(log::Level::Warn) {
                            warn!("{} from {}", ServerError::InvalidTransaction(e), peer.addr);
                        }
                    }
                },
                Ok(Packet::GetChainHeight) => {
                    let height = self.ledger.get_block_height();
                    write_packet(writer, &Packet::ChainHeight(height)).await?;
                }
                Ok(Packet::Ping) => {
                    trace!("Ping from {}", peer.addr);
                }
                Ok(packet) => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!("Ignoring packet {} from {}", packet.id(), peer.addr);
                    }
                }
                Err(ConnectionError::Closed) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use txbench_common::{
        crypto::KeyPair,
        tokio::io::AsyncWriteExt,
        transaction::{
            InvokeNativePayload, SignatureRecord, State, TransactionPayload, Transfers, TxVersion,
        },
    };

    async fn start(config: NodeConfig) -> (Arc<NodeServer>, CancellationToken) {
        let server = NodeServer::bind("127.0.0.1:0", config).await.unwrap();
        let cancel = CancellationToken::new();
        tokio::spawn(Arc::clone(&server).run(cancel.clone()));
        (server, cancel)
    }

    async fn connect(addr: SocketAddr, version: u16) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut handshake = Handshake::new("test", false);
        handshake.version = version;
        write_packet(&mut stream, &Packet::Handshake(handshake))
            .await
            .unwrap();
        stream
    }

    fn signed_transfer(keypair: &KeyPair, nonce: u64) -> Transaction {
        let transfers = Transfers {
            states: vec![State {
                from: keypair.address(),
                to: keypair.address().with_index(nonce),
                value: 1,
            }],
        };
        let payload = InvokeNativePayload::transfer(&transfers).unwrap();
        let mut tx = Transaction::new(
            TxVersion::V0,
            keypair.address(),
            TransactionPayload::InvokeNative(payload),
            nonce,
        );
        let signature = keypair.sign(tx.content_hash().as_bytes());
        tx.add_signature_record(SignatureRecord::single(keypair.public_key(), signature));
        tx
    }

    async fn wait_for_total(pool: &TxPool, expected: u64) {
        timeout(Duration::from_secs(5), async {
            while pool.get_total() < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_handshake_and_chain_height() {
        let (server, cancel) = start(NodeConfig::default()).await;
        let mut stream = connect(server.local_addr(), PROTOCOL_VERSION).await;

        let Packet::Handshake(reply) = read_packet(&mut stream).await.unwrap() else {
            panic!("expected a handshake");
        };
        assert_eq!(reply.version, PROTOCOL_VERSION);
        assert!(reply.node_tag.starts_with(NODE_TAG));

        write_packet(&mut stream, &Packet::GetChainHeight).await.unwrap();
        assert_eq!(
            read_packet(&mut stream).await.unwrap(),
            Packet::ChainHeight(1)
        );
        assert_eq!(server.peer_count(), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_transactions_reach_the_pool() {
        let config = NodeConfig {
            verify_signatures: true,
            ..Default::default()
        };
        let (server, cancel) = start(config).await;
        let mut stream = connect(server.local_addr(), PROTOCOL_VERSION).await;
        read_packet(&mut stream).await.unwrap();

        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 7);
        write_packet(&mut stream, &Packet::Transaction(Bytes::from(tx.to_bytes())))
            .await
            .unwrap();
        // Garbage is ignored without closing the connection
        write_packet(&mut stream, &Packet::Transaction(Bytes::from_static(b"nope")))
            .await
            .unwrap();
        let other = signed_transfer(&keypair, 8);
        write_packet(&mut stream, &Packet::Transaction(Bytes::from(other.to_bytes())))
            .await
            .unwrap();

        wait_for_total(server.pool(), 2).await;
        assert!(server.pool().contains(&tx.content_hash()));
        assert!(server.pool().contains(&other.content_hash()));
        assert_eq!(server.pool().get_invalid_signatures(), 0);
        assert_eq!(server.get_peer(&0).unwrap().get_received(), 2);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_wrong_version_is_dropped() {
        let (server, cancel) = start(NodeConfig::default()).await;
        let mut stream = connect(server.local_addr(), PROTOCOL_VERSION + 1).await;

        assert!(matches!(
            read_packet(&mut stream).await,
            Err(ConnectionError::Closed)
        ));
        assert_eq!(server.peer_count(), 0);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_peer_removed_on_disconnect() {
        let (server, cancel) = start(NodeConfig::default()).await;
        let mut stream = connect(server.local_addr(), PROTOCOL_VERSION).await;
        read_packet(&mut stream).await.unwrap();
        assert_eq!(server.peer_count(), 1);

        stream.shutdown().await.unwrap();
        drop(stream);

        timeout(Duration::from_secs(5), async {
            while server.peer_count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_max_peers() {
        let config = NodeConfig {
            max_peers: 1,
            ..Default::default()
        };
        let (server, cancel) = start(config).await;
        let mut first = connect(server.local_addr(), PROTOCOL_VERSION).await;
        read_packet(&mut first).await.unwrap();

        // Dropped without any reply
        let mut second = connect(server.local_addr(), PROTOCOL_VERSION).await;
        assert!(read_packet(&mut second).await.is_err());
        assert_eq!(server.peer_count(), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_run_returns_on_cancel() {
        let server = NodeServer::bind("127.0.0.1:0", NodeConfig::default())
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&server).run(cancel.clone()));

        cancel.cancel();
        timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let server = NodeServer::bind("127.0.0.1:0", NodeConfig::default())
            .await
            .unwrap();
        let taken = server.local_addr().to_string();
        assert!(matches!(
            NodeServer::bind(&taken, NodeConfig::default()).await,
            Err(ServerError::BindFailed(_, _))
        ));
    }
}
