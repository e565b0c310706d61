use crate::config::ChorusConfig;
use crate::device::DeviceAdapter;
use crate::error::{ChorusError, Result};
use crate::protocol::ChorusMessage;
use crate::transport::PeerConnection;
use crate::transport::buffer_pool::{BufferPool, PooledBuf};
use crate::transport::router::PeerRouter;
use crate::types::{Rank, Tag};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Cached tagged receiver map: (peer rank, tag) -> shared receiver.
type TagReceiverMap = HashMap<(Rank, Tag), Arc<Mutex<mpsc::Receiver<Vec<u8>>>>>;

/// The async communicator for one participant of a fixed group.
///
/// Holds peer connections (for sending) and per-peer routers (for
/// receiving). The routers run as background tasks that demultiplex
/// incoming QUIC streams into typed lanes, preventing races between
/// consumers (barrier, tagged receives, collective rounds) that would
/// otherwise steal each other's messages.
///
/// The group is fixed at construction: `rank()` and `size()` are constant
/// for the communicator's lifetime, and no membership changes occur.
///
/// # Example
///
/// ```no_run
/// use chorus::{Communicator, CpuAdapter};
/// use std::sync::Arc;
///
/// # async fn example() -> chorus::Result<()> {
/// let adapter = Arc::new(CpuAdapter::new());
/// let comms = Communicator::bootstrap_local(4, adapter).await?;
///
/// // Each communicator has a unique rank in [0, size).
/// assert_eq!(comms[0].rank(), 0);
/// assert_eq!(comms[0].size(), 4);
/// # Ok(())
/// # }
/// ```
pub struct Communicator {
    pub(crate) rank: Rank,
    pub(crate) size: u32,
    /// Sending side: one `PeerConnection` per remote rank.
    pub(crate) peers: HashMap<Rank, Arc<PeerConnection>>,
    /// Receiving side: one `PeerRouter` per remote rank.
    routers: HashMap<Rank, PeerRouter>,
    /// Background router tasks; kept alive for the lifetime of this communicator.
    _router_handles: Vec<tokio::task::JoinHandle<Result<()>>>,
    pub(crate) adapter: Arc<dyn DeviceAdapter>,
    /// Shared buffer pool for router read buffers.
    _pool: Arc<BufferPool>,
    config: Arc<ChorusConfig>,
    barrier_epoch: AtomicU64,
    /// Barrier arrivals dispatched ahead of their occurrence, keyed
    /// (peer, epoch). Adjacent occurrences ride separate streams, so a
    /// later epoch's arrival can be demultiplexed first.
    barrier_stash: Mutex<HashSet<(Rank, u64)>>,
    /// Cached receivers for tagged data channels: (peer rank, tag) -> receiver.
    /// Lazily created on first `recv_payload` call per (rank, tag) pair.
    tag_receivers: Mutex<TagReceiverMap>,
}

impl Communicator {
    /// Create a communicator from pre-established peer connections.
    pub fn new(
        rank: Rank,
        size: u32,
        peers: HashMap<Rank, PeerConnection>,
        adapter: Arc<dyn DeviceAdapter>,
        config: Arc<ChorusConfig>,
    ) -> Self {
        let pool = BufferPool::new();
        let mut peer_arcs: HashMap<Rank, Arc<PeerConnection>> = HashMap::new();
        let mut routers: HashMap<Rank, PeerRouter> = HashMap::new();
        let mut handles = Vec::new();

        for (peer_rank, peer_conn) in peers {
            let conn_clone = peer_conn.conn.clone();
            let (router, handle) = PeerRouter::spawn(
                peer_rank,
                conn_clone,
                Arc::clone(&pool),
                config.max_message_bytes,
            );
            peer_arcs.insert(peer_rank, Arc::new(peer_conn));
            routers.insert(peer_rank, router);
            handles.push(handle);
        }

        Self {
            rank,
            size,
            peers: peer_arcs,
            routers,
            _router_handles: handles,
            adapter,
            _pool: pool,
            config,
            barrier_epoch: AtomicU64::new(0),
            barrier_stash: Mutex::new(HashSet::new()),
            tag_receivers: Mutex::new(HashMap::new()),
        }
    }

    /// This participant's rank within the group (0-indexed).
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Total number of participants in the group.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The active configuration.
    pub fn config(&self) -> &ChorusConfig {
        &self.config
    }

    /// Reference to the device adapter used for memory staging.
    pub fn adapter(&self) -> &dyn DeviceAdapter {
        self.adapter.as_ref()
    }

    /// Get a reference to a peer connection (for sending).
    pub(crate) fn peer(&self, rank: Rank) -> Result<&Arc<PeerConnection>> {
        self.peers.get(&rank).ok_or(ChorusError::UnknownPeer { rank })
    }

    /// Get the next barrier epoch (per-communicator occurrence counter).
    pub(crate) fn next_barrier_epoch(&self) -> u64 {
        self.barrier_epoch.fetch_add(1, Ordering::Relaxed)
    }

    /// Receive the next message from the control lane for a given peer.
    pub(crate) async fn recv_control(&self, src: Rank) -> Result<ChorusMessage> {
        let router = self
            .routers
            .get(&src)
            .ok_or(ChorusError::UnknownPeer { rank: src })?;
        router.recv_control(src).await
    }

    /// Receive `Barrier { epoch }` from `src`, tolerating arrivals for
    /// later occurrences being dispatched first: those are stashed and
    /// consumed when their occurrence comes around.
    pub(crate) async fn recv_barrier(&self, src: Rank, epoch: u64) -> Result<()> {
        if self.barrier_stash.lock().await.remove(&(src, epoch)) {
            return Ok(());
        }
        loop {
            match self.recv_control(src).await? {
                ChorusMessage::Barrier { epoch: e } if e == epoch => return Ok(()),
                ChorusMessage::Barrier { epoch: e } => {
                    self.barrier_stash.lock().await.insert((src, e));
                }
                other => {
                    return Err(ChorusError::CollectiveFailed {
                        operation: "barrier",
                        rank: src,
                        reason: format!("expected Barrier(epoch={epoch}), got {other:?}"),
                    });
                }
            }
        }
    }

    /// Send raw bytes to a peer (collective rounds).
    pub(crate) async fn send_bytes(&self, dest: Rank, data: &[u8]) -> Result<()> {
        self.peer(dest)?.send_raw(data).await
    }

    /// Receive raw bytes from a peer (collective rounds).
    pub(crate) async fn recv_bytes(&self, src: Rank) -> Result<PooledBuf> {
        let router = self
            .routers
            .get(&src)
            .ok_or(ChorusError::UnknownPeer { rank: src })?;
        router.recv_raw(src).await
    }

    /// Send a tagged data payload to a peer.
    pub(crate) async fn send_payload(&self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<()> {
        let msg = ChorusMessage::Data {
            tag,
            src_rank: self.rank,
            payload,
        };
        self.peer(dest)?
            .send_message(&msg, crate::types::Priority::Bulk)
            .await
    }

    /// Receive the next tagged data payload from a peer.
    ///
    /// The tag channel is lazily created and cached for the lifetime of
    /// this (rank, tag) pair, so payloads that arrive before the receiver
    /// is first polled are not lost.
    pub(crate) async fn recv_payload(&self, src: Rank, tag: Tag) -> Result<Vec<u8>> {
        let key = (src, tag);

        let rx_arc = {
            let mut map = self.tag_receivers.lock().await;
            if let Some(rx) = map.get(&key) {
                Arc::clone(rx)
            } else {
                let router = self
                    .routers
                    .get(&src)
                    .ok_or(ChorusError::UnknownPeer { rank: src })?;
                let rx = router.register_tag(tag).await;
                let rx_arc = Arc::new(Mutex::new(rx));
                map.insert(key, Arc::clone(&rx_arc));
                rx_arc
            }
        };

        let mut rx = rx_arc.lock().await;
        rx.recv()
            .await
            .ok_or(ChorusError::PeerDisconnected { rank: src })
    }

    /// Validate that `rank` names another participant of this group.
    pub(crate) fn check_peer_rank(&self, rank: Rank) -> Result<()> {
        if rank >= self.size {
            return Err(ChorusError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        if rank == self.rank {
            // No loopback channel exists; self-addressed operations have
            // no valid pairing.
            return Err(ChorusError::UnknownPeer { rank });
        }
        Ok(())
    }
}
