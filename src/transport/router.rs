use crate::error::{ChorusError, Result};
use crate::protocol::ChorusMessage;
use crate::protocol::codec::decode_message;
use crate::transport::buffer_pool::{BufferPool, PooledBuf};
use crate::transport::connection::{STREAM_TAG_FRAMED, STREAM_TAG_RAW};
use crate::types::{Rank, Tag};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, mpsc};

/// Channel capacity per message lane.
const LANE_CAPACITY: usize = 256;

/// Maximum number of concurrent in-flight stream handler tasks per peer.
const MAX_CONCURRENT_STREAMS: usize = 512;

/// A demultiplexer that runs a single receive loop on a QUIC connection and
/// routes incoming streams to typed lanes.
///
/// # Lanes
///
/// - **`control`** — barrier and handshake messages
/// - **`data`** — tagged point-to-point payloads, one lazily-created
///   channel per tag so concurrent receives with distinct tags cannot
///   steal each other's messages
/// - **`raw`** — raw byte streams (collective rounds)
pub struct PeerRouter {
    control: Mutex<mpsc::Receiver<ChorusMessage>>,
    raw: Mutex<mpsc::Receiver<PooledBuf>>,
    /// Per-tag data channels for point-to-point pairing.
    data_tags: Arc<Mutex<HashMap<Tag, TagChannel>>>,
}

/// A per-tag data channel. Lazily created when either a message arrives or
/// `register_tag` is called, whichever comes first. Both sides (router
/// sender and communicator receiver) get the same underlying channel.
struct TagChannel {
    tx: mpsc::Sender<Vec<u8>>,
    /// The receiver, stored here until claimed by `register_tag`.
    /// Once claimed, this is `None`.
    rx: Option<mpsc::Receiver<Vec<u8>>>,
}

/// Senders held by the background receive loop. Cloned into per-stream tasks.
#[derive(Clone)]
struct RouterSenders {
    rank: Rank,
    control: mpsc::Sender<ChorusMessage>,
    raw: mpsc::Sender<PooledBuf>,
    data_tags: Arc<Mutex<HashMap<Tag, TagChannel>>>,
    pool: Arc<BufferPool>,
    max_message_bytes: u64,
}

impl PeerRouter {
    /// Spawn a background receive loop for `conn` and return the router.
    pub fn spawn(
        rank: Rank,
        conn: quinn::Connection,
        pool: Arc<BufferPool>,
        max_message_bytes: u64,
    ) -> (Self, tokio::task::JoinHandle<Result<()>>) {
        let (ctrl_tx, ctrl_rx) = mpsc::channel(LANE_CAPACITY);
        let (raw_tx, raw_rx) = mpsc::channel(LANE_CAPACITY);

        let data_tags: Arc<Mutex<HashMap<Tag, TagChannel>>> = Arc::new(Mutex::new(HashMap::new()));

        let senders = RouterSenders {
            rank,
            control: ctrl_tx,
            raw: raw_tx,
            data_tags: Arc::clone(&data_tags),
            pool,
            max_message_bytes,
        };

        let handle = tokio::spawn(accept_loop(conn, senders));

        let router = Self {
            control: Mutex::new(ctrl_rx),
            raw: Mutex::new(raw_rx),
            data_tags,
        };

        (router, handle)
    }

    /// Register a tagged data channel and return the receiver.
    ///
    /// If messages for this tag arrived before registration (lazy creation),
    /// the existing channel's receiver is returned so they are not lost.
    pub async fn register_tag(&self, tag: Tag) -> mpsc::Receiver<Vec<u8>> {
        let mut tags = self.data_tags.lock().await;
        if let Some(ch) = tags.get_mut(&tag)
            && let Some(rx) = ch.rx.take()
        {
            return rx;
        }
        let (tx, rx) = mpsc::channel(LANE_CAPACITY);
        tags.insert(tag, TagChannel { tx, rx: None });
        rx
    }

    /// Receive the next message from the control lane.
    pub async fn recv_control(&self, rank: Rank) -> Result<ChorusMessage> {
        self.control
            .lock()
            .await
            .recv()
            .await
            .ok_or(ChorusError::PeerDisconnected { rank })
    }

    /// Receive raw bytes from the raw lane.
    pub async fn recv_raw(&self, rank: Rank) -> Result<PooledBuf> {
        self.raw
            .lock()
            .await
            .recv()
            .await
            .ok_or(ChorusError::PeerDisconnected { rank })
    }
}

/// The accept loop: accepts incoming QUIC uni streams and spawns a task per stream.
async fn accept_loop(conn: quinn::Connection, tx: RouterSenders) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_STREAMS));

    loop {
        let stream = match conn.accept_uni().await {
            Ok(s) => s,
            Err(_) => return Ok(()),
        };

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            return Ok(()); // Semaphore closed, exit gracefully
        };

        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_stream(stream, &tx).await {
                tracing::error!(
                    rank = tx.rank,
                    "router: local receiver dropped, messages will be lost: {e}"
                );
            }
            drop(permit);
        });
    }
}

/// Read a single stream (tag + payload) and dispatch to the correct lane.
///
/// Returns `Err` if a lane's receiver has been dropped, indicating the
/// local consumer is gone and further messages for this peer will be lost.
async fn handle_stream(mut stream: quinn::RecvStream, tx: &RouterSenders) -> Result<()> {
    let mut tag_buf = [0u8; 1];
    if stream.read_exact(&mut tag_buf).await.is_err() {
        tracing::warn!(
            rank = tx.rank,
            "router: failed to read stream tag, skipping stream"
        );
        return Ok(());
    }

    match tag_buf[0] {
        STREAM_TAG_FRAMED => {
            let msg = match read_framed(&mut stream, tx).await {
                Some(m) => m,
                None => return Ok(()),
            };
            dispatch_framed(msg, tx).await?;
        }
        STREAM_TAG_RAW => {
            let buf = match read_length_prefixed(&mut stream, tx, "raw").await {
                Some(b) => b,
                None => return Ok(()),
            };
            if tx.raw.send(buf).await.is_err() {
                return Err(ChorusError::PeerDisconnected { rank: tx.rank });
            }
        }
        other => {
            tracing::warn!(
                rank = tx.rank,
                "router: unknown stream tag 0x{:02x}, skipping stream",
                other
            );
        }
    }
    Ok(())
}

/// Route a decoded framed message to the correct lane.
///
/// `Data` payloads go to their per-tag channel; everything else is control.
async fn dispatch_framed(msg: ChorusMessage, tx: &RouterSenders) -> Result<()> {
    match msg {
        ChorusMessage::Data { tag, payload, .. } => {
            let mut tags = tx.data_tags.lock().await;
            let ch = tags.entry(tag).or_insert_with(|| {
                let (tx, rx) = mpsc::channel(LANE_CAPACITY);
                TagChannel { tx, rx: Some(rx) }
            });
            if ch.tx.send(payload).await.is_err() {
                return Err(ChorusError::PeerDisconnected { rank: tx.rank });
            }
        }
        ChorusMessage::Barrier { .. }
        | ChorusMessage::BarrierAck { .. }
        | ChorusMessage::Hello { .. }
        | ChorusMessage::Welcome { .. } => {
            if tx.control.send(msg).await.is_err() {
                return Err(ChorusError::PeerDisconnected { rank: tx.rank });
            }
        }
    }
    Ok(())
}

/// Read a length-prefixed payload from a stream into a pooled buffer.
async fn read_length_prefixed(
    stream: &mut quinn::RecvStream,
    tx: &RouterSenders,
    label: &str,
) -> Option<PooledBuf> {
    let mut len_buf = [0u8; 8];
    if let Err(e) = stream.read_exact(&mut len_buf).await {
        tracing::warn!(rank = tx.rank, "router: {label} length read failed: {e}");
        return None;
    }
    let len = u64::from_le_bytes(len_buf);
    if len > tx.max_message_bytes {
        tracing::warn!(
            rank = tx.rank,
            "router: {label} message too large ({len} bytes), skipping"
        );
        return None;
    }
    let mut buf = tx.pool.checkout(len as usize);
    if let Err(e) = stream.read_exact(&mut buf).await {
        tracing::warn!(rank = tx.rank, "router: {label} payload read failed: {e}");
        return None;
    }
    Some(buf)
}

/// Read a framed message from a stream (after the tag byte has been consumed).
async fn read_framed(stream: &mut quinn::RecvStream, tx: &RouterSenders) -> Option<ChorusMessage> {
    let buf = read_length_prefixed(stream, tx, "framed").await?;
    match decode_message(&buf) {
        Ok((_, msg)) => Some(msg),
        Err(e) => {
            tracing::warn!(rank = tx.rank, "router: framed decode failed: {e}");
            None
        }
    }
}
