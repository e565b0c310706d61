use crate::comm::Communicator;
use crate::error::{ChorusError, Result};
use crate::transport::buffer_pool::PooledBuf;
use crate::types::Rank;

/// How a buffer of `count` elements is split into one chunk per rank.
///
/// The first `count % world` chunks get one extra element, so chunk sizes
/// differ by at most one and every rank computes the same layout.
pub(crate) struct ChunkLayout {
    pub offsets: Vec<usize>,
    counts: Vec<usize>,
}

impl ChunkLayout {
    pub fn new(count: usize, world: usize) -> Self {
        let base = count / world;
        let extra = count % world;
        let mut offsets = Vec::with_capacity(world);
        let mut counts = Vec::with_capacity(world);
        let mut off = 0;
        for i in 0..world {
            let c = base + usize::from(i < extra);
            offsets.push(off);
            counts.push(c);
            off += c;
        }
        Self { offsets, counts }
    }

    pub fn chunk_count(&self, idx: usize) -> usize {
        self.counts[idx]
    }
}

/// Send bytes to a peer, wrapping transport errors as `CollectiveFailed`.
///
/// No timeout is imposed: a peer that never arrives stalls the collective,
/// and supervision is an external concern.
pub(crate) async fn collective_send(
    comm: &Communicator,
    dest: Rank,
    data: &[u8],
    operation: &'static str,
) -> Result<()> {
    comm.send_bytes(dest, data)
        .await
        .map_err(|e| ChorusError::CollectiveFailed {
            operation,
            rank: dest,
            reason: e.to_string(),
        })
}

/// Receive bytes from a peer, wrapping transport errors as `CollectiveFailed`.
pub(crate) async fn collective_recv(
    comm: &Communicator,
    src: Rank,
    operation: &'static str,
) -> Result<PooledBuf> {
    comm.recv_bytes(src)
        .await
        .map_err(|e| ChorusError::CollectiveFailed {
            operation,
            rank: src,
            reason: e.to_string(),
        })
}
