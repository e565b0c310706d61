use crossbeam_queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Small pool: 256 buffers × 64 KiB — for framed control messages.
const SMALL_POOL_SIZE: usize = 256;
const SMALL_BUF_CAPACITY: usize = 64 * 1024;

/// Large pool: 32 buffers × 8 MiB — for collective round payloads.
const LARGE_POOL_SIZE: usize = 32;
const LARGE_BUF_CAPACITY: usize = 8 * 1024 * 1024;

/// A tiered lock-free buffer pool with small and large tiers.
///
/// - **Small tier** (64 KiB): framed control messages and small payloads.
/// - **Large tier** (8 MiB): collective rounds and bulk payloads.
/// - **Above the large tier**: allocated fresh and dropped on return (rare).
///
/// Checkout picks the tier by requested size. Buffers that have grown
/// beyond 4× their tier's capacity are dropped instead of returned.
pub struct BufferPool {
    small: ArrayQueue<Vec<u8>>,
    large: ArrayQueue<Vec<u8>>,
}

impl BufferPool {
    /// Create a new tiered pool with default settings.
    pub fn new() -> Arc<Self> {
        let small = ArrayQueue::new(SMALL_POOL_SIZE);
        for _ in 0..SMALL_POOL_SIZE {
            let _ = small.push(Vec::with_capacity(SMALL_BUF_CAPACITY));
        }

        let large = ArrayQueue::new(LARGE_POOL_SIZE);
        for _ in 0..LARGE_POOL_SIZE {
            let _ = large.push(Vec::with_capacity(LARGE_BUF_CAPACITY));
        }

        Arc::new(Self { small, large })
    }

    /// Create a pool with custom sizes (primarily for testing).
    pub fn with_config(small_pool_size: usize, small_buf_cap: usize) -> Arc<Self> {
        let small = ArrayQueue::new(small_pool_size);
        for _ in 0..small_pool_size {
            let _ = small.push(Vec::with_capacity(small_buf_cap));
        }

        let large = ArrayQueue::new(4);
        for _ in 0..4 {
            let _ = large.push(Vec::with_capacity(LARGE_BUF_CAPACITY));
        }

        Arc::new(Self { small, large })
    }

    /// Check out a buffer, resized to `len` bytes (zeroed).
    pub fn checkout(self: &Arc<Self>, len: usize) -> PooledBuf {
        let (mut buf, tier) = if len <= SMALL_BUF_CAPACITY {
            let buf = self
                .small
                .pop()
                .unwrap_or_else(|| Vec::with_capacity(SMALL_BUF_CAPACITY));
            (buf, PoolTier::Small)
        } else if len <= LARGE_BUF_CAPACITY {
            let buf = self
                .large
                .pop()
                .unwrap_or_else(|| Vec::with_capacity(LARGE_BUF_CAPACITY));
            (buf, PoolTier::Large)
        } else {
            // Too large for any pool — allocate fresh.
            (Vec::with_capacity(len), PoolTier::Unpooled)
        };

        buf.resize(len, 0);
        PooledBuf {
            buf: Some(buf),
            pool: Arc::clone(self),
            tier,
        }
    }

    /// Return a buffer to the appropriate tier.
    fn return_buf(&self, mut buf: Vec<u8>, tier: PoolTier) {
        match tier {
            PoolTier::Small => {
                if buf.capacity() > SMALL_BUF_CAPACITY * 4 {
                    return;
                }
                buf.clear();
                let _ = self.small.push(buf);
            }
            PoolTier::Large => {
                if buf.capacity() > LARGE_BUF_CAPACITY * 4 {
                    return;
                }
                buf.clear();
                let _ = self.large.push(buf);
            }
            PoolTier::Unpooled => {}
        }
    }
}

/// Which pool tier a buffer belongs to.
#[derive(Debug, Clone, Copy)]
enum PoolTier {
    Small,
    Large,
    Unpooled,
}

/// A buffer checked out from a `BufferPool`. Derefs to `[u8]`.
/// On drop, the underlying `Vec` is cleared and returned to its tier.
pub struct PooledBuf {
    buf: Option<Vec<u8>>,
    pool: Arc<BufferPool>,
    tier: PoolTier,
}

impl Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY invariant: `buf` is `Some` from construction until `Drop`.
        self.buf.as_ref().expect("PooledBuf used after drop")
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut().expect("PooledBuf used after drop")
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.return_buf(buf, self.tier);
        }
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        self
    }
}
