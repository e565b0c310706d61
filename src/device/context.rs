//! Execution contexts for device-ordered operations.

/// Whether a collective may share its stream with other device work.
///
/// The communicator does not guess: the caller states the policy per
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamOrdering {
    /// The collective owns the stream for its duration: its device-side
    /// copies are followed by a stream synchronization before the call
    /// returns, so the destination is host-visible immediately after.
    #[default]
    Exclusive,
    /// The collective only enqueues its copies on the stream. Other work
    /// may be interleaved; the caller synchronizes the stream before
    /// reading the destination from host code.
    Concurrent,
}

/// An ordered command stream for device-addressable memory operations.
///
/// Wraps an opaque stream handle (`0` = the adapter's default stream)
/// supplied by the caller's device runtime. Host-space buffers ignore the
/// context entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExecutionContext {
    stream: u64,
    ordering: StreamOrdering,
}

impl ExecutionContext {
    /// Context for a specific device stream.
    pub fn new(stream: u64, ordering: StreamOrdering) -> Self {
        Self { stream, ordering }
    }

    /// Context for purely host-resident operations. Carries the default
    /// stream and exclusive ordering, neither of which the host path reads.
    pub fn host() -> Self {
        Self::default()
    }

    /// The raw stream handle.
    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// The sharing policy for this context.
    pub fn ordering(&self) -> StreamOrdering {
        self.ordering
    }
}
