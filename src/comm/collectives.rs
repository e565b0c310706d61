use crate::device::ExecutionContext;
use crate::error::Result;
use crate::memory::BufferDesc;
use crate::types::ReduceOp;

use super::Communicator;

impl Communicator {
    /// Block until every participant in the group has called `barrier()`
    /// for this occurrence.
    ///
    /// Collective-call ordering contract: the Nth barrier call on every
    /// rank corresponds to the same synchronization point. Ranks must not
    /// skip or duplicate occurrences relative to one another.
    pub async fn barrier(&self) -> Result<()> {
        crate::collective::barrier(self).await
    }

    /// All-reduce: combine every rank's `src` element-wise with `op` and
    /// write the identical result into every rank's `dst`.
    ///
    /// `src` and `dst` may alias. Must be called by every rank in the same
    /// relative order as other collectives.
    ///
    /// # Safety
    /// Both descriptors must point to valid memory for their full byte
    /// length, untouched by other parties until the call returns (and, for
    /// a `Concurrent` context, until the caller synchronizes the stream).
    pub async unsafe fn all_reduce(
        &self,
        src: &BufferDesc,
        dst: &BufferDesc,
        op: ReduceOp,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        unsafe { crate::collective::ring_allreduce(self, src, dst, op, ctx).await }
    }
}
