use crate::device::ExecutionContext;
use crate::error::Result;
use crate::memory::BufferDesc;
use crate::types::{DataType, ReduceOp};

/// Bridges buffer memory with the network transport.
///
/// The communicator operates on [`BufferDesc`] descriptors. The adapter
/// handles staging data between the described memory and host byte buffers
/// for network I/O, dispatching on the descriptor's address-space tag.
///
/// - `CpuAdapter` (built-in): direct pointer access for host-space buffers;
///   rejects device-space descriptors.
/// - GPU adapters: device-to-host / host-to-device copies enqueued on the
///   context's stream (implemented externally).
///
/// For inter-node communication, device→host→network→host→device staging
/// is unavoidable: the transport reads from host memory, not device memory.
pub trait DeviceAdapter: Send + Sync {
    /// Copy the buffer's contents into a host byte vector for network send.
    ///
    /// Device-space buffers copy on the context's stream. The returned
    /// bytes are stable host memory regardless of source space.
    ///
    /// # Safety
    /// The descriptor must point to valid memory for its full byte length,
    /// and no other party may write it until this call returns.
    unsafe fn stage_for_send(&self, buf: &BufferDesc, ctx: &ExecutionContext) -> Result<Vec<u8>>;

    /// Copy received host bytes into the buffer's memory.
    ///
    /// Device-space buffers copy on the context's stream; whether the copy
    /// has retired when this returns is governed by the context's ordering
    /// policy (the collective layer calls [`DeviceAdapter::synchronize`]
    /// for `Exclusive` contexts).
    ///
    /// # Safety
    /// The descriptor must point to valid memory for at least `data.len()`
    /// bytes.
    unsafe fn receive_to_buffer(
        &self,
        data: &[u8],
        buf: &BufferDesc,
        ctx: &ExecutionContext,
    ) -> Result<()>;

    /// Block until all work previously enqueued on the context's stream has
    /// retired. A no-op for adapters without asynchronous streams.
    fn synchronize(&self, ctx: &ExecutionContext) -> Result<()>;

    /// In-place reduce: `dst[i] = op(dst[i], src[i])` for each element.
    ///
    /// Used by collective algorithms for local combination steps on staged
    /// host bytes.
    ///
    /// # Safety
    /// `dst_ptr` must be a valid host pointer to at least
    /// `count * dtype.size_in_bytes()` bytes.
    unsafe fn reduce_inplace(
        &self,
        dst_ptr: u64,
        src: &[u8],
        count: usize,
        dtype: DataType,
        op: ReduceOp,
    ) -> Result<()>;
}
