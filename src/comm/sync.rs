use crate::comm::request::{PendingOp, wait_all};
use crate::device::{DeviceAdapter, ExecutionContext};
use crate::error::Result;
use crate::memory::BufferDesc;
use crate::types::{Rank, ReduceOp, Tag};
use std::sync::Arc;

use super::Communicator;

/// Blocking wrapper around [`Communicator`].
///
/// Owns a `tokio::runtime::Runtime` and calls `block_on()` for each
/// operation, giving the one-blocking-call-per-thread usage model: each
/// participant runs on its own OS thread and blocks in `wait_all`,
/// `barrier`, or `all_reduce` while its transport makes progress on the
/// runtime's workers.
pub struct SyncCommunicator {
    inner: Arc<Communicator>,
    rt: tokio::runtime::Runtime,
}

impl SyncCommunicator {
    /// Bootstrap a local group and return a blocking communicator per rank.
    pub fn bootstrap_local(size: u32, adapter: Arc<dyn DeviceAdapter>) -> Result<Vec<Self>> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| crate::error::ChorusError::transport(format!("tokio runtime: {e}")))?;

        let comms = rt.block_on(Communicator::bootstrap_local(size, adapter))?;

        // Each SyncCommunicator needs its own runtime since `block_on` is
        // exclusive. The first keeps the bootstrap runtime, the rest get
        // fresh ones.
        let mut sync_comms = Vec::new();
        let mut iter = comms.into_iter();

        if let Some(first) = iter.next() {
            sync_comms.push(SyncCommunicator {
                inner: Arc::new(first),
                rt,
            });
        }

        for comm in iter {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| crate::error::ChorusError::transport(format!("tokio runtime: {e}")))?;
            sync_comms.push(SyncCommunicator {
                inner: Arc::new(comm),
                rt,
            });
        }

        Ok(sync_comms)
    }

    /// Wrap an existing async communicator with a new tokio runtime.
    pub fn from_async(inner: Communicator) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| crate::error::ChorusError::transport(format!("tokio runtime: {e}")))?;
        Ok(Self {
            inner: Arc::new(inner),
            rt,
        })
    }

    /// This participant's rank within the group (0-indexed).
    pub fn rank(&self) -> Rank {
        self.inner.rank()
    }

    /// Total number of participants in the group.
    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    /// Blocking point-to-point send.
    ///
    /// # Safety
    /// The descriptor must point to valid memory for its full byte length.
    pub unsafe fn send(&self, buf: &BufferDesc, dest: Rank, tag: Tag) -> Result<()> {
        self.rt.block_on(unsafe { self.inner.send(buf, dest, tag) })
    }

    /// Blocking point-to-point receive.
    ///
    /// # Safety
    /// The descriptor must point to valid memory for its full byte length.
    pub unsafe fn recv(&self, buf: &BufferDesc, src: Rank, tag: Tag) -> Result<()> {
        self.rt.block_on(unsafe { self.inner.recv(buf, src, tag) })
    }

    /// Schedule a non-blocking send.
    ///
    /// # Safety
    /// The descriptor must remain valid and unmodified until the returned
    /// handle has been passed to [`SyncCommunicator::wait_all`].
    pub unsafe fn isend(&self, buf: BufferDesc, dest: Rank, tag: Tag) -> PendingOp {
        let _guard = self.rt.enter();
        unsafe { self.inner.isend(buf, dest, tag) }
    }

    /// Schedule a non-blocking receive.
    ///
    /// # Safety
    /// The descriptor must remain valid, and must not be read, until the
    /// returned handle has been passed to [`SyncCommunicator::wait_all`].
    pub unsafe fn irecv(&self, buf: BufferDesc, src: Rank, tag: Tag) -> PendingOp {
        let _guard = self.rt.enter();
        unsafe { self.inner.irecv(buf, src, tag) }
    }

    /// Block until every operation in the batch has completed.
    pub fn wait_all(&self, ops: Vec<PendingOp>) -> Result<()> {
        self.rt.block_on(wait_all(ops))
    }

    /// Barrier.
    pub fn barrier(&self) -> Result<()> {
        self.rt.block_on(self.inner.barrier())
    }

    /// All-reduce.
    ///
    /// # Safety
    /// Both descriptors must point to valid memory for their full byte
    /// length, untouched by other parties until the call returns.
    pub unsafe fn all_reduce(
        &self,
        src: &BufferDesc,
        dst: &BufferDesc,
        op: ReduceOp,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        self.rt
            .block_on(unsafe { self.inner.all_reduce(src, dst, op, ctx) })
    }
}
