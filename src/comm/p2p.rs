use crate::comm::request::PendingOp;
use crate::device::ExecutionContext;
use crate::error::{ChorusError, Result};
use crate::memory::{AddrSpace, BufferDesc};
use crate::types::{Rank, Tag};
use std::sync::Arc;

use super::Communicator;

impl Communicator {
    /// Send a buffer to a specific rank, blocking until the payload has
    /// been handed to the transport.
    ///
    /// # Safety
    /// The descriptor must point to valid memory for its full byte length,
    /// unmodified for the duration of the call.
    pub async unsafe fn send(&self, buf: &BufferDesc, dest: Rank, tag: Tag) -> Result<()> {
        self.check_peer_rank(dest)?;

        let ctx = ExecutionContext::host();
        let data = unsafe { self.adapter.stage_for_send(buf, &ctx)? };
        self.send_payload(dest, tag, data).await
    }

    /// Receive a buffer from a specific rank, blocking until a matching
    /// payload has arrived and been written into the buffer.
    ///
    /// # Safety
    /// The descriptor must point to valid memory for its full byte length,
    /// untouched by other parties for the duration of the call.
    pub async unsafe fn recv(&self, buf: &BufferDesc, src: Rank, tag: Tag) -> Result<()> {
        self.check_peer_rank(src)?;

        let payload = self.recv_payload(src, tag).await?;
        if payload.len() != buf.len_bytes() {
            return Err(ChorusError::BufferSizeMismatch {
                expected: buf.len_bytes(),
                actual: payload.len(),
            });
        }

        let ctx = ExecutionContext::host();
        unsafe { self.adapter.receive_to_buffer(&payload, buf, &ctx)? };
        if buf.space() == AddrSpace::Device {
            // Point-to-point completion means the buffer is safe to read;
            // drain the staging copy before reporting done.
            self.adapter.synchronize(&ctx)?;
        }
        Ok(())
    }

    /// Schedule a non-blocking send. Returns immediately with an owned
    /// request handle; the transfer runs in the background.
    ///
    /// # Safety
    /// The descriptor must remain valid and unmodified until the returned
    /// handle has been waited on.
    pub unsafe fn isend(self: &Arc<Self>, buf: BufferDesc, dest: Rank, tag: Tag) -> PendingOp {
        let comm = Arc::clone(self);
        PendingOp::spawn(async move { unsafe { comm.send(&buf, dest, tag).await } })
    }

    /// Schedule a non-blocking receive. Returns immediately with an owned
    /// request handle; the buffer is filled in the background.
    ///
    /// # Safety
    /// The descriptor must remain valid, and must not be read, until the
    /// returned handle has been waited on.
    pub unsafe fn irecv(self: &Arc<Self>, buf: BufferDesc, src: Rank, tag: Tag) -> PendingOp {
        let comm = Arc::clone(self);
        PendingOp::spawn(async move { unsafe { comm.recv(&buf, src, tag).await } })
    }
}
