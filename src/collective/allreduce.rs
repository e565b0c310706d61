use crate::collective::helpers::{ChunkLayout, collective_recv, collective_send};
use crate::comm::Communicator;
use crate::device::{ExecutionContext, StreamOrdering};
use crate::error::{ChorusError, Result};
use crate::memory::{AddrSpace, BufferDesc};
use crate::reduce::reduce_slice;
use crate::types::ReduceOp;

/// Ring all-reduce: every rank contributes `src`; every rank's `dst`
/// receives the element-wise combination. `src` and `dst` may alias.
///
/// Algorithm:
/// 1. Scatter-reduce: N-1 rounds. Each rank sends one chunk to the next
///    rank and receives one chunk from the previous rank, reducing
///    in-place. After this phase each rank owns one fully-reduced chunk.
/// 2. Allgather: N-1 rounds circulating the reduced chunks until every
///    rank holds the full result.
///
/// Each chunk is combined in the same ring order on every rank, so the
/// result is byte-identical group-wide — including for floating point,
/// where combine order matters.
///
/// Device-space buffers are staged through the adapter on the context's
/// stream; with `Exclusive` ordering the stream is synchronized before the
/// call returns, with `Concurrent` the final sync is the caller's.
///
/// # Safety
/// Both descriptors must point to valid memory for their full byte length,
/// untouched by other parties for the duration of the call.
pub(crate) async unsafe fn ring_allreduce(
    comm: &Communicator,
    src: &BufferDesc,
    dst: &BufferDesc,
    op: ReduceOp,
    ctx: &ExecutionContext,
) -> Result<()> {
    if src.count() != dst.count() {
        return Err(ChorusError::CountMismatch {
            src: src.count(),
            dst: dst.count(),
        });
    }
    if src.dtype() != dst.dtype() {
        return Err(ChorusError::DTypeMismatch {
            src: src.dtype(),
            dst: dst.dtype(),
        });
    }
    if src.is_empty() {
        return Ok(());
    }

    let world = comm.size() as usize;
    let rank = comm.rank() as usize;
    let dtype = src.dtype();
    let elem_size = dtype.size_in_bytes();

    // Stage the contribution into host bytes. For aliased src/dst this
    // snapshot also decouples the read side from the write-back.
    let mut buf = unsafe { comm.adapter().stage_for_send(src, ctx)? };

    if world > 1 {
        let count = src.count();
        let layout = ChunkLayout::new(count, world);

        let next = ((rank + 1) % world) as u32;
        let prev = ((rank + world - 1) % world) as u32;

        // Phase 1: Scatter-reduce (N-1 rounds).
        for step in 0..(world - 1) {
            let send_idx = (rank + world - step) % world;
            let send_off = layout.offsets[send_idx] * elem_size;
            let send_len = layout.chunk_count(send_idx) * elem_size;

            let recv_idx = (rank + world - step - 1) % world;
            let recv_off = layout.offsets[recv_idx] * elem_size;
            let recv_count = layout.chunk_count(recv_idx);
            let recv_len = recv_count * elem_size;

            // The send slice is copied out before the join so recv can
            // borrow `buf` mutably. Send and recv touch different chunks.
            let send_snapshot = buf[send_off..send_off + send_len].to_vec();

            let (_, received) = tokio::try_join!(
                collective_send(comm, next, &send_snapshot, "allreduce"),
                collective_recv(comm, prev, "allreduce"),
            )?;

            if received.len() != recv_len {
                return Err(ChorusError::BufferSizeMismatch {
                    expected: recv_len,
                    actual: received.len(),
                });
            }
            let dst_slice = &mut buf[recv_off..recv_off + recv_len];
            reduce_slice(dst_slice, &received, recv_count, dtype, op)?;
        }

        // Phase 2: Allgather (N-1 rounds).
        for step in 0..(world - 1) {
            let send_idx = (rank + world + 1 - step) % world;
            let send_off = layout.offsets[send_idx] * elem_size;
            let send_len = layout.chunk_count(send_idx) * elem_size;

            let recv_idx = (rank + world - step) % world;
            let recv_off = layout.offsets[recv_idx] * elem_size;
            let recv_len = layout.chunk_count(recv_idx) * elem_size;

            let send_snapshot = buf[send_off..send_off + send_len].to_vec();

            let (_, received) = tokio::try_join!(
                collective_send(comm, next, &send_snapshot, "allreduce"),
                collective_recv(comm, prev, "allreduce"),
            )?;

            if received.len() != recv_len {
                return Err(ChorusError::BufferSizeMismatch {
                    expected: recv_len,
                    actual: received.len(),
                });
            }
            buf[recv_off..recv_off + recv_len].copy_from_slice(&received);
        }
    }

    unsafe { comm.adapter().receive_to_buffer(&buf, dst, ctx)? };

    if dst.space() == AddrSpace::Device && ctx.ordering() == StreamOrdering::Exclusive {
        comm.adapter().synchronize(ctx)?;
    }

    Ok(())
}
