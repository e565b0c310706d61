use crate::comm::Communicator;
use crate::error::{ChorusError, Result};
use crate::protocol::ChorusMessage;
use crate::types::Priority;

/// Barrier: blocks until all ranks reach this occurrence.
///
/// Dispatches by group size against the configured threshold:
/// - `two_phase_barrier` for small groups (lower constant overhead)
/// - `dissemination_barrier` for larger groups (O(log N) rounds, no
///   coordinator)
///
/// Occurrences are numbered by the communicator's epoch counter; every
/// rank must call its barriers in the same relative order, or epochs
/// diverge and the mismatch is reported as `CollectiveFailed`.
pub(crate) async fn barrier(comm: &Communicator) -> Result<()> {
    let world = comm.size();
    if world <= 1 {
        // A lone participant has no one to wait for. The occurrence still
        // counts, so epoch numbering matches larger groups.
        comm.next_barrier_epoch();
        return Ok(());
    }

    if world < comm.config().dissemination_threshold {
        two_phase_barrier(comm).await
    } else {
        dissemination_barrier(comm).await
    }
}

/// Two-phase barrier: all ranks send to rank 0, rank 0 broadcasts the ack.
///
/// Phase 1: every rank (except 0) sends `Barrier { epoch }` to rank 0.
/// Phase 2: rank 0 waits for all, then sends `BarrierAck { epoch }` to all.
///
/// Efficient for small groups; the O(N) gather and scatter at rank 0
/// becomes a bottleneck as the group grows.
async fn two_phase_barrier(comm: &Communicator) -> Result<()> {
    let epoch = comm.next_barrier_epoch();
    let rank = comm.rank();
    let world = comm.size();

    if rank == 0 {
        // Rank 0: collect arrivals from all other ranks.
        for r in 1..world {
            comm.recv_barrier(r, epoch).await?;
        }

        // Broadcast the ack.
        let ack = ChorusMessage::BarrierAck { epoch };
        for r in 1..world {
            comm.peer(r)?
                .send_message(&ack, Priority::Critical)
                .await
                .map_err(|e| ChorusError::CollectiveFailed {
                    operation: "barrier",
                    rank: r,
                    reason: e.to_string(),
                })?;
        }
    } else {
        // Non-zero rank: announce arrival to rank 0, wait for the ack.
        let arrival = ChorusMessage::Barrier { epoch };
        comm.peer(0)?
            .send_message(&arrival, Priority::Critical)
            .await
            .map_err(|e| ChorusError::CollectiveFailed {
                operation: "barrier",
                rank: 0,
                reason: e.to_string(),
            })?;

        let ack = comm
            .recv_control(0)
            .await
            .map_err(|e| ChorusError::CollectiveFailed {
                operation: "barrier",
                rank: 0,
                reason: e.to_string(),
            })?;

        match ack {
            ChorusMessage::BarrierAck { epoch: e } if e == epoch => {}
            other => {
                return Err(ChorusError::CollectiveFailed {
                    operation: "barrier",
                    rank: 0,
                    reason: format!("expected BarrierAck(epoch={epoch}), got {other:?}"),
                });
            }
        }
    }

    Ok(())
}

/// Dissemination barrier: O(log N) rounds, no single coordinator.
///
/// In round r, rank i sends to rank `(i + 2^r) % N` and receives from
/// rank `(i - 2^r + N) % N`. After `ceil(log2(N))` rounds, every rank has
/// transitively heard from every other rank.
async fn dissemination_barrier(comm: &Communicator) -> Result<()> {
    let epoch = comm.next_barrier_epoch();
    let rank = comm.rank();
    let world = comm.size();

    // Number of rounds: ceil(log2(world))
    let num_rounds = u32::BITS - (world - 1).leading_zeros();

    for round in 0..num_rounds {
        let distance = 1u32 << round;
        let send_to = (rank + distance) % world;
        let recv_from = (rank + world - distance) % world;

        let msg = ChorusMessage::Barrier { epoch };

        let send_fut = async {
            comm.peer(send_to)?
                .send_message(&msg, Priority::Critical)
                .await
                .map_err(|e| ChorusError::CollectiveFailed {
                    operation: "barrier",
                    rank: send_to,
                    reason: e.to_string(),
                })
        };

        let recv_fut = comm.recv_barrier(recv_from, epoch);

        let (send_result, recv_result) = tokio::join!(send_fut, recv_fut);
        send_result?;
        recv_result?;
    }

    Ok(())
}
