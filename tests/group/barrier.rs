use chorus::{Communicator, CpuAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::helpers::run_group;

#[tokio::test]
async fn test_barrier_4_nodes_two_phase() {
    run_group(4, |comm| async move {
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_5_nodes_dissemination() {
    run_group(5, |comm| async move {
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_2_nodes_double() {
    run_group(2, |comm| async move {
        comm.barrier().await.unwrap();
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_barrier_single_participant_returns_immediately() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();
    comms[0].barrier().await.unwrap();
    comms[0].barrier().await.unwrap();
}

/// Occurrence alignment: no rank proceeds past occurrence k until every
/// rank has arrived at occurrence k. Each rank bumps its own counter
/// before the barrier; after the barrier, every counter must show at
/// least k+1 arrivals.
#[tokio::test]
async fn test_barrier_occurrence_alignment() {
    const ROUNDS: u64 = 5;
    let world: u32 = 4;

    let counters: Arc<Vec<AtomicU64>> =
        Arc::new((0..world).map(|_| AtomicU64::new(0)).collect());

    let shared = Arc::clone(&counters);
    run_group(world, move |comm| {
        let counters = Arc::clone(&shared);
        async move {
            for k in 0..ROUNDS {
                counters[comm.rank() as usize].fetch_add(1, Ordering::SeqCst);
                comm.barrier().await.unwrap();
                for (r, c) in counters.iter().enumerate() {
                    let seen = c.load(Ordering::SeqCst);
                    assert!(
                        seen >= k + 1,
                        "rank {} passed occurrence {k} but rank {r} only arrived {seen} times",
                        comm.rank()
                    );
                }
            }
        }
    })
    .await;
}

/// Same check across the dissemination algorithm's world-size range.
#[tokio::test]
async fn test_barrier_occurrence_alignment_dissemination() {
    const ROUNDS: u64 = 3;
    let world: u32 = 6;

    let counters: Arc<Vec<AtomicU64>> =
        Arc::new((0..world).map(|_| AtomicU64::new(0)).collect());

    let shared = Arc::clone(&counters);
    run_group(world, move |comm| {
        let counters = Arc::clone(&shared);
        async move {
            for k in 0..ROUNDS {
                counters[comm.rank() as usize].fetch_add(1, Ordering::SeqCst);
                comm.barrier().await.unwrap();
                for c in counters.iter() {
                    assert!(c.load(Ordering::SeqCst) >= k + 1);
                }
            }
        }
    })
    .await;
}
