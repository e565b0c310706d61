use chorus::{AddrSpace, BufferDesc, DataType, wait_all};

use super::helpers::run_group;

/// Every rank sends its own rank id to every peer and receives from every
/// peer. After `wait_all`, the received multiset must be exactly
/// `{0..N} \ {r}` — order unspecified, contents exact.
#[tokio::test]
async fn test_pairwise_rank_exchange_3_nodes() {
    run_group(3, |comm| async move {
        let rank = comm.rank();
        let world = comm.size();

        let own = vec![rank as i32];
        let mut received: Vec<i32> = vec![-1; (world - 1) as usize];
        let base = received.as_mut_ptr() as u64;

        let mut ops = Vec::new();
        for (slot, r) in (0..world).filter(|&r| r != rank).enumerate() {
            let desc = unsafe {
                BufferDesc::new(base + (slot * 4) as u64, 1, DataType::I32, AddrSpace::Host)
            };
            ops.push(unsafe { comm.irecv(desc, r, 0) });
        }
        for r in (0..world).filter(|&r| r != rank) {
            ops.push(unsafe { comm.isend(BufferDesc::from_i32_slice(&own), r, 0) });
        }

        wait_all(ops).await.unwrap();

        let mut got = received.clone();
        got.sort();
        let expected: Vec<i32> = (0..world as i32).filter(|&r| r != rank as i32).collect();
        assert_eq!(got, expected, "rank {rank} received wrong peer set");
    })
    .await;
}

#[tokio::test]
async fn test_pairwise_rank_exchange_5_nodes() {
    run_group(5, |comm| async move {
        let rank = comm.rank();
        let world = comm.size();

        let own = vec![rank as i32];
        let mut received: Vec<i32> = vec![-1; (world - 1) as usize];
        let base = received.as_mut_ptr() as u64;

        let mut ops = Vec::new();
        for (slot, r) in (0..world).filter(|&r| r != rank).enumerate() {
            let desc = unsafe {
                BufferDesc::new(base + (slot * 4) as u64, 1, DataType::I32, AddrSpace::Host)
            };
            ops.push(unsafe { comm.irecv(desc, r, 7) });
        }
        for r in (0..world).filter(|&r| r != rank) {
            ops.push(unsafe { comm.isend(BufferDesc::from_i32_slice(&own), r, 7) });
        }

        wait_all(ops).await.unwrap();

        let mut got = received.clone();
        got.sort();
        let expected: Vec<i32> = (0..world as i32).filter(|&r| r != rank as i32).collect();
        assert_eq!(got, expected, "rank {rank} received wrong peer set");
    })
    .await;
}

/// Distinct tags are independent lanes: receives posted in the opposite
/// order of the sends still pair by tag.
#[tokio::test]
async fn test_tag_pairing_2_nodes() {
    run_group(2, |comm| async move {
        let rank = comm.rank();

        if rank == 0 {
            let a = vec![11i32];
            let b = vec![22i32];
            let ops = vec![
                unsafe { comm.isend(BufferDesc::from_i32_slice(&a), 1, 100) },
                unsafe { comm.isend(BufferDesc::from_i32_slice(&b), 1, 200) },
            ];
            wait_all(ops).await.unwrap();
        } else {
            let mut a = vec![0i32];
            let mut b = vec![0i32];
            let ops = vec![
                unsafe { comm.irecv(BufferDesc::from_i32_slice_mut(&mut b), 0, 200) },
                unsafe { comm.irecv(BufferDesc::from_i32_slice_mut(&mut a), 0, 100) },
            ];
            wait_all(ops).await.unwrap();
            assert_eq!(a, vec![11]);
            assert_eq!(b, vec![22]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_blocking_send_recv_roundtrip() {
    run_group(2, |comm| async move {
        let rank = comm.rank();
        if rank == 0 {
            let data: Vec<f64> = vec![1.5, 2.5, 3.5];
            unsafe {
                comm.send(&BufferDesc::from_f64_slice(&data), 1, 9)
                    .await
                    .unwrap();
            }
        } else {
            let mut data: Vec<f64> = vec![0.0; 3];
            unsafe {
                comm.recv(&BufferDesc::from_f64_slice_mut(&mut data), 0, 9)
                    .await
                    .unwrap();
            }
            assert_eq!(data, vec![1.5, 2.5, 3.5]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_send_to_out_of_range_rank_fails() {
    run_group(2, |comm| async move {
        let data = vec![0i32];
        let err = unsafe {
            comm.send(&BufferDesc::from_i32_slice(&data), 7, 0)
                .await
                .unwrap_err()
        };
        assert!(matches!(err, chorus::ChorusError::InvalidRank { .. }));
    })
    .await;
}

#[tokio::test]
async fn test_send_to_self_fails() {
    run_group(2, |comm| async move {
        let rank = comm.rank();
        let data = vec![0i32];
        let err = unsafe {
            comm.send(&BufferDesc::from_i32_slice(&data), rank, 0)
                .await
                .unwrap_err()
        };
        assert!(matches!(err, chorus::ChorusError::UnknownPeer { .. }));
    })
    .await;
}

/// A size-mismatched receive surfaces as an error, not a silent truncation.
#[tokio::test]
async fn test_size_mismatch_reported() {
    run_group(2, |comm| async move {
        let rank = comm.rank();
        if rank == 0 {
            let data: Vec<i32> = vec![1, 2, 3, 4];
            unsafe {
                comm.send(&BufferDesc::from_i32_slice(&data), 1, 3)
                    .await
                    .unwrap();
            }
        } else {
            let mut short: Vec<i32> = vec![0; 2];
            let err = unsafe {
                comm.recv(&BufferDesc::from_i32_slice_mut(&mut short), 0, 3)
                    .await
                    .unwrap_err()
            };
            assert!(matches!(
                err,
                chorus::ChorusError::BufferSizeMismatch { .. }
            ));
        }
    })
    .await;
}
