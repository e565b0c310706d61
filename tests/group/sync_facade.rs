use chorus::{
    AddrSpace, BufferDesc, CpuAdapter, DataType, ExecutionContext, ReduceOp, SyncCommunicator,
};
use std::sync::Arc;

/// The blocking facade runs the full diagnostic flow — rank exchange via
/// non-blocking requests, barrier fencing, and an all-reduce — with one OS
/// thread per participant.
#[test]
fn test_sync_roll_call_flow() {
    const WORLD: u32 = 3;

    let adapter = Arc::new(CpuAdapter::new());
    let comms = SyncCommunicator::bootstrap_local(WORLD, adapter).unwrap();

    let mut threads = Vec::new();
    for comm in comms {
        threads.push(std::thread::spawn(move || {
            let rank = comm.rank();
            let world = comm.size();
            assert_eq!(world, WORLD);

            // Exchange ranks with every peer.
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
            comm.wait_all(ops).unwrap();

            let mut got = received.clone();
            got.sort();
            let expected: Vec<i32> = (0..world as i32).filter(|&r| r != rank as i32).collect();
            assert_eq!(got, expected);

            // Barrier-fenced section, one occurrence per rank.
            for _ in 0..world {
                comm.barrier().unwrap();
            }

            // Reduce each rank's id; everyone sees the same total.
            let src = vec![rank as i32];
            let mut dst = vec![0i32];
            unsafe {
                comm.all_reduce(
                    &BufferDesc::from_i32_slice(&src),
                    &BufferDesc::from_i32_slice_mut(&mut dst),
                    ReduceOp::Sum,
                    &ExecutionContext::host(),
                )
                .unwrap();
            }
            assert_eq!(dst[0], (WORLD * (WORLD - 1) / 2) as i32);

            comm.barrier().unwrap();
        }));
    }

    for t in threads {
        t.join().unwrap();
    }
}

#[test]
fn test_sync_blocking_send_recv() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = SyncCommunicator::bootstrap_local(2, adapter).unwrap();

    let mut threads = Vec::new();
    for comm in comms {
        threads.push(std::thread::spawn(move || {
            if comm.rank() == 0 {
                let data = vec![42i32, 43];
                unsafe {
                    comm.send(&BufferDesc::from_i32_slice(&data), 1, 5).unwrap();
                }
            } else {
                let mut data = vec![0i32; 2];
                unsafe {
                    comm.recv(&BufferDesc::from_i32_slice_mut(&mut data), 0, 5)
                        .unwrap();
                }
                assert_eq!(data, vec![42, 43]);
            }
        }));
    }

    for t in threads {
        t.join().unwrap();
    }
}
