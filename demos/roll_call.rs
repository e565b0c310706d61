//! Group roll call: rank exchange, barrier-fenced printing, all-reduce.
//!
//! Spawns a 4-participant local group. Every rank sends its id to every
//! peer with non-blocking requests, waits on the batch, then prints what
//! it received — with barriers between prints so output never interleaves.
//! Finally all ranks reduce their ids and print the identical sum.
//!
//! ```bash
//! cargo run --example roll_call
//! ```

use chorus::{
    AddrSpace, BufferDesc, Communicator, CpuAdapter, DataType, ExecutionContext, ReduceOp,
    wait_all,
};
use std::sync::Arc;

const WORLD: u32 = 4;

#[tokio::main]
async fn main() -> chorus::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let adapter = Arc::new(CpuAdapter::new());
    let comms: Vec<Arc<Communicator>> = Communicator::bootstrap_local(WORLD, adapter)
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();

    let mut tasks = Vec::new();
    for comm in comms {
        tasks.push(tokio::spawn(roll_call(comm)));
    }
    for t in tasks {
        t.await.expect("participant task panicked")?;
    }

    Ok(())
}

async fn roll_call(comm: Arc<Communicator>) -> chorus::Result<()> {
    let rank = comm.rank();
    let world = comm.size();

    // Post receives first, then sends, and wait on the whole batch.
    let own = vec![rank as i32];
    let mut received: Vec<i32> = vec![-1; (world - 1) as usize];
    let base = received.as_mut_ptr() as u64;

    let mut ops = Vec::new();
    for (slot, r) in (0..world).filter(|&r| r != rank).enumerate() {
        let desc =
            unsafe { BufferDesc::new(base + (slot * 4) as u64, 1, DataType::I32, AddrSpace::Host) };
        ops.push(unsafe { comm.irecv(desc, r, 0) });
    }
    for r in (0..world).filter(|&r| r != rank) {
        ops.push(unsafe { comm.isend(BufferDesc::from_i32_slice(&own), r, 0) });
    }
    wait_all(ops).await?;

    if rank == 0 {
        println!("There are {world} ranks:");
    }
    comm.barrier().await?;

    // One rank prints per barrier occurrence, so lines never interleave.
    for r in 0..world {
        if r == rank {
            println!("Rank {r} received: {received:?}");
        }
        comm.barrier().await?;
    }

    // Reduce every rank's id; each rank receives the identical sum.
    let src = vec![rank as i32];
    let mut sum = vec![0i32];
    unsafe {
        comm.all_reduce(
            &BufferDesc::from_i32_slice(&src),
            &BufferDesc::from_i32_slice_mut(&mut sum),
            ReduceOp::Sum,
            &ExecutionContext::host(),
        )
        .await?;
    }

    if rank == 0 {
        println!("Sum of all ranks is:");
    }
    comm.barrier().await?;
    for r in 0..world {
        if r == rank {
            println!("For rank {r}: {}", sum[0]);
        }
        comm.barrier().await?;
    }

    Ok(())
}
