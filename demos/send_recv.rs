//! Point-to-point send/recv between two ranks.
//!
//! Spawns a 2-participant local group. Rank 0 sends a float vector to
//! rank 1, which receives it and prints the result.
//!
//! ```bash
//! cargo run --example send_recv
//! ```

use chorus::{BufferDesc, Communicator, CpuAdapter};
use std::sync::Arc;

#[tokio::main]
async fn main() -> chorus::Result<()> {
    let adapter = Arc::new(CpuAdapter::new());
    let comms: Vec<Arc<Communicator>> = Communicator::bootstrap_local(2, adapter)
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();

    let c0 = Arc::clone(&comms[0]);
    let c1 = Arc::clone(&comms[1]);

    // Rank 0 sends, rank 1 receives. Tag 42 matches sender and receiver.
    let send_data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
    let mut recv_buf: Vec<f32> = vec![0.0; 4];

    let send_desc = BufferDesc::from_f32_slice(&send_data);
    let recv_desc = BufferDesc::from_f32_slice_mut(&mut recv_buf);

    // send and recv must run concurrently — send blocks until the stream
    // is written, recv blocks until data arrives.
    let sender = tokio::spawn(async move { unsafe { c0.send(&send_desc, 1, 42).await } });
    let receiver = tokio::spawn(async move { unsafe { c1.recv(&recv_desc, 0, 42).await } });

    sender.await.expect("send task panicked")?;
    receiver.await.expect("recv task panicked")?;

    println!("rank 1 received: {recv_buf:?}");
    // Output: rank 1 received: [1.0, 2.0, 3.0, 4.0]

    Ok(())
}
