use chorus::{Communicator, CpuAdapter};
use std::sync::Arc;

/// Helper: run an operation across N communicators concurrently.
/// Keeps all communicators alive until every task completes.
pub async fn run_group<F, Fut>(size: u32, f: F)
where
    F: Fn(Arc<Communicator>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(size, adapter).await.unwrap();
    let comms: Vec<Arc<Communicator>> = comms.into_iter().map(Arc::new).collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for c in &comms {
        let c = Arc::clone(c);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(c).await }));
    }
    for h in handles {
        h.await.unwrap();
    }
    // `comms` dropped here — all tasks already complete.
}
