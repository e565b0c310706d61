use crate::comm::Communicator;
use crate::config::ChorusConfig;
use crate::device::DeviceAdapter;
use crate::error::{ChorusError, Result};
use crate::group::{SeedNode, WorkerNode};
use crate::transport::PeerConnection;
use crate::transport::tls::make_client_config;
use crate::types::Rank;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

impl Communicator {
    /// Bootstrap a group: start a seed node and connect participants.
    ///
    /// This is a convenience for tests and simple deployments where all
    /// participants run in the same process (each as a tokio task). The
    /// seed assigns ranks, then every pair of participants is connected
    /// into a full QUIC mesh.
    pub async fn bootstrap_local(
        size: u32,
        adapter: Arc<dyn DeviceAdapter>,
    ) -> Result<Vec<Communicator>> {
        Self::bootstrap_local_with_config(size, adapter, Arc::new(ChorusConfig::from_env())).await
    }

    /// Bootstrap a local group with an explicit configuration.
    pub async fn bootstrap_local_with_config(
        size: u32,
        adapter: Arc<dyn DeviceAdapter>,
        config: Arc<ChorusConfig>,
    ) -> Result<Vec<Communicator>> {
        let seed_addr: SocketAddr = "127.0.0.1:0".parse().expect("hardcoded socket addr");
        let seed = SeedNode::bind(seed_addr, size)?.with_formation_timeout(config.formation_timeout);
        let seed_addr = seed.local_addr();

        // Spawn the seed.
        let seed_handle = tokio::spawn(async move { seed.form_group().await });

        // Spawn workers and collect their results.
        let mut worker_handles = Vec::new();
        for _ in 0..size {
            worker_handles.push(tokio::spawn(WorkerNode::connect(seed_addr)));
        }

        let (_roster, _seed_conns) = seed_handle
            .await
            .map_err(|e| ChorusError::transport_with_source("seed task panicked", e))??;

        let mut workers: Vec<WorkerNode> = Vec::new();
        for h in worker_handles {
            workers.push(
                h.await
                    .map_err(|e| ChorusError::transport_with_source("worker task panicked", e))??,
            );
        }

        build_mesh(workers, adapter, config).await
    }
}

/// Establish a full mesh of peer connections between participants.
///
/// All (i, j) pairs are connected concurrently via
/// `futures::future::try_join_all`, reducing wall-clock time from O(N²)
/// sequential handshakes to the slowest single pair.
async fn build_mesh(
    workers: Vec<WorkerNode>,
    adapter: Arc<dyn DeviceAdapter>,
    config: Arc<ChorusConfig>,
) -> Result<Vec<Communicator>> {
    let n = workers.len();
    if n == 1 {
        // Single participant: no peers needed.
        let w = workers
            .into_iter()
            .next()
            .expect("workers vec confirmed non-empty by n==1 check");
        return Ok(vec![Communicator::new(
            w.rank,
            w.size,
            HashMap::new(),
            adapter,
            config,
        )]);
    }

    // Bind a mesh listener for each participant on a random port.
    let mut listeners = Vec::new();
    let mut listen_addrs = Vec::new();
    for _ in &workers {
        let listener = crate::transport::TransportListener::bind(
            "127.0.0.1:0".parse().expect("hardcoded socket addr"),
        )?;
        listen_addrs.push(listener.local_addr());
        listeners.push(Arc::new(listener));
    }

    // Connect all (i, j) pairs concurrently.
    let mut pair_futures = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let rank_i = workers[i].rank;
            let rank_j = workers[j].rank;
            let addr_j = listen_addrs[j];
            let listener_j = Arc::clone(&listeners[j]);

            pair_futures.push(tokio::spawn(async move {
                let client_config = make_client_config()?;
                let mut endpoint =
                    quinn::Endpoint::client("0.0.0.0:0".parse().expect("hardcoded socket addr"))
                        .map_err(|e| ChorusError::transport_with_source("mesh client", e))?;
                endpoint.set_default_client_config(client_config);

                let accept_fut = listener_j.accept();
                let connect_fut = endpoint.connect(addr_j, "localhost");

                let connecting = connect_fut
                    .map_err(|e| ChorusError::transport_with_source("mesh connect", e))?;

                let (accepted, connected) = tokio::try_join!(accept_fut, async {
                    connecting
                        .await
                        .map_err(|e| ChorusError::transport_with_source("mesh handshake", e))
                })?;

                let conn_ij = PeerConnection::new(rank_j, connected);
                let conn_ji = PeerConnection::new(rank_i, accepted);

                Ok::<_, ChorusError>((i, j, rank_i, rank_j, conn_ij, conn_ji))
            }));
        }
    }

    let mut all_peers: Vec<HashMap<Rank, PeerConnection>> =
        (0..n).map(|_| HashMap::new()).collect();

    let pair_results = futures::future::try_join_all(pair_futures)
        .await
        .map_err(|e| ChorusError::transport_with_source("mesh task panicked", e))?;
    for result in pair_results {
        let (i, j, rank_i, rank_j, conn_ij, conn_ji) = result?;
        all_peers[i].insert(rank_j, conn_ij);
        all_peers[j].insert(rank_i, conn_ji);
    }

    let mut comms = Vec::new();
    for (idx, peers) in all_peers.into_iter().enumerate() {
        comms.push(Communicator::new(
            workers[idx].rank,
            workers[idx].size,
            peers,
            Arc::clone(&adapter),
            Arc::clone(&config),
        ));
    }

    // Return in rank order.
    comms.sort_by_key(|c| c.rank());

    Ok(comms)
}
