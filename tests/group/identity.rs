use chorus::{Communicator, CpuAdapter};
use std::sync::Arc;

#[tokio::test]
async fn test_ranks_unique_and_size_agrees() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(4, adapter).await.unwrap();

    let mut ranks: Vec<u32> = comms.iter().map(|c| c.rank()).collect();
    ranks.sort();
    assert_eq!(ranks, vec![0, 1, 2, 3]);

    for c in &comms {
        assert_eq!(c.size(), 4);
        assert!(c.rank() < c.size());
    }
}

#[tokio::test]
async fn test_single_participant_group() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();
    assert_eq!(comms.len(), 1);
    assert_eq!(comms[0].rank(), 0);
    assert_eq!(comms[0].size(), 1);
}

#[tokio::test]
async fn test_rank_constant_across_queries() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(2, adapter).await.unwrap();
    for c in &comms {
        let r = c.rank();
        let s = c.size();
        for _ in 0..10 {
            assert_eq!(c.rank(), r);
            assert_eq!(c.size(), s);
        }
    }
}
