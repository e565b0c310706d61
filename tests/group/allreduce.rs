use chorus::{
    BufferDesc, Communicator, CpuAdapter, DataType, ExecutionContext, ReduceOp, StreamOrdering,
};
use std::sync::Arc;

use super::helpers::run_group;

/// Sum of every rank's id over N ranks is N*(N-1)/2, identical on every rank.
#[tokio::test]
async fn test_allreduce_sum_of_ranks() {
    run_group(4, |comm| async move {
        let rank = comm.rank();
        let src = vec![rank as i32];
        let mut dst = vec![0i32];

        unsafe {
            comm.all_reduce(
                &BufferDesc::from_i32_slice(&src),
                &BufferDesc::from_i32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap();
        }

        assert_eq!(dst, vec![6], "rank {rank} sum-of-ranks failed");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_2_nodes_f32() {
    run_group(2, |comm| async move {
        let rank = comm.rank();
        let val = (rank + 1) as f32;
        let src = vec![val; 4];
        let mut dst = vec![0.0f32; 4];

        unsafe {
            comm.all_reduce(
                &BufferDesc::from_f32_slice(&src),
                &BufferDesc::from_f32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap();
        }

        assert_eq!(dst, vec![3.0f32; 4], "rank {rank} allreduce failed");
    })
    .await;
}

/// In-place: src and dst alias.
#[tokio::test]
async fn test_allreduce_3_nodes_in_place() {
    run_group(3, |comm| async move {
        let rank = comm.rank();
        let val = (rank + 1) as f32;
        let mut data = vec![val; 6];
        let desc = BufferDesc::from_f32_slice_mut(&mut data);

        unsafe {
            comm.all_reduce(&desc, &desc, ReduceOp::Sum, &ExecutionContext::host())
                .await
                .unwrap();
        }

        assert_eq!(data, vec![6.0f32; 6], "rank {rank} in-place allreduce failed");
    })
    .await;
}

/// Element count not divisible by the group size: uneven ring chunks.
#[tokio::test]
async fn test_allreduce_uneven_count() {
    run_group(3, |comm| async move {
        let rank = comm.rank();
        let src: Vec<f32> = (0..7).map(|i| (i as f32) * ((rank + 1) as f32)).collect();
        let mut dst = vec![0.0f32; 7];

        unsafe {
            comm.all_reduce(
                &BufferDesc::from_f32_slice(&src),
                &BufferDesc::from_f32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap();
        }

        let expected: Vec<f32> = (0..7).map(|i| (i as f32) * 6.0).collect();
        assert_eq!(dst, expected, "rank {rank} uneven allreduce failed");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_min_max_prod() {
    run_group(3, |comm| async move {
        let rank = comm.rank();
        let val = (rank + 1) as f64;
        let src = vec![val; 2];

        let mut min = vec![0.0f64; 2];
        let mut max = vec![0.0f64; 2];
        let mut prod = vec![0.0f64; 2];

        let ctx = ExecutionContext::host();
        unsafe {
            comm.all_reduce(
                &BufferDesc::from_f64_slice(&src),
                &BufferDesc::from_f64_slice_mut(&mut min),
                ReduceOp::Min,
                &ctx,
            )
            .await
            .unwrap();
            comm.all_reduce(
                &BufferDesc::from_f64_slice(&src),
                &BufferDesc::from_f64_slice_mut(&mut max),
                ReduceOp::Max,
                &ctx,
            )
            .await
            .unwrap();
            comm.all_reduce(
                &BufferDesc::from_f64_slice(&src),
                &BufferDesc::from_f64_slice_mut(&mut prod),
                ReduceOp::Prod,
                &ctx,
            )
            .await
            .unwrap();
        }

        assert_eq!(min, vec![1.0; 2]);
        assert_eq!(max, vec![3.0; 2]);
        assert_eq!(prod, vec![6.0; 2]);
    })
    .await;
}

/// Repeating the identical collective yields the identical result:
/// no hidden state between calls, fixed combine order.
#[tokio::test]
async fn test_allreduce_repeated_is_deterministic() {
    run_group(3, |comm| async move {
        let rank = comm.rank();
        // Values chosen so float combine order matters if it varied.
        let src: Vec<f32> = (0..5)
            .map(|i| 1.0e-3 + (rank as f32) * 1.0e3 + i as f32)
            .collect();

        let mut first = vec![0.0f32; 5];
        let mut second = vec![0.0f32; 5];

        let ctx = ExecutionContext::host();
        unsafe {
            comm.all_reduce(
                &BufferDesc::from_f32_slice(&src),
                &BufferDesc::from_f32_slice_mut(&mut first),
                ReduceOp::Sum,
                &ctx,
            )
            .await
            .unwrap();
            comm.all_reduce(
                &BufferDesc::from_f32_slice(&src),
                &BufferDesc::from_f32_slice_mut(&mut second),
                ReduceOp::Sum,
                &ctx,
            )
            .await
            .unwrap();
        }

        let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits, "rank {rank} result drifted");
    })
    .await;
}

/// Single participant: the result is the participant's own input.
#[tokio::test]
async fn test_allreduce_single_participant_identity() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();

    let src = vec![5i32, -3, 7];
    let mut dst = vec![0i32; 3];

    unsafe {
        comms[0]
            .all_reduce(
                &BufferDesc::from_i32_slice(&src),
                &BufferDesc::from_i32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap();
    }

    assert_eq!(dst, src);
}

#[tokio::test]
async fn test_allreduce_count_mismatch_rejected() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();

    let src = vec![1i32; 4];
    let mut dst = vec![0i32; 2];

    let err = unsafe {
        comms[0]
            .all_reduce(
                &BufferDesc::from_i32_slice(&src),
                &BufferDesc::from_i32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap_err()
    };
    assert!(matches!(err, chorus::ChorusError::CountMismatch { .. }));
}

#[tokio::test]
async fn test_allreduce_dtype_mismatch_rejected() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();

    let src = vec![1i32; 2];
    let mut dst = vec![0.0f32; 2];

    let err = unsafe {
        comms[0]
            .all_reduce(
                &BufferDesc::from_i32_slice(&src),
                &BufferDesc::from_f32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap_err()
    };
    assert!(matches!(err, chorus::ChorusError::DTypeMismatch { .. }));
}

/// The CPU adapter has no device memory: device-space descriptors are
/// rejected through the adapter seam rather than misread as host pointers.
#[tokio::test]
async fn test_allreduce_device_space_rejected_by_cpu_adapter() {
    let adapter = Arc::new(CpuAdapter::new());
    let comms = Communicator::bootstrap_local(1, adapter).await.unwrap();

    let src = unsafe { BufferDesc::device(0x1000, 2, DataType::I32) };
    let dst = unsafe { BufferDesc::device(0x2000, 2, DataType::I32) };

    let err = unsafe {
        comms[0]
            .all_reduce(
                &src,
                &dst,
                ReduceOp::Sum,
                &ExecutionContext::new(1, StreamOrdering::Exclusive),
            )
            .await
            .unwrap_err()
    };
    assert!(matches!(err, chorus::ChorusError::DeviceError { .. }));
}

/// Empty buffers are a no-op on every rank.
#[tokio::test]
async fn test_allreduce_empty_buffer() {
    run_group(2, |comm| async move {
        let src: Vec<i32> = vec![];
        let mut dst: Vec<i32> = vec![];

        unsafe {
            comm.all_reduce(
                &BufferDesc::from_i32_slice(&src),
                &BufferDesc::from_i32_slice_mut(&mut dst),
                ReduceOp::Sum,
                &ExecutionContext::host(),
            )
            .await
            .unwrap();
        }
    })
    .await;
}
