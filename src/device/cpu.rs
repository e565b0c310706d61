use crate::device::adapter::DeviceAdapter;
use crate::device::ExecutionContext;
use crate::error::{ChorusError, Result};
use crate::memory::{AddrSpace, BufferDesc};
use crate::types::{DataType, ReduceOp};

/// DeviceAdapter for host (CPU) memory. Direct pointer access, no copies
/// beyond the staging buffer itself. Device-space descriptors are rejected:
/// wiring up real device memory means supplying a real adapter.
#[derive(Debug, Clone, Default)]
pub struct CpuAdapter;

impl CpuAdapter {
    pub fn new() -> Self {
        Self
    }

    fn reject_device(buf: &BufferDesc, op: &str) -> Result<()> {
        if buf.space() == AddrSpace::Device {
            return Err(ChorusError::device(format!(
                "CpuAdapter cannot {op} a device-space buffer"
            )));
        }
        Ok(())
    }
}

impl DeviceAdapter for CpuAdapter {
    unsafe fn stage_for_send(&self, buf: &BufferDesc, _ctx: &ExecutionContext) -> Result<Vec<u8>> {
        Self::reject_device(buf, "stage")?;
        let slice =
            unsafe { std::slice::from_raw_parts(buf.as_u64() as *const u8, buf.len_bytes()) };
        Ok(slice.to_vec())
    }

    unsafe fn receive_to_buffer(
        &self,
        data: &[u8],
        buf: &BufferDesc,
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        Self::reject_device(buf, "fill")?;
        if data.len() > buf.len_bytes() {
            return Err(ChorusError::BufferSizeMismatch {
                expected: buf.len_bytes(),
                actual: data.len(),
            });
        }
        let dst = buf.as_u64() as *mut u8;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn synchronize(&self, _ctx: &ExecutionContext) -> Result<()> {
        // Host copies complete synchronously; there is no stream to drain.
        Ok(())
    }

    unsafe fn reduce_inplace(
        &self,
        dst_ptr: u64,
        src: &[u8],
        count: usize,
        dtype: DataType,
        op: ReduceOp,
    ) -> Result<()> {
        let expected = count * dtype.size_in_bytes();
        if src.len() != expected {
            return Err(ChorusError::BufferSizeMismatch {
                expected,
                actual: src.len(),
            });
        }
        unsafe { crate::reduce::reduce_ptr(dst_ptr, src, count, dtype, op) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_for_send_roundtrip() {
        let adapter = CpuAdapter::new();
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let buf = BufferDesc::from_f32_slice(&data);

        let staged = unsafe { adapter.stage_for_send(&buf, &ExecutionContext::host()).unwrap() };
        assert_eq!(staged.len(), 16);

        let recovered: &[f32] =
            unsafe { std::slice::from_raw_parts(staged.as_ptr() as *const f32, 4) };
        assert_eq!(recovered, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_receive_to_buffer() {
        let adapter = CpuAdapter::new();
        let src = [0xDE, 0xAD, 0xBE, 0xEF];
        let dst = [0u8; 4];
        let buf = unsafe { BufferDesc::new(dst.as_ptr() as u64, 4, DataType::U8, AddrSpace::Host) };

        unsafe {
            adapter
                .receive_to_buffer(&src, &buf, &ExecutionContext::host())
                .unwrap();
        }
        assert_eq!(dst, src);
    }

    #[test]
    fn test_receive_overflow_rejected() {
        let adapter = CpuAdapter::new();
        let src = [0u8; 8];
        let dst = [0u8; 4];
        let buf = unsafe { BufferDesc::new(dst.as_ptr() as u64, 4, DataType::U8, AddrSpace::Host) };

        let result = unsafe { adapter.receive_to_buffer(&src, &buf, &ExecutionContext::host()) };
        assert!(result.is_err());
    }

    #[test]
    fn test_device_space_rejected() {
        let adapter = CpuAdapter::new();
        let buf = unsafe { BufferDesc::device(0x1000, 4, DataType::F32) };
        let result = unsafe { adapter.stage_for_send(&buf, &ExecutionContext::host()) };
        assert!(result.is_err());
    }

    #[test]
    fn test_reduce_sum_f32() {
        let adapter = CpuAdapter::new();
        let mut dst: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let src: Vec<f32> = vec![10.0, 20.0, 30.0, 40.0];
        let src_bytes: &[u8] =
            unsafe { std::slice::from_raw_parts(src.as_ptr() as *const u8, src.len() * 4) };

        unsafe {
            adapter
                .reduce_inplace(
                    dst.as_mut_ptr() as u64,
                    src_bytes,
                    4,
                    DataType::F32,
                    ReduceOp::Sum,
                )
                .unwrap();
        }
        assert_eq!(dst, vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_reduce_min_max_i32() {
        let adapter = CpuAdapter::new();
        let mut dst: Vec<i32> = vec![5, 1, 8, 3];
        let src: Vec<i32> = vec![2, 7, 4, 9];
        let src_bytes: &[u8] =
            unsafe { std::slice::from_raw_parts(src.as_ptr() as *const u8, src.len() * 4) };

        unsafe {
            adapter
                .reduce_inplace(
                    dst.as_mut_ptr() as u64,
                    src_bytes,
                    4,
                    DataType::I32,
                    ReduceOp::Min,
                )
                .unwrap();
        }
        assert_eq!(dst, vec![2, 1, 4, 3]);

        dst = vec![5, 1, 8, 3];
        unsafe {
            adapter
                .reduce_inplace(
                    dst.as_mut_ptr() as u64,
                    src_bytes,
                    4,
                    DataType::I32,
                    ReduceOp::Max,
                )
                .unwrap();
        }
        assert_eq!(dst, vec![5, 7, 8, 9]);
    }

    #[test]
    fn test_reduce_buffer_mismatch() {
        let adapter = CpuAdapter::new();
        let mut dst: Vec<f32> = vec![1.0, 2.0];
        let short_src = [0u8; 4]; // count=2 expects 8 bytes

        let result = unsafe {
            adapter.reduce_inplace(
                dst.as_mut_ptr() as u64,
                &short_src,
                2,
                DataType::F32,
                ReduceOp::Sum,
            )
        };
        assert!(result.is_err());
    }

    #[test]
    fn test_reduce_unsupported_dtype() {
        let adapter = CpuAdapter::new();
        let mut dst = [0u8; 4];
        let src = [0u8; 4];

        let result = unsafe {
            adapter.reduce_inplace(
                dst.as_mut_ptr() as u64,
                &src,
                2,
                DataType::F16,
                ReduceOp::Sum,
            )
        };
        assert!(result.is_err());
    }
}
