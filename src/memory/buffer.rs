//! Tagged buffer descriptors.
//!
//! A [`BufferDesc`] pairs a raw `u64` address with its element count,
//! element type, and address space. It is a description, not an owner:
//! the caller allocates and frees the memory, and guarantees validity for
//! the lifetime of any operation the descriptor is passed to. Operations
//! dispatch on the address-space tag to pick a direct host path or a
//! stream-ordered device path.

use crate::types::DataType;

/// Which address space a buffer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrSpace {
    /// Host (CPU) memory, directly addressable by this process.
    Host,
    /// Device memory, reachable only through a `DeviceAdapter`.
    Device,
}

impl std::fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddrSpace::Host => f.write_str("host"),
            AddrSpace::Device => f.write_str("device"),
        }
    }
}

/// A typed, sized, address-space-tagged buffer description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    ptr: u64,
    count: usize,
    dtype: DataType,
    space: AddrSpace,
}

impl BufferDesc {
    /// Describe a raw pointer.
    ///
    /// # Safety
    /// `ptr` must point to at least `count * dtype.size_in_bytes()` bytes of
    /// valid memory in the given address space.
    pub unsafe fn new(ptr: u64, count: usize, dtype: DataType, space: AddrSpace) -> Self {
        Self {
            ptr,
            count,
            dtype,
            space,
        }
    }

    /// Describe a device-space allocation.
    ///
    /// # Safety
    /// `ptr` must be a device address valid for `count` elements of `dtype`.
    pub unsafe fn device(ptr: u64, count: usize, dtype: DataType) -> Self {
        unsafe { Self::new(ptr, count, dtype, AddrSpace::Device) }
    }

    /// Describe a host slice of `i32` elements (read side).
    pub fn from_i32_slice(data: &[i32]) -> Self {
        Self {
            ptr: data.as_ptr() as u64,
            count: data.len(),
            dtype: DataType::I32,
            space: AddrSpace::Host,
        }
    }

    /// Describe a mutable host slice of `i32` elements (write side).
    pub fn from_i32_slice_mut(data: &mut [i32]) -> Self {
        Self {
            ptr: data.as_mut_ptr() as u64,
            count: data.len(),
            dtype: DataType::I32,
            space: AddrSpace::Host,
        }
    }

    /// Describe a host slice of `f32` elements (read side).
    pub fn from_f32_slice(data: &[f32]) -> Self {
        Self {
            ptr: data.as_ptr() as u64,
            count: data.len(),
            dtype: DataType::F32,
            space: AddrSpace::Host,
        }
    }

    /// Describe a mutable host slice of `f32` elements (write side).
    pub fn from_f32_slice_mut(data: &mut [f32]) -> Self {
        Self {
            ptr: data.as_mut_ptr() as u64,
            count: data.len(),
            dtype: DataType::F32,
            space: AddrSpace::Host,
        }
    }

    /// Describe a host slice of `f64` elements (read side).
    pub fn from_f64_slice(data: &[f64]) -> Self {
        Self {
            ptr: data.as_ptr() as u64,
            count: data.len(),
            dtype: DataType::F64,
            space: AddrSpace::Host,
        }
    }

    /// Describe a mutable host slice of `f64` elements (write side).
    pub fn from_f64_slice_mut(data: &mut [f64]) -> Self {
        Self {
            ptr: data.as_mut_ptr() as u64,
            count: data.len(),
            dtype: DataType::F64,
            space: AddrSpace::Host,
        }
    }

    /// Raw address.
    pub fn as_u64(&self) -> u64 {
        self.ptr
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Element type.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Address space.
    pub fn space(&self) -> AddrSpace {
        self.space
    }

    /// Total size in bytes.
    pub fn len_bytes(&self) -> usize {
        self.count * self.dtype.size_in_bytes()
    }

    /// Returns true if the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl std::fmt::Display for BufferDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BufferDesc(0x{:x}, {}x{}, {})",
            self.ptr, self.count, self.dtype, self.space
        )
    }
}
