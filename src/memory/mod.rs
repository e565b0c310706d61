mod buffer;

pub use buffer::{AddrSpace, BufferDesc};
