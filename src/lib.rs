pub mod comm;
pub mod config;
pub mod device;
pub mod error;
pub mod group;
pub mod memory;
pub mod protocol;
pub mod reduce;
pub mod transport;
pub mod types;

mod collective;

pub use comm::{Communicator, PendingOp, SyncCommunicator, wait_all};
pub use config::ChorusConfig;
pub use device::{CpuAdapter, DeviceAdapter, ExecutionContext, StreamOrdering};
pub use error::{ChorusError, Result};
pub use group::{GroupRoster, SeedNode, WorkerNode};
pub use memory::{AddrSpace, BufferDesc};
pub use protocol::ChorusMessage;
pub use transport::buffer_pool::PooledBuf;
pub use transport::{PeerConnection, TransportListener};
pub use types::{DataType, Priority, Rank, ReduceOp, Tag};
