mod bootstrap;
mod collectives;
mod communicator;
mod p2p;
mod request;
mod sync;

pub use communicator::Communicator;
pub use request::{PendingOp, wait_all};
pub use sync::SyncCommunicator;
