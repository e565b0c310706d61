mod roster;
mod seed;
mod worker;

pub use roster::GroupRoster;
pub use seed::SeedNode;
pub use worker::WorkerNode;
