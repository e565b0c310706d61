mod allreduce;
mod barrier;
mod helpers;

pub(crate) use allreduce::ring_allreduce;
pub(crate) use barrier::barrier;
