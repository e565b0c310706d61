use crate::error::Result;
use std::future::Future;
use tokio::task::JoinHandle;

/// An owned handle to one in-flight non-blocking send or receive.
///
/// The operation runs in a spawned task. Call [`PendingOp::wait`] to block
/// until it completes; waiting consumes the handle, so each request is
/// waited on exactly once by construction. Until then the buffer named by
/// the operation must not be read or written.
///
/// If dropped without being waited on, the background task is aborted so
/// it cannot write into memory the caller may have freed.
pub struct PendingOp {
    inner: Option<JoinHandle<Result<()>>>,
}

impl PendingOp {
    /// Spawn a future as a pending operation and return its handle.
    pub(crate) fn spawn(fut: impl Future<Output = Result<()>> + Send + 'static) -> Self {
        Self {
            inner: Some(tokio::spawn(fut)),
        }
    }

    /// Wait for the operation to complete and propagate any error.
    pub async fn wait(mut self) -> Result<()> {
        let handle = self.inner.take().expect("PendingOp already consumed");
        handle.await.map_err(|e| {
            crate::error::ChorusError::transport(format!("pending operation panicked: {e}"))
        })?
    }

    /// Check if the operation has finished (non-blocking).
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for PendingOp {
    fn drop(&mut self) {
        if let Some(handle) = &self.inner {
            handle.abort();
        }
    }
}

/// Wait for every operation in the batch to complete.
///
/// Individual completion order is unspecified; only the aggregate
/// completion is observable. Returns the first error encountered, after
/// all operations have been awaited.
pub async fn wait_all(ops: Vec<PendingOp>) -> Result<()> {
    let mut first_err = None;
    for op in ops {
        if let Err(e) = op.wait().await
            && first_err.is_none()
        {
            first_err = Some(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
