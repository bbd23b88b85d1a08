//! Scoped executor lifetime.
//!
//! [`ExecutorGuard::scoped`] initializes an executor, runs a body with it
//! and always cleans it up afterwards, whether the body succeeded, failed or
//! panicked.

use crate::ports::executor::{Executor, ExecutorError};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ExecutorGuard {
    executor: Arc<dyn Executor>,
    released: bool,
}

impl ExecutorGuard {
    /// Initialize `executor`. On failure it is cleaned up before the error
    /// is returned.
    pub async fn acquire(executor: Arc<dyn Executor>) -> Result<Self, ExecutorError> {
        if let Err(e) = executor.initialize().await {
            if let Err(cleanup_err) = executor.cleanup().await {
                warn!("Cleanup after failed initialization also failed: {}", cleanup_err);
            }
            return Err(e);
        }
        debug!(mode = %executor.mode(), cwd = %executor.cwd(), "Executor initialized");
        Ok(Self {
            executor,
            released: false,
        })
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Clean up now and report the outcome.
    pub async fn release(mut self) -> Result<(), ExecutorError> {
        self.released = true;
        self.executor.cleanup().await
    }

    /// Run `body` with an initialized executor, then clean it up.
    ///
    /// Cleanup failures are logged, not returned: the body's output wins.
    pub async fn scoped<F, Fut, T>(executor: Arc<dyn Executor>, body: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(Arc<dyn Executor>) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = Self::acquire(executor).await?;
        let output = body(guard.executor.clone()).await;
        if let Err(e) = guard.release().await {
            warn!("Executor cleanup failed: {}", e);
        }
        Ok(output)
    }
}

impl Drop for ExecutorGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Dropped without release (panic or cancelled future): clean up in
        // the background if a runtime is still around.
        let executor = self.executor.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = executor.cleanup().await {
                        warn!("Deferred executor cleanup failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("Executor dropped outside a runtime; cleanup skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryExecutor;
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn scoped_initializes_and_cleans_up() {
        let executor = Arc::new(MemoryExecutor::new());
        let out = ExecutorGuard::scoped(executor.clone(), |exec| async move {
            exec.write_file("x", "1").await.map(|_| 7)
        })
        .await
        .unwrap();
        assert_eq!(out.unwrap(), 7);
        assert_eq!(executor.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(executor.cleaned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_error_still_cleans_up() {
        let executor = Arc::new(MemoryExecutor::new());
        let out = ExecutorGuard::scoped(executor.clone(), |exec| async move {
            exec.read_file("missing").await
        })
        .await
        .unwrap();
        assert!(out.is_err());
        assert_eq!(executor.cleaned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_initialize_cleans_up_and_errors() {
        let executor = Arc::new(MemoryExecutor {
            fail_initialize: true,
            ..MemoryExecutor::new()
        });
        let out = ExecutorGuard::scoped(executor.clone(), |_| async { 1 }).await;
        assert!(matches!(out, Err(ExecutorError::Runtime(_))));
        assert_eq!(executor.cleaned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panic_in_body_cleans_up_in_background() {
        let executor = Arc::new(MemoryExecutor::new());
        let outcome = AssertUnwindSafe(ExecutorGuard::scoped(executor.clone(), |_| async {
            if true {
                panic!("body panicked");
            }
            1
        }))
        .catch_unwind()
        .await;
        assert!(outcome.is_err());

        for _ in 0..10 {
            if executor.cleaned.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(executor.cleaned.load(Ordering::SeqCst), 1);
    }
}
