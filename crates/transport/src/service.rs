//! Start/stop plumbing shared by the server and the client

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use dropsync_core::Result;

/// Receiving end of a stop signal. Cheap to clone; every clone observes the
/// same signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A signal that can be triggered through the returned sender
    #[must_use]
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// Whether stop was requested
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once stop is requested or the sender is gone
    pub async fn wait(&mut self) {
        // An error means the sender was dropped, which also ends the service.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// A long-running task with a name for log lines
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run until `shutdown` fires or a fatal error occurs
    async fn run(self: Arc<Self>, shutdown: Shutdown) -> Result<()>;
}

/// Handle to a service started with [`start`]
pub struct ServiceHandle {
    name: &'static str,
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

/// Spawn `service` on the current runtime
pub fn start<S: Service>(service: Arc<S>) -> ServiceHandle {
    let (stop, shutdown) = Shutdown::channel();
    let name = service.name();
    let task = tokio::spawn(async move {
        debug!("{name} started");
        let result = service.run(shutdown).await;
        match &result {
            Ok(()) => debug!("{name} stopped"),
            Err(e) => error!("{name} failed: {e}"),
        }
        result
    });
    ServiceHandle { name, stop, task }
}

impl ServiceHandle {
    /// Service name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the service task has ended on its own
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal stop and wait for the service to wind down
    ///
    /// # Errors
    /// Returns the error the service ended with, if any
    pub async fn stop(self) -> Result<()> {
        self.stop.send_replace(true);
        self.join().await
    }

    /// Wait for the service to end without signalling it
    ///
    /// # Errors
    /// Returns the error the service ended with, if any
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Ticker {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl Service for Ticker {
        fn name(&self) -> &'static str {
            "ticker"
        }

        async fn run(self: Arc<Self>, mut shutdown: Shutdown) -> Result<()> {
            loop {
                tokio::select! {
                    () = shutdown.wait() => return Ok(()),
                    () = tokio::time::sleep(Duration::from_millis(5)) => {
                        self.ticks.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_stop_ends_service() {
        let ticker = Arc::new(Ticker {
            ticks: AtomicUsize::new(0),
        });
        let handle = start(Arc::clone(&ticker));
        assert_eq!(handle.name(), "ticker");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .unwrap()
            .unwrap();

        let after = ticker.ticks.load(Ordering::SeqCst);
        assert!(after > 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), after);
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_shutdown() {
        let (tx, mut shutdown) = Shutdown::channel();
        assert!(!shutdown.is_shutdown());
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .unwrap();
    }
}
