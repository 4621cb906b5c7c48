//! Sync client: watches a local root and mirrors it onto a remote
//!
//! A pass fetches the remote listing, plans the difference, runs the
//! transfers, runs the cleanup only if every transfer succeeded, then reads
//! the remote back and checks that it matches what was captured locally.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use dropsync_core::{
    ClientConfig, Plan, Result, Snapshot, SyncAction, SyncError, SyncRoot, has_changed, plan,
};

use crate::service::{Service, Shutdown};
use crate::session::{Connector, RemoteSession};

/// What a finished pass did
#[derive(Debug, Clone)]
pub struct PassReport {
    /// The plan that was executed
    pub plan: Plan,
    /// File bytes sent by uploads
    pub uploaded_bytes: u64,
    /// Number of files in the synced local snapshot
    pub files: usize,
    pub elapsed: Duration,
}

/// Result of asking the client for a pass
#[derive(Debug, Clone)]
pub enum PassOutcome {
    /// A pass ran and the remote now matches the local snapshot
    Synced(PassReport),
    /// The local root has not changed since the last successful pass
    Unchanged,
    /// Another pass was already running
    Skipped,
}

struct ClientState {
    session: Option<Box<dyn RemoteSession>>,
    last_synced: Option<Snapshot>,
}

/// Keeps a remote directory identical to a local one
pub struct SyncClient {
    connector: Box<dyn Connector>,
    local: SyncRoot,
    config: ClientConfig,
    state: Mutex<ClientState>,
}

impl SyncClient {
    #[must_use]
    pub fn new(connector: impl Connector + 'static, local: SyncRoot, config: ClientConfig) -> Self {
        Self {
            connector: Box::new(connector),
            local,
            config,
            state: Mutex::new(ClientState {
                session: None,
                last_synced: None,
            }),
        }
    }

    /// Local root being mirrored
    #[must_use]
    pub fn local(&self) -> &SyncRoot {
        &self.local
    }

    /// Snapshot recorded by the last successful pass
    pub async fn last_synced(&self) -> Option<Snapshot> {
        self.state.lock().await.last_synced.clone()
    }

    /// One watch tick: sync if the local root changed since the last
    /// successful pass (or there was none yet)
    ///
    /// # Errors
    /// Returns the error of a failed pass; the next tick starts over
    pub async fn poll_once(&self) -> Result<PassOutcome> {
        let Ok(mut state) = self.state.try_lock() else {
            return Ok(PassOutcome::Skipped);
        };
        let local = self.local.capture().await?;
        if let Some(previous) = &state.last_synced
            && !has_changed(previous, &local)
        {
            return Ok(PassOutcome::Unchanged);
        }
        if let Some(previous) = &state.last_synced {
            let diff = previous.diff(&local);
            debug!(
                "local changes: {} added, {} removed, {} modified",
                diff.added.len(),
                diff.removed.len(),
                diff.modified.len()
            );
        }
        self.pass(&mut state, local).await.map(PassOutcome::Synced)
    }

    /// Capture the local root and run a pass regardless of change state
    ///
    /// # Errors
    /// Returns the error of a failed pass
    pub async fn sync_once(&self) -> Result<PassOutcome> {
        let Ok(mut state) = self.state.try_lock() else {
            return Ok(PassOutcome::Skipped);
        };
        let local = self.local.capture().await?;
        self.pass(&mut state, local).await.map(PassOutcome::Synced)
    }

    /// Compute what a pass would do without touching the remote
    ///
    /// # Errors
    /// Returns an error if either side cannot be listed
    pub async fn preview(&self) -> Result<Plan> {
        let mut state = self.state.lock().await;
        let local = self.local.capture().await?;
        let remote = self.fetch_remote(&mut state).await?;
        Ok(plan(&local, &remote))
    }

    /// Take the open session, or connect a new one.
    ///
    /// A request owns its session while in flight and hands it back only
    /// once it completed, so a pass abandoned mid-request (on shutdown)
    /// drops a connection that may be out of step instead of reusing it.
    async fn checkout(&self, state: &mut ClientState) -> Result<Box<dyn RemoteSession>> {
        match state.session.take() {
            Some(session) => Ok(session),
            None => self.connector.connect().await,
        }
    }

    /// List the remote, reconnecting between attempts
    async fn fetch_remote(&self, state: &mut ClientState) -> Result<Snapshot> {
        let attempts = self.config.fetch_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let listed = match self.checkout(state).await {
                Ok(mut session) => {
                    let listed = session.read_dir_content().await;
                    if listed.is_ok() {
                        state.session = Some(session);
                    }
                    listed
                }
                Err(e) => Err(e),
            };
            match listed {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    warn!(
                        "listing {} failed (attempt {attempt}/{attempts}): {e}",
                        self.connector.describe()
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SyncError::protocol("remote listing never attempted")))
    }

    /// Run one action, dropping the session if it may be out of step
    async fn execute(&self, state: &mut ClientState, action: &SyncAction) -> Result<u64> {
        let mut session = self.checkout(state).await?;
        let result = session.apply(&self.local, action).await;
        if !matches!(&result, Err(e) if e.is_transient()) {
            state.session = Some(session);
        }
        result
    }

    async fn pass(&self, state: &mut ClientState, local: Snapshot) -> Result<PassReport> {
        let started = Instant::now();
        let remote = self.fetch_remote(state).await?;
        let plan = plan(&local, &remote);

        if plan.is_empty() {
            debug!("remote already up to date");
        } else {
            info!(
                "syncing: {} transfers ({} uploads), {} deletes",
                plan.transfers.len(),
                plan.upload_count(),
                plan.cleanup.len()
            );
        }

        let mut uploaded_bytes = 0;
        let mut failed = 0usize;
        for action in &plan.transfers {
            match self.execute(state, action).await {
                Ok(bytes) => {
                    uploaded_bytes += bytes;
                    debug!("{action}");
                }
                Err(e) => {
                    warn!("{action} failed: {e}");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(SyncError::Consistency(format!(
                "{failed} of {} transfers failed, cleanup skipped",
                plan.transfers.len()
            )));
        }

        for action in &plan.cleanup {
            match self.execute(state, action).await {
                Ok(_) => debug!("{action}"),
                Err(e) => warn!("{action} failed: {e}"),
            }
        }

        let after = self.fetch_remote(state).await?;
        if !after.same_content(&local) {
            let diff = after.diff(&local);
            return Err(SyncError::Consistency(format!(
                "remote differs after sync: {} missing, {} extra, {} different",
                diff.added.len(),
                diff.removed.len(),
                diff.modified.len()
            )));
        }

        let report = PassReport {
            files: local.len(),
            plan,
            uploaded_bytes,
            elapsed: started.elapsed(),
        };
        state.last_synced = Some(local);
        Ok(report)
    }
}

#[async_trait]
impl Service for SyncClient {
    fn name(&self) -> &'static str {
        "sync client"
    }

    async fn run(self: Arc<Self>, mut shutdown: Shutdown) -> Result<()> {
        info!(
            "watching {} -> {} every {:?}",
            self.local.path().display(),
            self.connector.describe(),
            self.config.poll_interval
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                () = shutdown.wait() => break,
                outcome = self.poll_once() => outcome,
            };
            match outcome {
                Ok(PassOutcome::Synced(report)) if !report.plan.is_empty() => info!(
                    "synced {} files in {:?} ({} actions, {} bytes uploaded)",
                    report.files,
                    report.elapsed,
                    report.plan.len(),
                    report.uploaded_bytes
                ),
                Ok(PassOutcome::Synced(_) | PassOutcome::Unchanged) => {}
                Ok(PassOutcome::Skipped) => debug!("previous pass still running"),
                Err(e) => error!("sync pass failed: {e}"),
            }
        }
        Ok(())
    }
}
