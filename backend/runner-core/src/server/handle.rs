//! Handle to a running ephemeral server.

use crate::server::artifact::TemporaryArtifact;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::process::Child as TokioChild;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long `stop` waits for a graceful exit before aborting.
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(2);

pub(crate) enum ServingUnit {
    Task {
        task: JoinHandle<()>,
        shutdown: Option<oneshot::Sender<()>>,
    },
    Child {
        child: TokioChild,
    },
}

/// Owns the serving unit, the bound port and any temporary document.
///
/// Created by [`start`](crate::server::start). [`stop`](Self::stop) tears
/// everything down and may be called any number of times. Dropping a handle
/// that was never stopped aborts the unit without waiting.
pub struct ServerHandle {
    port: u16,
    served_path: String,
    created_at: Instant,
    fetched: watch::Receiver<bool>,
    unit: Option<ServingUnit>,
    artifact: Option<Arc<TemporaryArtifact>>,
}

impl ServerHandle {
    pub(crate) fn new(
        port: u16,
        served_path: String,
        fetched: watch::Receiver<bool>,
        unit: ServingUnit,
        artifact: Option<Arc<TemporaryArtifact>>,
    ) -> Self {
        Self {
            port,
            served_path,
            created_at: Instant::now(),
            fetched,
            unit: Some(unit),
            artifact,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path the document is served on. With a temp-file backing and the root
    /// path requested this is `/<temp file name>`.
    pub fn served_path(&self) -> &str {
        &self.served_path
    }

    /// The temporary document file, while the handle still owns one.
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact.as_deref().map(TemporaryArtifact::path)
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_stopped(&self) -> bool {
        self.unit.is_none()
    }

    pub fn primary_fetched(&self) -> bool {
        *self.fetched.borrow()
    }

    /// Resolves once the document was fetched.
    ///
    /// Returns `false` if the unit finished without anyone fetching it.
    pub async fn wait_for_primary_fetch(&mut self) -> bool {
        self.fetched.wait_for(|done| *done).await.is_ok()
    }

    /// Stop serving and release the port, the unit and the temporary file.
    pub async fn stop(&mut self) {
        let Some(unit) = self.unit.take() else {
            debug!("Server on port {} already stopped", self.port);
            return;
        };

        match unit {
            ServingUnit::Task { mut task, shutdown } => {
                if let Some(shutdown) = shutdown {
                    let _ = shutdown.send(());
                }
                if timeout(STOP_GRACE_PERIOD, &mut task).await.is_err() {
                    warn!(
                        "Server on port {} still running after {STOP_GRACE_PERIOD:?}, aborting",
                        self.port
                    );
                    task.abort();
                    let _ = task.await;
                }
            }
            ServingUnit::Child { mut child } => {
                if let Err(e) = child.start_kill() {
                    debug!("Child server already gone: {e}");
                }
                match timeout(STOP_GRACE_PERIOD, child.wait()).await {
                    Ok(Ok(status)) => debug!("Child server exited: {status}"),
                    Ok(Err(e)) => warn!("Failed to reap child server: {e}"),
                    Err(_) => warn!("Child server did not exit within {STOP_GRACE_PERIOD:?}"),
                }
            }
        }

        if let Some(artifact) = self.artifact.take() {
            artifact.remove();
        }

        info!(
            "Server on port {} stopped after {:?}",
            self.port,
            self.created_at.elapsed()
        );
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        match self.unit.take() {
            Some(ServingUnit::Task { task, .. }) => {
                debug!("Aborting server on port {} on drop", self.port);
                task.abort();
            }
            Some(ServingUnit::Child { mut child }) => {
                debug!("Killing child server on port {} on drop", self.port);
                let _ = child.start_kill();
            }
            None => {}
        }

        if let Some(artifact) = self.artifact.take() {
            artifact.remove();
        }
    }
}
