//! In-process serving unit: one tokio task running the accept loop.

use crate::error::server::ServerError;
use crate::port::ReservedPort;
use crate::server::artifact::TemporaryArtifact;
use crate::server::handle::{ServerHandle, ServingUnit};
use crate::server::readiness::wait_until_accepting;
use crate::server::routes::{DocumentSource, ServeState, router};
use crate::server::{DocumentBacking, ROOT_PATH, ServerOptions};

use std::future::pending;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::spawn as TokioSpawn;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep as TokioSleep;

/// Why the accept loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Requested,
    LifetimeElapsed,
    Lingered,
}

pub(crate) async fn start_task(
    options: ServerOptions,
    reserved: ReservedPort,
) -> Result<ServerHandle, ServerError> {
    let port = reserved.port();

    let (source, artifact, served_path) = match options.backing {
        DocumentBacking::Memory => (
            DocumentSource::Memory(options.document.clone()),
            None,
            options.served_path.clone(),
        ),
        DocumentBacking::TempFile => {
            let artifact = Arc::new(TemporaryArtifact::create_outside(
                &options.working_directory,
                options.document.as_bytes(),
            )?);
            let served_path = if options.served_path == ROOT_PATH {
                format!("/{}", artifact.file_name())
            } else {
                options.served_path.clone()
            };
            (
                DocumentSource::TempFile(Arc::clone(&artifact)),
                Some(artifact),
                served_path,
            )
        }
    };

    let (fetched_tx, fetched_rx) = watch::channel(false);
    let state = ServeState::new(source, fetched_tx);
    let app = router(&served_path, &options.working_directory, state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = spawn_accept_loop(
        reserved.into_listener(),
        app,
        shutdown_rx,
        fetched_rx.clone(),
        options.max_lifetime,
        options.linger,
    )?;

    if let Err(e) = wait_until_accepting(port, options.ready_timeout, &task).await {
        task.abort();
        if let Some(artifact) = &artifact {
            artifact.remove();
        }
        return Err(e);
    }

    info!("Serving {served_path} on port {port}");

    Ok(ServerHandle::new(
        port,
        served_path,
        fetched_rx,
        ServingUnit::Task {
            task,
            shutdown: Some(shutdown_tx),
        },
        artifact,
    ))
}

/// Spawn the accept loop on an already bound socket.
///
/// The loop ends on the first of: `shutdown` fires, `lifetime` elapses, or the
/// document was fetched and `linger` elapsed after that.
pub(crate) fn spawn_accept_loop(
    listener: StdTcpListener,
    app: axum::Router,
    shutdown: oneshot::Receiver<()>,
    fetched: watch::Receiver<bool>,
    lifetime: Duration,
    linger: Option<Duration>,
) -> Result<JoinHandle<()>, ServerError> {
    listener.set_nonblocking(true)?;
    let listener = TcpListener::from_std(listener)?;

    Ok(TokioSpawn(async move {
        let stop = async move {
            let reason = stop_signal(shutdown, fetched, lifetime, linger).await;
            debug!("Accept loop stopping: {reason:?}");
        };

        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
            warn!("Accept loop failed: {e}");
        }
    }))
}

async fn stop_signal(
    shutdown: oneshot::Receiver<()>,
    mut fetched: watch::Receiver<bool>,
    lifetime: Duration,
    linger: Option<Duration>,
) -> StopReason {
    let after_fetch = async move {
        let Some(linger) = linger else {
            return pending::<()>().await;
        };
        let was_fetched = fetched.wait_for(|done| *done).await.is_ok();
        if was_fetched {
            TokioSleep(linger).await;
        } else {
            pending::<()>().await;
        }
    };

    tokio::select! {
        _ = shutdown => StopReason::Requested,
        _ = TokioSleep(lifetime) => StopReason::LifetimeElapsed,
        _ = after_fetch => StopReason::Lingered,
    }
}
