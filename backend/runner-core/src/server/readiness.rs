use crate::LOOPBACK_HOSTNAME;
use crate::error::server::{ServerError, StartDiagnostics};

use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep as TokioSleep;

const INITIAL_PROBE_INTERVAL: Duration = Duration::from_millis(10);

/// Poll the port until a connection succeeds.
///
/// Gives up when `timeout` elapses or when `task` has already finished.
pub(crate) async fn wait_until_accepting(
    port: u16,
    timeout: Duration,
    task: &JoinHandle<()>,
) -> Result<(), ServerError> {
    let mut backoff = ExponentialBackoff {
        initial_interval: INITIAL_PROBE_INTERVAL,
        max_elapsed_time: Some(timeout),
        ..Default::default()
    };

    debug!("Waiting for server on port {port}");

    loop {
        if task.is_finished() {
            return Err(ServerError::start(
                format!("Serving task on port {port} exited before becoming ready"),
                StartDiagnostics::default(),
            ));
        }

        if TcpStream::connect((LOOPBACK_HOSTNAME, port)).await.is_ok() {
            debug!("Server on port {port} is accepting connections");
            return Ok(());
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("Server not ready, retrying after {duration:?}");
                TokioSleep(duration).await;
            }
            None => {
                return Err(ServerError::start(
                    format!("Server on port {port} did not become ready within {timeout:?}"),
                    StartDiagnostics::default(),
                ));
            }
        }
    }
}
