//! Subprocess serving unit.
//!
//! The parent spawns `<program> serve <port>`, writes the document to the
//! child's stdin and parses the child's stdout for the ready marker. The child
//! side lives in [`serve_child`].

use crate::error::server::{ServerError, StartDiagnostics};
use crate::port::ReservedPort;
use crate::render::RenderedDocument;
use crate::server::handle::{ServerHandle, ServingUnit};
use crate::server::routes::{DocumentSource, ServeState, router};
use crate::server::task::spawn_accept_loop;
use crate::server::{DocumentBacking, ROOT_PATH, ServerOptions};
use crate::{LOOPBACK_BASE_URL, LOOPBACK_HOSTNAME};

use common::ErrorLocation;

use std::env::current_exe;
use std::net::TcpListener as StdTcpListener;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use const_format::concatcp;
use log::{debug, info, trace, warn};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child as TokioChild, Command as TokioCommand};
use tokio::spawn as TokioSpawn;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Port the child binds when none (or garbage) is given.
pub const CHILD_DEFAULT_PORT: u16 = 18000;
pub const SERVE_COMMAND: &str = "serve";
pub const LIFETIME_FLAG: &str = "--lifetime-ms";
pub const LINGER_FLAG: &str = "--linger-ms";

/// Printed by the child once it accepts connections, followed by its base URL.
pub const READY_MARKER_PREFIX: &str = "pysrun-serve: listening on";
/// Printed by the child after the first successful fetch of the document.
pub const FETCHED_MARKER: &str = "pysrun-serve: fetched";

const READY_LINE_PATTERN: &str =
    concatcp!("^", READY_MARKER_PREFIX, r" http://(?P<host>[^\s:]+):(?P<port>\d+)");
const READY_CAPTURE_HOST: &str = "host";
const READY_CAPTURE_PORT: &str = "port";
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

static READY_REGEX: OnceLock<Regex> = OnceLock::new();

pub fn get_ready_regex() -> &'static Regex {
    READY_REGEX.get_or_init(|| Regex::new(READY_LINE_PATTERN).expect("valid regex pattern"))
}

/// Port argument of `pysrun serve [PORT]`.
pub fn parse_child_port(arg: Option<&str>) -> u16 {
    match arg.map(str::trim) {
        Some(text) => text.parse::<u16>().unwrap_or_else(|_| {
            warn!("Invalid port '{text}', using {CHILD_DEFAULT_PORT}");
            CHILD_DEFAULT_PORT
        }),
        None => CHILD_DEFAULT_PORT,
    }
}

/// Arguments of the child entry point.
#[derive(Debug, Clone)]
pub struct ChildServeArgs {
    pub port: u16,
    pub lifetime: Duration,
    pub linger: Option<Duration>,
    pub working_directory: PathBuf,
}

/// Child side: read the document from stdin, serve it, report on stdout.
///
/// Returns when the lifetime (or the post-fetch linger) runs out.
pub async fn serve_child(args: ChildServeArgs) -> Result<(), ServerError> {
    let mut body = String::new();
    tokio::io::stdin().read_to_string(&mut body).await?;
    debug!("Read {} bytes of document from stdin", body.len());

    let listener = StdTcpListener::bind((LOOPBACK_HOSTNAME, args.port)).map_err(|e| {
        ServerError::Bind {
            message: format!("Failed to bind {LOOPBACK_HOSTNAME}:{}: {e}", args.port),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        }
    })?;
    let port = listener.local_addr()?.port();

    let (fetched_tx, mut fetched_rx) = watch::channel(false);
    let state = ServeState::new(
        DocumentSource::Memory(RenderedDocument::new(body)),
        fetched_tx,
    );
    let app = router(ROOT_PATH, &args.working_directory, state);

    // Held until we return; dropping it would stop the accept loop.
    let (_shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut task = spawn_accept_loop(
        listener,
        app,
        shutdown_rx,
        fetched_rx.clone(),
        args.lifetime,
        args.linger,
    )?;

    println!("{READY_MARKER_PREFIX} {LOOPBACK_BASE_URL}:{port}");

    tokio::select! {
        fetched = fetched_rx.wait_for(|done| *done) => {
            if fetched.is_ok() {
                println!("{FETCHED_MARKER}");
            }
        }
        _ = &mut task => {
            info!("Child server on port {port} finished");
            return Ok(());
        }
    }

    if let Err(e) = task.await {
        warn!("Child accept loop ended abnormally: {e}");
    }
    info!("Child server on port {port} finished");
    Ok(())
}

pub(crate) fn build_serve_command(
    program: &Path,
    port: u16,
    options: &ServerOptions,
) -> TokioCommand {
    let mut cmd = TokioCommand::new(program);
    cmd.arg(SERVE_COMMAND)
        .arg(port.to_string())
        .arg(LIFETIME_FLAG)
        .arg(options.max_lifetime.as_millis().max(1).to_string());
    if let Some(linger) = options.linger {
        cmd.arg(LINGER_FLAG).arg(linger.as_millis().to_string());
    }
    cmd.current_dir(&options.working_directory)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Output the child printed that was not a marker line.
#[derive(Clone, Default)]
struct CapturedOutput {
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
}

impl CapturedOutput {
    fn push(buffer: &Mutex<String>, line: &str) {
        let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push_str(line);
        buffer.push('\n');
    }

    fn snapshot(&self, exit_status: Option<String>) -> StartDiagnostics {
        let read = |buffer: &Mutex<String>| buffer.lock().unwrap_or_else(|e| e.into_inner()).clone();
        StartDiagnostics {
            exit_status,
            stdout: read(&self.stdout),
            stderr: read(&self.stderr),
        }
    }
}

pub(crate) async fn start_child(
    options: ServerOptions,
    reserved: ReservedPort,
) -> Result<ServerHandle, ServerError> {
    if options.backing != DocumentBacking::Memory || options.served_path != ROOT_PATH {
        warn!(
            "Child serving unit always serves from memory at {ROOT_PATH}, ignoring {:?} backing and path {}",
            options.backing, options.served_path
        );
    }

    let program = match &options.child_program {
        Some(program) => program.clone(),
        None => current_exe()?,
    };

    // The child binds the port itself.
    let port = reserved.release();
    debug!("Released port {port} for {}", program.display());

    let mut child = build_serve_command(&program, port, &options)
        .spawn()
        .map_err(|e| {
            ServerError::start(
                format!("Failed to spawn {}: {e}", program.display()),
                StartDiagnostics::default(),
            )
        })?;

    info!("Spawned child server {} (PID: {:?})", program.display(), child.id());

    if let Some(mut stdin) = child.stdin.take() {
        let document = options.document.clone();
        TokioSpawn(async move {
            if let Err(e) = stdin.write_all(document.as_bytes()).await {
                debug!("Failed to write document to child stdin: {e}");
            }
            // Dropping stdin closes the pipe, the child reads until EOF.
        });
    }

    let captured = CapturedOutput::default();
    let stderr_reader = drain_stderr(&mut child, &captured);
    let (ready_tx, ready_rx) = oneshot::channel();
    let (fetched_tx, fetched_rx) = watch::channel(false);
    drain_stdout(&mut child, &captured, ready_tx, fetched_tx);

    match timeout(options.ready_timeout, ready_rx).await {
        Ok(Ok(reported)) => {
            if reported != port {
                warn!("Child reported port {reported}, expected {port}");
            }
            info!("Child server ready on port {port}");
            Ok(ServerHandle::new(
                port,
                String::from(ROOT_PATH),
                fetched_rx,
                ServingUnit::Child { child },
                None,
            ))
        }
        Ok(Err(_)) => {
            let status = match timeout(options.ready_timeout, child.wait()).await {
                Ok(Ok(status)) => Some(status.to_string()),
                Ok(Err(e)) => Some(format!("unknown ({e})")),
                Err(_) => {
                    let _ = child.kill().await;
                    None
                }
            };
            finish_draining(stderr_reader).await;
            Err(ServerError::start(
                format!("Child server on port {port} exited before becoming ready"),
                captured.snapshot(status),
            ))
        }
        Err(_) => {
            warn!("Child server did not become ready, killing (PID: {:?})", child.id());
            let _ = child.kill().await;
            finish_draining(stderr_reader).await;
            Err(ServerError::start(
                format!(
                    "Child server on port {port} did not become ready within {:?}",
                    options.ready_timeout
                ),
                captured.snapshot(None),
            ))
        }
    }
}

fn drain_stderr(child: &mut TokioChild, captured: &CapturedOutput) -> Option<JoinHandle<()>> {
    let stderr = child.stderr.take()?;
    let buffer = Arc::clone(&captured.stderr);
    Some(TokioSpawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!("Child stderr: {line}");
            CapturedOutput::push(&buffer, &line);
        }
    }))
}

fn drain_stdout(
    child: &mut TokioChild,
    captured: &CapturedOutput,
    ready: oneshot::Sender<u16>,
    fetched: watch::Sender<bool>,
) {
    let Some(stdout) = child.stdout.take() else {
        return;
    };
    let buffer = Arc::clone(&captured.stdout);

    TokioSpawn(async move {
        let mut ready = Some(ready);
        let mut lines = BufReader::new(stdout).lines();
        let re = get_ready_regex();

        while let Ok(Some(line)) = lines.next_line().await {
            trace!("Child stdout: {line}");

            if line.trim() == FETCHED_MARKER {
                fetched.send_replace(true);
                continue;
            }

            let reported = re.captures(&line).and_then(|cap| {
                let host = cap.name(READY_CAPTURE_HOST)?.as_str();
                if host != LOOPBACK_HOSTNAME {
                    warn!("Child reported unexpected hostname: {host}, expected {LOOPBACK_HOSTNAME}");
                }
                cap.name(READY_CAPTURE_PORT)?.as_str().parse::<u16>().ok()
            });

            match (reported, ready.take()) {
                (Some(port), Some(sender)) => {
                    let _ = sender.send(port);
                }
                (_, pending) => {
                    ready = pending;
                    CapturedOutput::push(&buffer, &line);
                }
            }
        }
        debug!("Child stdout closed");
    });
}

async fn finish_draining(reader: Option<JoinHandle<()>>) {
    if let Some(reader) = reader
        && timeout(OUTPUT_DRAIN_TIMEOUT, reader).await.is_err()
    {
        debug!("Child stderr still open after {OUTPUT_DRAIN_TIMEOUT:?}");
    }
}
