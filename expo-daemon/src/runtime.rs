use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use expo_core::{Config, DeviceId};
use expo_state::StateManager;
use expo_sync::hash_store::{self, HashStore, HashStoreFile};
use expo_sync::{ContentSyncManager, HttpTransport, PublishOutcome, SnapshotPublisher, Transport};
use expo_tail::LogTailer;

use crate::error::{io_err, DaemonError};
use crate::paths::{logs_dir, run_dir, socket_path, DAEMON_LABEL};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// Where the pipeline is in its lifecycle. Transitions are logged at info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Backfilling,
    Publishing,
    Running,
    Stopping,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Stopped => "stopped",
            PipelineState::Backfilling => "backfilling",
            PipelineState::Publishing => "publishing",
            PipelineState::Running => "running",
            PipelineState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

type SharedState = Arc<StdMutex<PipelineState>>;

fn set_state(shared: &SharedState, next: PipelineState) {
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    tracing::info!(from = %*guard, to = %next, "pipeline state change");
    *guard = next;
}

fn current_state(shared: &SharedState) -> PipelineState {
    *shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pipeline counters, surfaced in `status` and used as the error-notification
/// surface alongside warn/error logs.
#[derive(Debug, Default)]
pub struct Counters {
    lines_read: AtomicU64,
    records_applied: AtomicU64,
    publishes_ok: AtomicU64,
    publishes_failed: AtomicU64,
    uploads_ok: AtomicU64,
    uploads_failed: AtomicU64,
    last_error: StdMutex<Option<String>>,
}

impl Counters {
    pub fn note_error(&self, message: impl Into<String>) {
        let mut guard = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(message.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publishes_ok(&self) -> u64 {
        self.publishes_ok.load(Ordering::Relaxed)
    }

    fn as_json(&self) -> Value {
        json!({
            "lines_read": self.lines_read.load(Ordering::Relaxed),
            "records_applied": self.records_applied.load(Ordering::Relaxed),
            "publishes_ok": self.publishes_ok.load(Ordering::Relaxed),
            "publishes_failed": self.publishes_failed.load(Ordering::Relaxed),
            "uploads_ok": self.uploads_ok.load(Ordering::Relaxed),
            "uploads_failed": self.uploads_failed.load(Ordering::Relaxed),
        })
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Run the pipeline against the configured HTTP endpoint.
pub async fn run(home: PathBuf, config: Config) -> Result<(), DaemonError> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.endpoint));
    run_with_transport(home, config, transport).await
}

/// Run the pipeline with an explicit transport (tests use a recording stub).
pub async fn run_with_transport(
    home: PathBuf,
    config: Config,
    transport: Arc<dyn Transport>,
) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;
    let started_at_unix = unix_seconds_now();
    let pipeline_state: SharedState = Arc::new(StdMutex::new(PipelineState::Stopped));

    let state = Arc::new(StateManager::new(
        &config.devices,
        chrono::Duration::minutes(config.ready_ttl_minutes),
    ));
    let publisher = Arc::new(SnapshotPublisher::new(transport.clone()));
    let content = Arc::new(ContentSyncManager::new(config.content.clone(), transport));
    let store = match hash_store::load_at(&home) {
        Ok(store) => store.destinations,
        Err(err) => {
            tracing::warn!(error = %err, "hash store unreadable; starting with empty tracker");
            HashStore::new()
        }
    };
    let hash_store = Arc::new(StdMutex::new(store));
    let counters = Arc::new(Counters::default());

    // Startup protocol: silent backfill, one sweep, then a single flush of
    // one snapshot per device. O(devices) network calls, never O(records).
    set_state(&pipeline_state, PipelineState::Backfilling);
    let tailer = LogTailer::new(&config.log_path, config.log_encoding);
    let tailer = {
        let state = state.clone();
        let publisher = publisher.clone();
        let counters = counters.clone();
        let pipeline_state = pipeline_state.clone();
        tokio::task::spawn_blocking(move || {
            let mut tailer = tailer;
            backfill(&mut tailer, &state, &publisher, &counters);
            set_state(&pipeline_state, PipelineState::Publishing);
            flush_all(&state, &publisher, &counters);
            tailer
        })
        .await
        .map_err(|err| DaemonError::Protocol(format!("startup join error: {err}")))?
    };
    set_state(&pipeline_state, PipelineState::Running);
    let tailer = Arc::new(StdMutex::new(tailer));

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let poll_handle = {
        let shutdown = shutdown_tx.clone();
        let tailer = tailer.clone();
        let state = state.clone();
        let publisher = publisher.clone();
        let counters = counters.clone();
        let interval = Duration::from_millis(config.poll_interval_ms.max(1));
        tokio::spawn(async move {
            let result =
                poll_task(tailer, state, publisher, counters, interval, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let expire_handle = {
        let shutdown = shutdown_tx.clone();
        let state = state.clone();
        let publisher = publisher.clone();
        let counters = counters.clone();
        let interval = Duration::from_secs(config.expire_interval_secs.max(1));
        tokio::spawn(async move {
            let result =
                expire_task(state, publisher, counters, interval, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let content_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let content = content.clone();
        let hash_store = hash_store.clone();
        let counters = counters.clone();
        let interval = Duration::from_secs(config.content_sync_interval_secs.max(1));
        tokio::spawn(async move {
            let result = content_task(
                home,
                content,
                hash_store,
                counters,
                interval,
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let state = state.clone();
        let publisher = publisher.clone();
        let content = content.clone();
        let hash_store = hash_store.clone();
        let counters = counters.clone();
        let pipeline_state = pipeline_state.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                state,
                publisher,
                content,
                hash_store,
                counters,
                pipeline_state,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let pipeline_state = pipeline_state.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping pipeline");
                            set_state(&pipeline_state, PipelineState::Stopping);
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (poll_result, expire_result, content_result, socket_result, signal_result) = tokio::join!(
        poll_handle,
        expire_handle,
        content_handle,
        socket_handle,
        signal_handle
    );

    handle_join("poll", poll_result)?;
    handle_join("expire", expire_result)?;
    handle_join("content_sync", content_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;

    set_state(&pipeline_state, PipelineState::Stopped);
    Ok(())
}

// ---------------------------------------------------------------------------
// Startup protocol
// ---------------------------------------------------------------------------

/// Replay the entire existing log into state without publishing, sweep stale
/// ready orders, and position the tailer after the backfilled content.
///
/// Never fatal: an unreadable log is logged and backfill proceeds empty.
fn backfill(
    tailer: &mut LogTailer,
    state: &StateManager,
    publisher: &SnapshotPublisher,
    counters: &Counters,
) {
    publisher.set_suppressed(true);
    tailer.reset_to_beginning();

    let lines = match tailer.poll() {
        Ok(lines) => lines,
        Err(err) => {
            tracing::warn!(error = %err, "backfill read failed; starting from an empty state");
            counters.note_error(err.to_string());
            Vec::new()
        }
    };
    let line_count = lines.len();
    let mut record_count = 0u64;
    for line in lines {
        counters.lines_read.fetch_add(1, Ordering::Relaxed);
        if let Some(record) = expo_tail::parse(&line) {
            record_count += 1;
            counters.records_applied.fetch_add(1, Ordering::Relaxed);
            // Suppression is on; events are dropped, state is what matters.
            let _ = state.apply(record);
        }
    }

    // Drop already-stale ready orders before they are ever published.
    let _ = state.expire_ready(Utc::now());

    if let Err(err) = tailer.skip_to_end() {
        tracing::warn!(error = %err, "skip-to-end failed; next poll may replay backfilled lines");
        counters.note_error(err.to_string());
    }

    tracing::info!(lines = line_count, records = record_count, "backfill complete");
}

/// Publish exactly one snapshot per configured device.
fn flush_all(state: &StateManager, publisher: &SnapshotPublisher, counters: &Counters) {
    publisher.set_suppressed(false);
    for snapshot in state.snapshot_all() {
        publish_snapshot(publisher, &snapshot, counters);
    }
}

/// The full startup sequence: silent backfill, then one flush per device.
pub fn startup(
    tailer: &mut LogTailer,
    state: &StateManager,
    publisher: &SnapshotPublisher,
    counters: &Counters,
) {
    backfill(tailer, state, publisher, counters);
    flush_all(state, publisher, counters);
}

fn publish_snapshot(
    publisher: &SnapshotPublisher,
    snapshot: &expo_state::Snapshot,
    counters: &Counters,
) {
    match publisher.publish(snapshot) {
        Ok(PublishOutcome::Published) => {
            counters.publishes_ok.fetch_add(1, Ordering::Relaxed);
        }
        Ok(PublishOutcome::Suppressed | PublishOutcome::NoDestination) => {}
        Err(err) => {
            // No retry here: the device's next state change re-publishes.
            tracing::warn!(device = %snapshot.device, error = %err, "publish failed");
            counters.publishes_failed.fetch_add(1, Ordering::Relaxed);
            counters.note_error(format!("publish {}: {err}", snapshot.device));
        }
    }
}

// ---------------------------------------------------------------------------
// Periodic tasks
// ---------------------------------------------------------------------------

async fn poll_task(
    tailer: Arc<StdMutex<LogTailer>>,
    state: Arc<StateManager>,
    publisher: Arc<SnapshotPublisher>,
    counters: Arc<Counters>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let tailer = tailer.clone();
                let state = state.clone();
                let publisher = publisher.clone();
                let counters = counters.clone();
                tokio::task::spawn_blocking(move || {
                    poll_tick(&tailer, &state, &publisher, &counters);
                })
                .await
                .ok(); // tick errors are logged inside; never crash the daemon
            }
        }
    }
    Ok(())
}

/// One log poll: tail, parse, apply, publish each resulting change in order.
fn poll_tick(
    tailer: &StdMutex<LogTailer>,
    state: &StateManager,
    publisher: &SnapshotPublisher,
    counters: &Counters,
) {
    let lines = {
        let mut tailer = tailer.lock().unwrap_or_else(PoisonError::into_inner);
        match tailer.poll() {
            Ok(lines) => lines,
            Err(err) => {
                // Transient: skipped this cycle, the timer retries next tick.
                tracing::warn!(error = %err, "log poll failed");
                counters.note_error(err.to_string());
                return;
            }
        }
    };

    for line in lines {
        counters.lines_read.fetch_add(1, Ordering::Relaxed);
        let Some(record) = expo_tail::parse(&line) else {
            continue;
        };
        counters.records_applied.fetch_add(1, Ordering::Relaxed);
        for event in state.apply(record) {
            publish_snapshot(publisher, &event.snapshot, counters);
        }
    }
}

async fn expire_task(
    state: Arc<StateManager>,
    publisher: Arc<SnapshotPublisher>,
    counters: Arc<Counters>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let state = state.clone();
                let publisher = publisher.clone();
                let counters = counters.clone();
                tokio::task::spawn_blocking(move || {
                    for event in state.expire_ready(Utc::now()) {
                        publish_snapshot(&publisher, &event.snapshot, &counters);
                    }
                })
                .await
                .ok();
            }
        }
    }
    Ok(())
}

async fn content_task(
    home: PathBuf,
    content: Arc<ContentSyncManager>,
    hash_store: Arc<StdMutex<HashStore>>,
    counters: Arc<Counters>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                let content = content.clone();
                let hash_store = hash_store.clone();
                let counters = counters.clone();
                tokio::task::spawn_blocking(move || {
                    content_tick(&home, &content, &hash_store, &counters, false);
                })
                .await
                .ok();
            }
        }
    }
    Ok(())
}

/// One content sync cycle; `force` clears the tracker first.
fn content_tick(
    home: &Path,
    content: &ContentSyncManager,
    hash_store: &StdMutex<HashStore>,
    counters: &Counters,
    force: bool,
) -> expo_sync::CycleSummary {
    let mut store = hash_store.lock().unwrap_or_else(PoisonError::into_inner);
    let summary = if force {
        content.force_sync(&mut store)
    } else {
        content.run_cycle(&mut store)
    };
    counters
        .uploads_ok
        .fetch_add(summary.uploaded as u64, Ordering::Relaxed);
    counters
        .uploads_failed
        .fetch_add(summary.failed as u64, Ordering::Relaxed);
    if summary.failed > 0 {
        counters.note_error(format!("content sync: {summary}"));
    }
    tracing::info!(%summary, force, "content sync cycle complete");

    let file = HashStoreFile {
        synced_at: Utc::now(),
        destinations: store.clone(),
    };
    drop(store);
    if let Err(err) = hash_store::save_at(home, &file) {
        tracing::warn!(error = %err, "failed to persist hash store");
    }
    summary
}

// ---------------------------------------------------------------------------
// Control socket
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn socket_server_task(
    home: PathBuf,
    state: Arc<StateManager>,
    publisher: Arc<SnapshotPublisher>,
    content: Arc<ContentSyncManager>,
    hash_store: Arc<StdMutex<HashStore>>,
    counters: Arc<Counters>,
    pipeline_state: SharedState,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                // Transient (EMFILE and friends): the listener stays up and
                // the next client can still connect.
                let (stream, _) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(socket = %socket.display(), error = %err, "socket accept failed");
                        continue;
                    }
                };
                let home = home.clone();
                let state = state.clone();
                let publisher = publisher.clone();
                let content = content.clone();
                let hash_store = hash_store.clone();
                let counters = counters.clone();
                let pipeline_state = pipeline_state.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        state,
                        publisher,
                        content,
                        hash_store,
                        counters,
                        pipeline_state,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    state: Arc<StateManager>,
    publisher: Arc<SnapshotPublisher>,
    content: Arc<ContentSyncManager>,
    hash_store: Arc<StdMutex<HashStore>>,
    counters: Arc<Counters>,
    pipeline_state: SharedState,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let cmd = request.cmd.clone();
        let response = match cmd.as_str() {
            "status" => DaemonResponse::ok(build_status_payload(
                &home,
                &state,
                &counters,
                &pipeline_state,
                started_at_unix,
            )),
            "sync" | "force-sync" => {
                let home = home.clone();
                let content = content.clone();
                let hash_store = hash_store.clone();
                let counters = counters.clone();
                let force = cmd == "force-sync";
                let summary = tokio::task::spawn_blocking(move || {
                    content_tick(&home, &content, &hash_store, &counters, force)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("content sync join error: {err}")))?;
                DaemonResponse::ok(json!({
                    "attempted": summary.attempted,
                    "uploaded": summary.uploaded,
                    "unchanged": summary.unchanged,
                    "failed": summary.failed,
                }))
            }
            "open" | "close" => {
                mark_device(&state, &publisher, &counters, &request, cmd == "close").await
            }
            "stop" => {
                set_state(&pipeline_state, PipelineState::Stopping);
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn mark_device(
    state: &Arc<StateManager>,
    publisher: &Arc<SnapshotPublisher>,
    counters: &Arc<Counters>,
    request: &DaemonRequest,
    closed: bool,
) -> DaemonResponse {
    let Some(id) = request.device.as_deref() else {
        return DaemonResponse::error("missing 'device' field");
    };
    let device = DeviceId::from(id);
    let Some(event) = state.set_closed(&device, closed) else {
        return DaemonResponse::error(format!("unknown device '{id}'"));
    };

    let publisher = publisher.clone();
    let counters = counters.clone();
    let snapshot = event.snapshot;
    let device_json = json!({ "device": id, "closed": closed });
    tokio::task::spawn_blocking(move || {
        publish_snapshot(&publisher, &snapshot, &counters);
    })
    .await
    .ok();
    DaemonResponse::ok(device_json)
}

fn build_status_payload(
    home: &Path,
    state: &StateManager,
    counters: &Counters,
    pipeline_state: &SharedState,
    started_at_unix: u64,
) -> Value {
    let devices: Vec<Value> = state
        .snapshot_all()
        .iter()
        .map(|snapshot| {
            json!({
                "id": snapshot.device.0,
                "name": snapshot.name,
                "closed": snapshot.closed,
                "preparing": snapshot.preparing.len(),
                "ready": snapshot.ready.len(),
            })
        })
        .collect();

    json!({
        "running": true,
        "label": DAEMON_LABEL,
        "state": current_state(pipeline_state).to_string(),
        "started_at_unix": started_at_unix,
        "devices": devices,
        "counters": counters.as_json(),
        "last_error": counters.last_error(),
        "socket": socket_path(home).display().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [run_dir(home), logs_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
