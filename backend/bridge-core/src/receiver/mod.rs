//! Background receive loop of the application.
//!
//! # State machine
//!
//! - **Setup**: remove any stale queue and create a fresh one. Failure is
//!   recorded in the [`IpcErrorSlot`] and ends the loop for good.
//! - **Listening**: receive one message. A receive error is logged and the
//!   loop listens again.
//! - **Dispatching**: decode the bytes and hand the [`Command`] to the
//!   handler, then listen again.
//!
//! With a poll interval the loop uses timed receives and checks a stop flag
//! between attempts, so [`ReceiverHandle::shutdown`] can end it and remove
//! the queue. Without one it blocks indefinitely and only process exit stops it.

use crate::command::Command;
use crate::config::BridgeConfig;
use crate::dispatch::{CommandHandler, Dispatcher};
use crate::error::CoreError;
use crate::error::queue::QueueError;
use crate::error::receiver::ReceiverError;
use crate::error_slot::IpcErrorSlot;
use crate::primary::PrimaryHandle;
use crate::queue::{
    DefaultBackend, QueueBackend, QueueListener, QueueSpec, Received, installation_queue_name,
};

use common::ErrorLocation;

use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{Builder as ThreadBuilder, JoinHandle, sleep};
use std::time::Duration;

use log::{debug, error, info, trace, warn};

const THREAD_NAME: &str = "nm-receiver";

/// Pause after a failed receive so a persistently broken queue cannot spin.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Default interval between stop-flag checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSettings {
    pub queue_name: String,
    pub spec: QueueSpec,
    /// `None` blocks on receive forever.
    pub poll_interval: Option<Duration>,
}

impl ReceiverSettings {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            spec: QueueSpec::default(),
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
        }
    }

    pub fn from_config(config: &BridgeConfig, queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            spec: config.queue.spec(),
            poll_interval: config.receiver.poll_interval(),
        }
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// Queue creation failed; the error slot holds the reason.
    SetupFailed,
    /// Stopped on request; the queue was removed.
    Stopped,
    /// Blocking mode cannot be interrupted; the thread was left running.
    StillBlocking,
}

/// Handle to the running receiver thread.
///
/// Dropping the handle does **not** stop the loop.
pub struct ReceiverHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<ReceiverExit>,
    interruptible: bool,
}

impl ReceiverHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Ask the loop to stop and wait for it.
    ///
    /// In blocking mode the loop cannot observe the request while it waits
    /// on receive, so the thread is left to end with the process.
    pub fn shutdown(self) -> Result<ReceiverExit, ReceiverError> {
        self.stop.store(true, Ordering::Release);

        if !self.interruptible && !self.thread.is_finished() {
            warn!("Receiver blocks without timeout; leaving it to process exit");
            return Ok(ReceiverExit::StillBlocking);
        }

        Self::join_thread(self.thread)
    }

    /// Wait for the loop to end on its own.
    pub fn join(self) -> Result<ReceiverExit, ReceiverError> {
        Self::join_thread(self.thread)
    }

    #[track_caller]
    fn join_thread(thread: JoinHandle<ReceiverExit>) -> Result<ReceiverExit, ReceiverError> {
        let location = ErrorLocation::from(Location::caller());
        thread.join().map_err(|_| ReceiverError::Join {
            message: "receiver thread panicked".to_string(),
            location,
        })
    }
}

/// Start the receiver on its own thread.
///
/// Setup failures do not surface here; they land in `errors` and the
/// thread ends. Only failing to spawn the thread is reported.
///
/// # Errors
///
/// Returns [`ReceiverError::Spawn`] if the OS refuses to create the thread.
#[track_caller]
pub fn start_receiver<B, H>(
    backend: B,
    settings: ReceiverSettings,
    handler: H,
    errors: IpcErrorSlot,
) -> Result<ReceiverHandle, ReceiverError>
where
    B: QueueBackend,
    H: CommandHandler,
{
    let location = ErrorLocation::from(Location::caller());
    let stop = Arc::new(AtomicBool::new(false));
    let interruptible = settings.poll_interval.is_some();

    let thread_stop = Arc::clone(&stop);
    let thread = ThreadBuilder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || run_receiver(backend, settings, handler, errors, thread_stop))
        .map_err(|e| ReceiverError::Spawn {
            message: format!("Failed to spawn {THREAD_NAME}: {e}"),
            location,
            source: e,
        })?;

    Ok(ReceiverHandle {
        stop,
        thread,
        interruptible,
    })
}

/// Application startup hook.
///
/// Derives this installation's queue name, then starts the receiver on the
/// platform's default backend with a [`Dispatcher`] feeding `primary`.
/// Setup failures, including an unresolvable queue name, are recorded in
/// the process-wide [`IpcErrorSlot`].
pub fn start_application_receiver(
    config: &BridgeConfig,
    primary: PrimaryHandle,
) -> Result<ReceiverHandle, CoreError> {
    let errors = IpcErrorSlot::process().clone();

    let queue_name = installation_queue_name(&config.queue.name_prefix).inspect_err(|e| {
        error!("run ipc message queue: {e}");
        errors.set(e.to_string());
    })?;

    let settings = ReceiverSettings::from_config(config, queue_name);
    let handle = start_receiver(
        DefaultBackend::default(),
        settings,
        Dispatcher::new(primary),
        errors,
    )?;

    Ok(handle)
}

fn run_receiver<B, H>(
    backend: B,
    settings: ReceiverSettings,
    handler: H,
    errors: IpcErrorSlot,
    stop: Arc<AtomicBool>,
) -> ReceiverExit
where
    B: QueueBackend,
    H: CommandHandler,
{
    let listener = match QueueListener::create(backend, &settings.queue_name, settings.spec) {
        Ok(listener) => listener,
        Err(e) => {
            error!("run ipc message queue: {e}");
            errors.set(e.to_string());
            return ReceiverExit::SetupFailed;
        }
    };

    info!("Receiver listening on {}", listener.name());

    while !stop.load(Ordering::Acquire) {
        // Fresh buffer per pass; nothing from the previous message survives.
        let mut buffer = vec![0u8; listener.buffer_size()];

        match receive_once(&listener, &mut buffer, settings.poll_interval) {
            Ok(Some(received)) => dispatch_one(&handler, &buffer[..received.size]),
            Ok(None) => {}
            Err(e) => {
                debug!("received from gui process: {e}");
                sleep(RECEIVE_ERROR_BACKOFF);
            }
        }
    }

    if let Err(e) = listener.remove() {
        warn!("Failed to remove queue on shutdown: {e}");
    }
    info!("Receiver stopped");

    ReceiverExit::Stopped
}

fn receive_once<B: QueueBackend>(
    listener: &QueueListener<B>,
    buffer: &mut [u8],
    poll_interval: Option<Duration>,
) -> Result<Option<Received>, QueueError> {
    match poll_interval {
        Some(interval) => listener.timed_receive(buffer, interval),
        None => listener.receive(buffer).map(Some),
    }
}

fn dispatch_one<H: CommandHandler>(handler: &H, bytes: &[u8]) {
    trace!("NM received: {}", String::from_utf8_lossy(bytes));

    let command = Command::decode(bytes);
    if catch_unwind(AssertUnwindSafe(|| handler.handle(command))).is_err() {
        error!("NM command handler panicked; continuing with next message");
    }
}
