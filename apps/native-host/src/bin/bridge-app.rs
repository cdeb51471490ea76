use native_host::cli::AppArgs;
use native_host::error::NativeHostError;
use native_host::logger::{APP_LOG_FILE_NAME, initialize as LoggerInitialize};

use bridge_core::error_slot::get_ipc_error;
use bridge_core::primary::{InMemoryChannelRegistry, PrimaryContext, UnsupportedWindowAttachment};
use bridge_core::receiver::{ReceiverExit, start_application_receiver};

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::signal::ctrl_c;
use tokio::task::spawn_blocking;
use tokio::time::{sleep, timeout};

/// Time the receiver gets to create its queue before the error slot is checked.
const STARTUP_GRACE: Duration = Duration::from_millis(200);

/// How long the primary context may take to drain after the receiver stops.
const ACTOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> ExitCode {
    let args = AppArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ NativeHostError::Logger { .. }) => {
            eprintln!("bridge-app: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("bridge-app stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: AppArgs) -> Result<(), NativeHostError> {
    let log_dir = args.common.prepare_log_dir()?;
    LoggerInitialize(&log_dir, APP_LOG_FILE_NAME, args.common.level())?;

    info!("Bridge application starting");
    info!("Log directory: {}", log_dir.display());

    let config = args.common.load_config();

    let (context, primary) = PrimaryContext::new(
        Box::new(InMemoryChannelRegistry::new()),
        Box::new(UnsupportedWindowAttachment),
        config.receiver.task_capacity,
    );
    let actor = context.spawn();

    // A failed start leaves the application running without browser integration.
    let receiver = match start_application_receiver(&config, primary) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Browser integration unavailable: {e}");
            None
        }
    };

    sleep(STARTUP_GRACE).await;
    match get_ipc_error() {
        Some(message) => warn!("IPC error: {message}"),
        None => info!("Listening for browser commands"),
    }

    ctrl_c().await.map_err(|e| NativeHostError::Runtime {
        message: format!("Failed to wait for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    info!("Shutting down");

    if let Some(receiver) = receiver {
        let exit = spawn_blocking(move || receiver.shutdown())
            .await
            .map_err(|e| NativeHostError::Runtime {
                message: format!("Receiver shutdown task failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })??;

        if exit == ReceiverExit::StillBlocking {
            // The blocked receiver still holds a handle; the actor would wait forever.
            actor.abort();
            return Ok(());
        }
    }

    if timeout(ACTOR_DRAIN_TIMEOUT, actor).await.is_err() {
        warn!("Primary context did not stop in {ACTOR_DRAIN_TIMEOUT:?}");
    }

    info!("Bridge application stopped");
    Ok(())
}
