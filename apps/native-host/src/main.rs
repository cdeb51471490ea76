use native_host::cli::HostArgs;
use native_host::error::NativeHostError;
use native_host::logger::{HOST_LOG_FILE_NAME, initialize as LoggerInitialize};

use bridge_core::NATIVE_HOST_NAME;
use bridge_core::host::{QueueForwarder, Watchdog, run_host};
use bridge_core::queue::{DefaultBackend, installation_queue_name};

use common::ErrorLocation;

use std::io::stdin;
use std::panic::Location;
use std::process::{ExitCode, exit};

use clap::Parser;
use log::{error, info};

fn main() -> ExitCode {
    let args = HostArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ NativeHostError::Logger { .. }) => {
            eprintln!("{NATIVE_HOST_NAME}: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{NATIVE_HOST_NAME} stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &HostArgs) -> Result<(), NativeHostError> {
    let log_dir = args.common.prepare_log_dir()?;
    LoggerInitialize(&log_dir, HOST_LOG_FILE_NAME, args.common.level())?;

    info!("{NATIVE_HOST_NAME} starting");
    info!("Browser arguments: {:?}", args.browser_args);

    let config = args.common.load_config();
    let queue_name = installation_queue_name(&config.queue.name_prefix)?;
    let forwarder = QueueForwarder::new(DefaultBackend::default(), queue_name, config.queue.priority);
    info!("Forwarding browser messages to {}", forwarder.queue_name());

    // The browser closing the port normally ends stdin; this covers the cases where it doesn't.
    let watchdog = Watchdog::spawn(config.host.idle_timeout(), || {
        log::logger().flush();
        exit(1);
    })
    .map_err(|e| NativeHostError::Runtime {
        message: format!("Failed to spawn watchdog: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut input = stdin().lock();
    run_host(&mut input, |payload| forwarder.forward(payload), &watchdog)?;

    info!("{NATIVE_HOST_NAME} exiting");
    Ok(())
}
