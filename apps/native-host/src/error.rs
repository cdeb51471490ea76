use bridge_core::error::{ConfigError, CoreError, FramingError, QueueError, ReceiverError};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors that end one of the binaries.
///
/// Library errors keep their own location; the variant here records where
/// the binary gave up on them.
#[derive(Debug, Error)]
pub enum NativeHostError {
    /// Logging could not be set up
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    /// Config or log directory could not be resolved or created
    #[error("Directory Error: {message} {location}")]
    Directory {
        message: String,
        location: ErrorLocation,
    },

    /// Error from bridge-core (queue, framing, receiver, config)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// The async runtime failed to start or to wait for a signal
    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },
}

macro_rules! core_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for NativeHostError {
                #[track_caller]
                fn from(error: $source) -> Self {
                    NativeHostError::Core {
                        message: error.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    }
                }
            }
        )+
    };
}

core_error_from!(CoreError, ConfigError, FramingError, QueueError, ReceiverError);
