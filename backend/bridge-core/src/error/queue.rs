use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum QueueError {
    #[error("Queue Not Found Error: {name} {location}")]
    NotFound {
        name: String,
        location: ErrorLocation,
    },

    #[error("Queue Full Error: {name} {location}")]
    Full {
        name: String,
        location: ErrorLocation,
    },

    #[error("Message Too Large Error: {size} bytes exceeds {limit} {location}")]
    MessageTooLarge {
        size: usize,
        limit: usize,
        location: ErrorLocation,
    },

    #[error("Buffer Too Small Error: {size} bytes, queue needs {required} {location}")]
    BufferTooSmall {
        size: usize,
        required: usize,
        location: ErrorLocation,
    },

    /// Kernel queues only accept priorities below [`crate::PRIORITY_LIMIT`].
    #[error("Invalid Priority Error: {priority} must be below {limit} {location}")]
    InvalidPriority {
        priority: u32,
        limit: u32,
        location: ErrorLocation,
    },

    #[error("Invalid Queue Name Error: {message} {location}")]
    InvalidName {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Queue Spec Error: {message} {location}")]
    InvalidSpec {
        message: String,
        location: ErrorLocation,
    },

    #[error("Queue OS Error: {operation}: {message} {location}")]
    Os {
        operation: &'static str,
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

impl QueueError {
    #[track_caller]
    pub(crate) fn os(operation: &'static str, source: IoError) -> Self {
        QueueError::Os {
            operation,
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }
}
