use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FramingError {
    #[error("Frame Too Large Error: {size} bytes exceeds {limit} {location}")]
    FrameTooLarge {
        size: usize,
        limit: usize,
        location: ErrorLocation,
    },

    #[error("Truncated Frame Error: {message} {location}")]
    Truncated {
        message: String,
        location: ErrorLocation,
    },

    #[error("Stream Error: {message} {location}")]
    Stream {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

impl From<IoError> for FramingError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        if error.kind() == ErrorKind::UnexpectedEof {
            return FramingError::Truncated {
                message: error.to_string(),
                location,
            };
        }
        FramingError::Stream {
            message: error.to_string(),
            location,
            source: error,
        }
    }
}
