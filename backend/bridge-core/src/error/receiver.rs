use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ReceiverError {
    #[error("Receiver Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Receiver Join Error: {message} {location}")]
    Join {
        message: String,
        location: ErrorLocation,
    },
}
