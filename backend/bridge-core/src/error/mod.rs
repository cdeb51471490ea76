pub mod config;
pub mod framing;
pub mod queue;
pub mod receiver;

pub use config::ConfigError;
pub use framing::FramingError;
pub use queue::QueueError;
pub use receiver::ReceiverError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Receiver(#[from] ReceiverError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
