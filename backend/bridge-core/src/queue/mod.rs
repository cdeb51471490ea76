//! Named OS message queue transport.
//!
//! The application creates the queue and listens on it; helper processes
//! open it by name and push best-effort messages. Message boundaries come
//! from the queue itself, so payloads are raw JSON bytes with no framing.
//!
//! # Backends
//!
//! - [`PosixBackend`] (Linux): kernel POSIX message queues, visible across processes
//! - [`MemoryBackend`]: process-local queues with the same failure semantics
//!
//! [`DefaultBackend`] picks the cross-process backend where the platform has one.

mod listener;
mod memory;
pub mod name;
#[cfg(target_os = "linux")]
mod posix;
mod sender;

pub use listener::QueueListener;
pub use memory::{MemoryBackend, MemoryQueue};
pub use name::{installation_queue_name, queue_name};
#[cfg(target_os = "linux")]
pub use posix::{PosixBackend, PosixQueue};
pub use sender::{QueueSender, send_message, send_message_with_priority};

use crate::error::queue::QueueError;
use crate::{MESSAGE_SIZE, PRIORITY_LIMIT, QUEUE_CAPACITY};

use common::ErrorLocation;

use std::time::Duration;

#[cfg(target_os = "linux")]
pub type DefaultBackend = PosixBackend;

#[cfg(not(target_os = "linux"))]
pub type DefaultBackend = MemoryBackend;

/// Refuse priorities the kernel would reject, on every backend alike.
#[track_caller]
pub(crate) fn check_priority(priority: u32) -> Result<(), QueueError> {
    if priority >= PRIORITY_LIMIT {
        return Err(QueueError::InvalidPriority {
            priority,
            limit: PRIORITY_LIMIT,
            location: ErrorLocation::caller(),
        });
    }
    Ok(())
}

/// Geometry of a queue, fixed when the listener creates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSpec {
    /// Number of message slots.
    pub capacity: usize,
    /// Largest message the queue accepts, in bytes.
    pub max_message_size: usize,
}

impl Default for QueueSpec {
    fn default() -> Self {
        Self {
            capacity: QUEUE_CAPACITY,
            max_message_size: MESSAGE_SIZE,
        }
    }
}

/// Result of one successful receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Bytes written into the caller's buffer.
    pub size: usize,
    /// Priority the sender attached. Unused downstream.
    pub priority: u32,
}

/// One opened queue, either as sender or listener.
pub trait MessageQueue: Send {
    /// Enqueue without blocking.
    ///
    /// Fails with [`QueueError::Full`] when no slot is free,
    /// [`QueueError::MessageTooLarge`] when `payload` exceeds the queue bound
    /// and [`QueueError::InvalidPriority`] at or above [`crate::PRIORITY_LIMIT`].
    fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError>;

    /// Block until a message arrives and copy it into `buffer`.
    ///
    /// `buffer` must be at least [`MessageQueue::max_message_size`] bytes.
    fn receive(&self, buffer: &mut [u8]) -> Result<Received, QueueError>;

    /// Like [`MessageQueue::receive`], returning `Ok(None)` once `timeout` elapses.
    fn timed_receive(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Received>, QueueError>;

    fn max_message_size(&self) -> usize;
}

/// Opens, creates and removes queues by name.
pub trait QueueBackend: Send + Sync + 'static {
    type Queue: MessageQueue + 'static;

    /// Attach to an existing queue. Fails with [`QueueError::NotFound`] if absent.
    fn open_only(&self, name: &str) -> Result<Self::Queue, QueueError>;

    /// Create the queue, or open it if another creator raced us.
    fn create(&self, name: &str, spec: QueueSpec) -> Result<Self::Queue, QueueError>;

    /// Remove the queue name. Returns `false` if nothing was there.
    fn remove(&self, name: &str) -> Result<bool, QueueError>;
}
