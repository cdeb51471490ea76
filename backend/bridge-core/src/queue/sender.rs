use crate::MESSAGE_PRIORITY;
use crate::error::queue::QueueError;
use crate::queue::{MessageQueue, QueueBackend};

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, trace};

/// Sender side of the application's queue, held by a helper process.
pub struct QueueSender<Q: MessageQueue> {
    name: String,
    queue: Q,
    priority: u32,
}

impl<Q: MessageQueue> QueueSender<Q> {
    /// Attach to the queue called `name`. Fails if no application created it.
    pub fn open<B>(backend: &B, name: &str) -> Result<Self, QueueError>
    where
        B: QueueBackend<Queue = Q>,
    {
        Ok(Self {
            name: name.to_string(),
            queue: backend.open_only(name)?,
            priority: MESSAGE_PRIORITY,
        })
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue without blocking.
    ///
    /// Payloads above the queue bound are refused here so they are never
    /// truncated on the way in.
    #[track_caller]
    pub fn try_send(&self, payload: &[u8]) -> Result<(), QueueError> {
        let limit = self.queue.max_message_size();
        if payload.len() > limit {
            return Err(QueueError::MessageTooLarge {
                size: payload.len(),
                limit,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.queue.try_send(payload, self.priority)
    }
}

/// Fire-and-forget delivery to a running application.
///
/// Opens the queue, attempts one non-blocking enqueue and closes it again.
/// A missing listener, a full queue or an oversized payload is logged and
/// reported as `false`; nothing is ever raised to the caller.
pub fn send_message<B: QueueBackend>(backend: &B, name: &str, payload: &[u8]) -> bool {
    send_message_with_priority(backend, name, payload, MESSAGE_PRIORITY)
}

/// [`send_message`] with an explicit priority.
pub fn send_message_with_priority<B: QueueBackend>(
    backend: &B,
    name: &str,
    payload: &[u8],
    priority: u32,
) -> bool {
    let result = QueueSender::open(backend, name)
        .and_then(|sender| sender.with_priority(priority).try_send(payload));

    match result {
        Ok(()) => {
            trace!("Sent {} bytes to {name}", payload.len());
            true
        }
        Err(e) => {
            debug!("send to gui process: {e}");
            false
        }
    }
}
