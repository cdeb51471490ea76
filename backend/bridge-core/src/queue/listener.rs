use crate::error::queue::QueueError;
use crate::queue::{MessageQueue, QueueBackend, QueueSpec, Received};

use std::time::Duration;

use log::{debug, info};

/// Listener side of the queue. Only the application creates one.
///
/// The listener owns the queue's lifecycle: it removes whatever a crashed
/// predecessor left behind, creates a fresh queue, and removes it again on
/// [`QueueListener::remove`].
pub struct QueueListener<B: QueueBackend> {
    backend: B,
    name: String,
    spec: QueueSpec,
    queue: B::Queue,
}

impl<B: QueueBackend> QueueListener<B> {
    /// Remove any stale queue called `name`, then create a fresh one.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the receiver: the stale queue could not
    /// be removed or the new one could not be created.
    pub fn create(backend: B, name: &str, spec: QueueSpec) -> Result<Self, QueueError> {
        if backend.remove(name)? {
            info!("Removed stale queue {name}");
        }

        let queue = backend.create(name, spec)?;
        info!(
            "Created queue {name} ({} slots x {} bytes)",
            spec.capacity, spec.max_message_size
        );

        Ok(Self {
            backend,
            name: name.to_string(),
            spec,
            queue,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> QueueSpec {
        self.spec
    }

    /// Size of the buffer each receive attempt needs.
    pub fn buffer_size(&self) -> usize {
        self.queue.max_message_size().max(self.spec.max_message_size)
    }

    /// Block until a message arrives.
    pub fn receive(&self, buffer: &mut [u8]) -> Result<Received, QueueError> {
        self.queue.receive(buffer)
    }

    /// Receive with a timeout; `Ok(None)` if nothing arrived in time.
    pub fn timed_receive(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Received>, QueueError> {
        self.queue.timed_receive(buffer, timeout)
    }

    /// Remove the queue name and close the listener.
    pub fn remove(self) -> Result<(), QueueError> {
        let removed = self.backend.remove(&self.name)?;
        debug!("Queue {} removed (present: {removed})", self.name);
        Ok(())
    }
}
