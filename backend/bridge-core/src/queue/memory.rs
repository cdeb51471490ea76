use crate::error::queue::QueueError;
use crate::queue::{MessageQueue, QueueBackend, QueueSpec, Received, check_priority};

use common::ErrorLocation;

use std::collections::{HashMap, VecDeque};
use std::panic::Location;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Process-wide name table. Removing a name leaves already-opened handles
/// working against the orphaned queue, as unlinking a kernel queue does.
static REGISTRY: Lazy<Mutex<HashMap<String, Arc<Shared>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

struct Slot {
    priority: u32,
    payload: Vec<u8>,
}

struct Shared {
    name: String,
    spec: QueueSpec,
    slots: Mutex<VecDeque<Slot>>,
    available: Condvar,
}

impl Shared {
    fn lock_slots(&self) -> MutexGuard<'_, VecDeque<Slot>> {
        // A panicking sender cannot leave a half-inserted slot behind.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_registry() -> MutexGuard<'static, HashMap<String, Arc<Shared>>> {
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-process queue backend.
///
/// Used by tests and on platforms without POSIX message queues. Queues are
/// only visible inside the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackend;

impl QueueBackend for MemoryBackend {
    type Queue = MemoryQueue;

    #[track_caller]
    fn open_only(&self, name: &str) -> Result<MemoryQueue, QueueError> {
        lock_registry()
            .get(name)
            .cloned()
            .map(|shared| MemoryQueue { shared })
            .ok_or_else(|| QueueError::NotFound {
                name: name.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn create(&self, name: &str, spec: QueueSpec) -> Result<MemoryQueue, QueueError> {
        if name.is_empty() {
            return Err(QueueError::InvalidName {
                message: "queue name is empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if spec.capacity == 0 || spec.max_message_size == 0 {
            return Err(QueueError::InvalidSpec {
                message: format!("invalid geometry for {name}: {spec:?}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut registry = lock_registry();
        let shared = registry
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Shared {
                    name: name.to_string(),
                    spec,
                    slots: Mutex::new(VecDeque::with_capacity(spec.capacity)),
                    available: Condvar::new(),
                })
            })
            .clone();

        Ok(MemoryQueue { shared })
    }

    fn remove(&self, name: &str) -> Result<bool, QueueError> {
        Ok(lock_registry().remove(name).is_some())
    }
}

/// Handle to one in-process queue.
#[derive(Clone)]
pub struct MemoryQueue {
    shared: Arc<Shared>,
}

impl MemoryQueue {
    /// Messages currently waiting.
    pub fn len(&self) -> usize {
        self.shared.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, slots: &mut VecDeque<Slot>, buffer: &mut [u8]) -> Option<Received> {
        let slot = slots.pop_front()?;
        buffer[..slot.payload.len()].copy_from_slice(&slot.payload);
        Some(Received {
            size: slot.payload.len(),
            priority: slot.priority,
        })
    }

    #[track_caller]
    fn check_buffer(&self, buffer: &[u8]) -> Result<(), QueueError> {
        if buffer.len() < self.shared.spec.max_message_size {
            return Err(QueueError::BufferTooSmall {
                size: buffer.len(),
                required: self.shared.spec.max_message_size,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

impl MessageQueue for MemoryQueue {
    #[track_caller]
    fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        check_priority(priority)?;

        let spec = self.shared.spec;
        if payload.len() > spec.max_message_size {
            return Err(QueueError::MessageTooLarge {
                size: payload.len(),
                limit: spec.max_message_size,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut slots = self.shared.lock_slots();
        if slots.len() >= spec.capacity {
            return Err(QueueError::Full {
                name: self.shared.name.clone(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Higher priority first, FIFO among equals.
        let index = slots
            .iter()
            .position(|slot| slot.priority < priority)
            .unwrap_or(slots.len());
        slots.insert(
            index,
            Slot {
                priority,
                payload: payload.to_vec(),
            },
        );
        drop(slots);

        self.shared.available.notify_one();
        Ok(())
    }

    #[track_caller]
    fn receive(&self, buffer: &mut [u8]) -> Result<Received, QueueError> {
        self.check_buffer(buffer)?;

        let mut slots = self.shared.lock_slots();
        loop {
            if let Some(received) = self.take(&mut slots, buffer) {
                return Ok(received);
            }
            slots = self
                .shared
                .available
                .wait(slots)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    #[track_caller]
    fn timed_receive(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Received>, QueueError> {
        self.check_buffer(buffer)?;

        let deadline = Instant::now() + timeout;
        let mut slots = self.shared.lock_slots();
        loop {
            if let Some(received) = self.take(&mut slots, buffer) {
                return Ok(Some(received));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            slots = self
                .shared
                .available
                .wait_timeout(slots, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    fn max_message_size(&self) -> usize {
        self.shared.spec.max_message_size
    }
}
