//! Test helpers for receiver integration tests.
//!
//! - Collecting command handler
//! - Queue backends that fail or count on demand
//! - Blocking-mode receiver scenario shared by every backend
//! - Unique queue names per test

use bridge_core::command::{Command, DetachCommand};
use bridge_core::error::QueueError;
use bridge_core::error_slot::IpcErrorSlot;
use bridge_core::queue::{
    MemoryBackend, MemoryQueue, MessageQueue, QueueBackend, QueueSpec, Received, send_message,
};
use bridge_core::receiver::{ReceiverExit, ReceiverSettings, start_receiver};

use common::ErrorLocation;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Long enough for a loaded CI machine, short enough to fail fast.
pub const RECEIVE_WAIT: Duration = Duration::from_secs(5);

/// Poll interval used by receivers under test.
pub const TEST_POLL: Duration = Duration::from_millis(20);

/// Queue name unique to this process and test.
pub fn unique_name(tag: &str) -> String {
    format!("bridge_it_{}_{tag}", std::process::id())
}

/// Poll `condition` until it holds, failing the test after [`RECEIVE_WAIT`].
pub fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + RECEIVE_WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting: {what}");
        sleep(Duration::from_millis(5));
    }
}

/// Handler that forwards every command to a channel.
pub fn collecting_handler() -> (impl Fn(Command) + Send + 'static, Receiver<Command>) {
    let (tx, rx): (Sender<Command>, Receiver<Command>) = channel();
    let handler = move |command: Command| {
        let _ = tx.send(command);
    };
    (handler, rx)
}

/// Memory backend whose `create` always fails, counting every call.
#[derive(Clone, Default)]
pub struct FailingBackend {
    pub creates: Arc<AtomicUsize>,
}

impl QueueBackend for FailingBackend {
    type Queue = MemoryQueue;

    fn open_only(&self, name: &str) -> Result<MemoryQueue, QueueError> {
        MemoryBackend.open_only(name)
    }

    fn create(&self, _name: &str, spec: QueueSpec) -> Result<MemoryQueue, QueueError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Err(QueueError::InvalidSpec {
            message: format!("queue exists with incompatible size, wanted {spec:?}"),
            location: ErrorLocation::caller(),
        })
    }

    fn remove(&self, name: &str) -> Result<bool, QueueError> {
        MemoryBackend.remove(name)
    }
}

/// Memory backend whose queues fail the first `failures` receive attempts.
#[derive(Clone)]
pub struct FlakyBackend {
    failures: usize,
    pub attempts: Arc<AtomicUsize>,
}

impl FlakyBackend {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn wrap(&self, inner: MemoryQueue) -> FlakyQueue {
        FlakyQueue {
            inner,
            failures: self.failures,
            attempts: Arc::clone(&self.attempts),
        }
    }
}

impl QueueBackend for FlakyBackend {
    type Queue = FlakyQueue;

    fn open_only(&self, name: &str) -> Result<FlakyQueue, QueueError> {
        MemoryBackend.open_only(name).map(|queue| self.wrap(queue))
    }

    fn create(&self, name: &str, spec: QueueSpec) -> Result<FlakyQueue, QueueError> {
        MemoryBackend.create(name, spec).map(|queue| self.wrap(queue))
    }

    fn remove(&self, name: &str) -> Result<bool, QueueError> {
        MemoryBackend.remove(name)
    }
}

pub struct FlakyQueue {
    inner: MemoryQueue,
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl FlakyQueue {
    fn count_attempt(&self) -> Result<(), QueueError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(QueueError::InvalidSpec {
                message: format!("receive attempt {attempt} failed"),
                location: ErrorLocation::caller(),
            });
        }
        Ok(())
    }
}

impl MessageQueue for FlakyQueue {
    fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        self.inner.try_send(payload, priority)
    }

    fn receive(&self, buffer: &mut [u8]) -> Result<Received, QueueError> {
        self.count_attempt()?;
        self.inner.receive(buffer)
    }

    fn timed_receive(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Received>, QueueError> {
        self.count_attempt()?;
        self.inner.timed_receive(buffer, timeout)
    }

    fn max_message_size(&self) -> usize {
        self.inner.max_message_size()
    }
}

/// Run a receiver without a poll interval on `backend` through one message
/// and a shutdown.
///
/// Shutdown cannot reach a loop parked in a blocking receive, so it reports
/// [`ReceiverExit::StillBlocking`]. The next message wakes the loop, which is
/// dispatched, after which the loop sees the stop flag and removes the queue.
pub fn assert_blocking_receiver_lifecycle<B>(backend: B, name: &str, spec: QueueSpec)
where
    B: QueueBackend + Clone,
{
    // GIVEN: A receiver that blocks on receive
    let settings = ReceiverSettings {
        queue_name: name.to_string(),
        spec,
        poll_interval: None,
    };
    let errors = IpcErrorSlot::new();
    let (handler, commands) = collecting_handler();
    let handle = start_receiver(backend.clone(), settings, handler, errors.clone())
        .expect("Failed to start receiver");
    wait_until(|| backend.open_only(name).is_ok(), "receiver to create the queue");

    // WHEN: A message arrives
    assert!(send_message(&backend, name, br#"{"action":"detach","winId":"9"}"#));

    // THEN: It is dispatched like in polling mode
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).expect("Missing command"),
        Command::Detach(DetachCommand {
            win_id: Some("9".to_string()),
        })
    );

    // WHEN: Shutting down while the loop waits for the next message
    sleep(Duration::from_millis(50));
    let exit = handle.shutdown().expect("shutdown");

    // THEN: Reported as still blocking, not joined
    assert_eq!(exit, ReceiverExit::StillBlocking);

    // AND: One more message wakes it; it is handled, then the loop ends and removes the queue
    assert!(send_message(&backend, name, br#"{"action":"detach"}"#));
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).expect("Missing wake-up command"),
        Command::Detach(DetachCommand { win_id: None })
    );
    wait_until(
        || matches!(backend.open_only(name), Err(QueueError::NotFound { .. })),
        "stopped receiver to remove the queue",
    );
    assert_eq!(errors.get(), None);
}
