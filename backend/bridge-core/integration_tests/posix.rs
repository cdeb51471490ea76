use crate::helpers::{
    RECEIVE_WAIT, assert_blocking_receiver_lifecycle, collecting_handler, unique_name, wait_until,
};

use bridge_core::command::{Command, SelectCommand};
use bridge_core::error::QueueError;
use bridge_core::error_slot::IpcErrorSlot;
use bridge_core::PRIORITY_LIMIT;
use bridge_core::queue::{
    MessageQueue, PosixBackend, QueueBackend, QueueListener, QueueSpec, send_message,
};
use bridge_core::receiver::{ReceiverExit, ReceiverSettings, start_receiver};

use std::time::{Duration, Instant};

// ============================================================================
// Kernel message queue tests
// These need mq_open(3); sandboxes without it skip with a note on stderr
// ============================================================================

/// Small enough for the default unprivileged limits.
const SPEC: QueueSpec = QueueSpec {
    capacity: 2,
    max_message_size: 64,
};

fn mq_available() -> bool {
    let name = unique_name("available");
    match PosixBackend.create(&name, SPEC) {
        Ok(_) => {
            let _ = PosixBackend.remove(&name);
            true
        }
        Err(e) => {
            eprintln!("skipping: POSIX message queues unavailable: {e}");
            false
        }
    }
}

/// **VALUE**: Verifies bytes sent through a kernel queue come back unchanged.
#[test]
fn given_kernel_queue_when_message_sent_then_listener_receives_same_bytes() {
    if !mq_available() {
        return;
    }

    // GIVEN: A fresh listener
    let name = unique_name("roundtrip");
    let listener = QueueListener::create(PosixBackend, &name, SPEC).expect("create");

    // WHEN: Sending one message
    assert!(send_message(&PosixBackend, &name, br#"{"action":"detach","winId":"7"}"#));

    // THEN: The listener receives exactly those bytes
    let mut buffer = vec![0u8; listener.buffer_size()];
    let received = listener
        .timed_receive(&mut buffer, RECEIVE_WAIT)
        .expect("receive")
        .expect("message before timeout");
    assert_eq!(&buffer[..received.size], br#"{"action":"detach","winId":"7"}"#);

    listener.remove().expect("remove");
}

/// **VALUE**: Verifies sending to a missing queue fails without blocking.
///
/// **WHY THIS MATTERS**: The helper runs while the application may be closed. It must
/// drop the message and keep reading the browser.
#[test]
fn given_no_listener_when_sending_then_false_and_not_found() {
    if !mq_available() {
        return;
    }

    // GIVEN: A name nobody created
    let name = unique_name("absent");

    // WHEN / THEN
    assert!(!send_message(&PosixBackend, &name, b"{}"));
    assert!(matches!(
        PosixBackend.open_only(&name),
        Err(QueueError::NotFound { .. })
    ));
}

/// **VALUE**: Verifies a full queue rejects the send immediately.
///
/// **BUG THIS CATCHES**: Would catch the sender opening without `O_NONBLOCK`, which would
/// hang the helper behind a stuck application.
#[test]
fn given_full_queue_when_sending_then_false_promptly() {
    if !mq_available() {
        return;
    }

    // GIVEN: A listener whose queue is filled to capacity
    let name = unique_name("full");
    let listener = QueueListener::create(PosixBackend, &name, SPEC).expect("create");
    for _ in 0..SPEC.capacity {
        assert!(send_message(&PosixBackend, &name, b"{}"));
    }

    // WHEN: Sending one more
    let started = Instant::now();
    let sent = send_message(&PosixBackend, &name, b"{}");

    // THEN: Rejected without waiting for space
    assert!(!sent);
    assert!(started.elapsed() < Duration::from_secs(1));

    listener.remove().expect("remove");
}

/// **VALUE**: Verifies a leftover queue is replaced and its messages discarded.
#[test]
fn given_stale_kernel_queue_when_listener_created_then_queue_is_empty() {
    if !mq_available() {
        return;
    }

    // GIVEN: A queue left behind with a message in it
    let name = unique_name("stale");
    {
        let _stale = PosixBackend.create(&name, SPEC).expect("create stale");
        assert!(send_message(&PosixBackend, &name, b"old"));
    }

    // WHEN: Creating the listener
    let listener = QueueListener::create(PosixBackend, &name, SPEC).expect("create");

    // THEN: Nothing to receive
    let mut buffer = vec![0u8; listener.buffer_size()];
    let received = listener
        .timed_receive(&mut buffer, Duration::from_millis(50))
        .expect("receive");
    assert_eq!(received, None);

    listener.remove().expect("remove");
    assert!(!PosixBackend.remove(&name).expect("second remove"));
}

/// **VALUE**: Verifies the kernel refusing the queue geometry is recorded, not retried.
#[test]
fn given_oversized_geometry_when_receiver_started_then_setup_failed_recorded() {
    if !mq_available() {
        return;
    }

    // GIVEN: A message size beyond any kernel limit
    let name = unique_name("toolarge");
    let settings = ReceiverSettings {
        queue_name: name.clone(),
        spec: QueueSpec {
            capacity: 1,
            max_message_size: 1 << 30,
        },
        poll_interval: Some(Duration::from_millis(20)),
    };
    let errors = IpcErrorSlot::new();
    let (handler, _commands) = collecting_handler();

    // WHEN
    let handle = start_receiver(PosixBackend, settings, handler, errors.clone()).expect("spawn");

    // THEN
    assert_eq!(handle.join().unwrap(), ReceiverExit::SetupFailed);
    assert!(errors.is_set());
}

/// **VALUE**: Verifies the kernel queue and the memory queue agree on the priority ceiling.
///
/// **BUG THIS CATCHES**: Would catch an out-of-range priority reaching `mq_send`, where it
/// fails with a bare `EINVAL` instead of a typed error.
#[test]
fn given_priority_at_limit_when_sending_then_invalid_priority() {
    if !mq_available() {
        return;
    }

    // GIVEN: A listener and a sender
    let name = unique_name("priority");
    let listener = QueueListener::create(PosixBackend, &name, SPEC).expect("create");
    let sender = PosixBackend.open_only(&name).expect("open");

    // WHEN / THEN
    assert!(matches!(
        sender.try_send(b"{}", PRIORITY_LIMIT),
        Err(QueueError::InvalidPriority { .. })
    ));
    assert!(sender.try_send(b"{}", PRIORITY_LIMIT - 1).is_ok());

    listener.remove().expect("remove");
}

/// **VALUE**: Verifies the receive loop end to end over a kernel queue: setup, decode,
/// dispatch and removal on shutdown.
///
/// **WHY THIS MATTERS**: This is the production path on Linux; the memory backend cannot
/// show that `mq_timedreceive` deadlines and buffer sizing work.
#[test]
fn given_polling_receiver_on_kernel_queue_when_select_sent_then_dispatched_and_queue_removed() {
    if !mq_available() {
        return;
    }

    // GIVEN: A polling receiver
    let name = unique_name("receiver");
    let settings = ReceiverSettings {
        queue_name: name.clone(),
        spec: SPEC,
        poll_interval: Some(Duration::from_millis(20)),
    };
    let errors = IpcErrorSlot::new();
    let (handler, commands) = collecting_handler();
    let handle =
        start_receiver(PosixBackend, settings, handler, errors.clone()).expect("spawn");
    wait_until(|| PosixBackend.open_only(&name).is_ok(), "receiver to create the queue");

    // WHEN
    assert!(send_message(
        &PosixBackend,
        &name,
        br#"{"action":"select","type":"twitch","name":"chan"}"#,
    ));

    // THEN
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).expect("Missing command"),
        Command::Select(SelectCommand {
            channel_type: Some("twitch".to_string()),
            name: Some("chan".to_string()),
            ..SelectCommand::default()
        })
    );
    assert_eq!(handle.shutdown().expect("shutdown"), ReceiverExit::Stopped);
    assert_eq!(errors.get(), None);
    assert!(matches!(
        PosixBackend.open_only(&name),
        Err(QueueError::NotFound { .. })
    ));
}

/// **VALUE**: Verifies the blocking mode over a kernel queue.
#[test]
fn given_blocking_receiver_on_kernel_queue_when_message_sent_then_dispatched_and_still_blocking()
{
    if !mq_available() {
        return;
    }

    let name = unique_name("blocking");
    assert_blocking_receiver_lifecycle(PosixBackend, &name, SPEC);
    let _ = PosixBackend.remove(&name);
}
