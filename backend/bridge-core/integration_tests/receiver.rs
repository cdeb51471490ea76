use crate::helpers::{
    FailingBackend, FlakyBackend, RECEIVE_WAIT, TEST_POLL, assert_blocking_receiver_lifecycle,
    collecting_handler, unique_name, wait_until,
};

use bridge_core::command::{Command, DetachCommand, SelectCommand, UnknownCommand};
use bridge_core::dispatch::Dispatcher;
use bridge_core::error::QueueError;
use bridge_core::error_slot::IpcErrorSlot;
use bridge_core::primary::{
    ChannelHandle, ChannelRegistry, InMemoryChannelRegistry, PrimaryContext,
    UnsupportedWindowAttachment,
};
use bridge_core::queue::{MemoryBackend, QueueBackend, QueueSpec, send_message};
use bridge_core::receiver::{ReceiverExit, ReceiverSettings, start_receiver};

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};

// ============================================================================
// Public API tests for the receiver loop
// These test the PUBLIC interface from an external consumer's perspective
// ============================================================================

fn settings(name: &str) -> ReceiverSettings {
    ReceiverSettings {
        queue_name: name.to_string(),
        spec: QueueSpec::default(),
        poll_interval: Some(TEST_POLL),
    }
}

/// Retry until the receiver has created the queue.
fn wait_for_queue(name: &str) {
    let deadline = Instant::now() + RECEIVE_WAIT;
    while MemoryBackend.open_only(name).is_err() {
        assert!(Instant::now() < deadline, "Receiver never created {name}");
        sleep(Duration::from_millis(5));
    }
}

/// **VALUE**: Verifies every payload sent while the receiver listens is decoded and handed
/// to the handler exactly once, in send order.
///
/// **WHY THIS MATTERS**: This is the whole bridge: browser tab switches arrive as a
/// stream of selects and must be applied in order.
///
/// **BUG THIS CATCHES**: Would catch reused buffers leaking bytes between messages,
/// duplicate delivery, or reordering.
#[test]
fn given_running_receiver_when_messages_sent_then_each_dispatched_once_in_order() {
    // GIVEN: A receiver on a unique queue
    let name = unique_name("order");
    let (handler, commands) = collecting_handler();
    let handle = start_receiver(MemoryBackend, settings(&name), handler, IpcErrorSlot::new())
        .expect("Failed to start receiver");
    wait_for_queue(&name);

    // WHEN: Sending a long then a short message, then a detach
    let sent = vec![
        Command::Select(SelectCommand {
            channel_type: Some("twitch".to_string()),
            name: Some("a_rather_long_channel_name".to_string()),
            ..SelectCommand::default()
        }),
        Command::Select(SelectCommand {
            channel_type: Some("twitch".to_string()),
            name: Some("b".to_string()),
            ..SelectCommand::default()
        }),
        Command::Detach(DetachCommand {
            win_id: Some("3".to_string()),
        }),
    ];
    for command in &sent {
        assert!(send_message(&MemoryBackend, &name, &command.encode()));
    }

    // THEN: Received exactly once each, in order
    let received: Vec<Command> = (0..sent.len())
        .map(|_| commands.recv_timeout(RECEIVE_WAIT).expect("Missing command"))
        .collect();
    assert_eq!(received, sent);
    assert!(
        commands.recv_timeout(Duration::from_millis(100)).is_err(),
        "No duplicates expected"
    );

    // AND: Shutdown stops the loop and removes the queue
    assert_eq!(handle.shutdown().unwrap(), ReceiverExit::Stopped);
    assert!(matches!(
        MemoryBackend.open_only(&name),
        Err(QueueError::NotFound { .. })
    ));
}

/// **VALUE**: Verifies garbage on the queue becomes `Unknown` and the loop keeps going.
///
/// **WHY THIS MATTERS**: Any local process can write to the queue. One bad message must
/// not take the bridge down.
#[test]
fn given_garbage_message_when_received_then_unknown_and_loop_continues() {
    // GIVEN: A running receiver
    let name = unique_name("garbage");
    let (handler, commands) = collecting_handler();
    let handle = start_receiver(MemoryBackend, settings(&name), handler, IpcErrorSlot::new())
        .expect("Failed to start receiver");
    wait_for_queue(&name);

    // WHEN: Sending garbage then a valid command
    assert!(send_message(&MemoryBackend, &name, b"\x00\x01 not json"));
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"detach"}"#));

    // THEN: Unknown, then the detach
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).unwrap(),
        Command::Unknown(UnknownCommand { action: None })
    );
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).unwrap(),
        Command::Detach(DetachCommand { win_id: None })
    );
    handle.shutdown().unwrap();
}

/// **VALUE**: Verifies a panicking handler does not end the loop.
///
/// **BUG THIS CATCHES**: Would catch the per-message `catch_unwind` being removed, which
/// would silently kill the receiver thread on the first bad dispatch.
#[test]
fn given_panicking_handler_when_messages_received_then_next_message_still_handled() {
    // GIVEN: A handler that panics on the first message only
    let name = unique_name("panic");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_handler = Arc::clone(&seen);
    let handler = move |command: Command| {
        let mut seen = seen_by_handler.lock().unwrap_or_else(|p| p.into_inner());
        seen.push(command.action().map(str::to_string));
        if seen.len() == 1 {
            drop(seen);
            panic!("handler failure on first message");
        }
    };
    let handle = start_receiver(MemoryBackend, settings(&name), handler, IpcErrorSlot::new())
        .expect("Failed to start receiver");
    wait_for_queue(&name);

    // WHEN: Sending two messages
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"first"}"#));
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"second"}"#));

    // THEN: Both were handled and the loop is alive
    let deadline = Instant::now() + RECEIVE_WAIT;
    while seen.lock().unwrap_or_else(|p| p.into_inner()).len() < 2 {
        assert!(Instant::now() < deadline, "Second message never handled");
        sleep(Duration::from_millis(5));
    }
    assert!(!handle.is_finished());
    assert_eq!(handle.shutdown().unwrap(), ReceiverExit::Stopped);
}

/// **VALUE**: Verifies failed receives are survived: the loop backs off, listens again
/// and still delivers the next message.
///
/// **WHY THIS MATTERS**: Only setup failures are fatal. A transient receive error must
/// neither end browser integration nor show up in the error slot.
///
/// **BUG THIS CATCHES**: Would catch a receive error breaking out of the loop or being
/// recorded as if the queue were unusable.
#[test]
fn given_failing_receives_when_message_sent_then_loop_survives_and_error_slot_empty() {
    // GIVEN: A receiver whose first three receive attempts fail
    let name = unique_name("flaky");
    let backend = FlakyBackend::new(3);
    let attempts = Arc::clone(&backend.attempts);
    let errors = IpcErrorSlot::new();
    let (handler, commands) = collecting_handler();
    let handle = start_receiver(backend, settings(&name), handler, errors.clone())
        .expect("Failed to start receiver");
    wait_until(|| attempts.load(Ordering::SeqCst) >= 3, "failed receives to be retried");

    // WHEN: Sending after the failures
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"detach","winId":"4"}"#));

    // THEN: Delivered, slot untouched, loop still running
    assert_eq!(
        commands.recv_timeout(RECEIVE_WAIT).expect("Missing command"),
        Command::Detach(DetachCommand {
            win_id: Some("4".to_string()),
        })
    );
    assert!(attempts.load(Ordering::SeqCst) > 3);
    assert_eq!(errors.get(), None);
    assert!(!handle.is_finished());
    assert_eq!(handle.shutdown().unwrap(), ReceiverExit::Stopped);
}

/// **VALUE**: Verifies the blocking mode (no poll interval) delivers messages and that
/// shutdown reports it cannot interrupt the wait.
///
/// **BUG THIS CATCHES**: Would catch `shutdown` hanging on a join that can never return,
/// or the blocking receive path dropping messages.
#[test]
fn given_blocking_receiver_when_message_sent_then_dispatched_and_shutdown_reports_still_blocking()
{
    let name = unique_name("blocking");
    assert_blocking_receiver_lifecycle(MemoryBackend, &name, QueueSpec::default());
}

/// **VALUE**: Verifies a failed queue creation lands in the error slot and the loop ends
/// without ever trying to receive.
///
/// **WHY THIS MATTERS**: The error slot is the only way the UI learns that browser
/// integration is down.
///
/// **BUG THIS CATCHES**: Would catch the loop retrying creation, or continuing into
/// receive without a queue.
#[test]
fn given_failing_queue_creation_when_receiver_started_then_error_recorded_and_loop_ends() {
    // GIVEN: A backend that refuses to create queues
    let name = unique_name("fatal");
    let backend = FailingBackend::default();
    let creates = Arc::clone(&backend.creates);
    let errors = IpcErrorSlot::new();
    let (handler, commands) = collecting_handler();

    // WHEN: Starting the receiver and waiting for it
    let handle = start_receiver(backend, settings(&name), handler, errors.clone())
        .expect("Thread should spawn");
    let exit = handle.join().unwrap();

    // THEN: Setup failed once, error recorded, nothing received
    assert_eq!(exit, ReceiverExit::SetupFailed);
    assert_eq!(creates.load(Ordering::SeqCst), 1, "No retries");
    let message = errors.get().expect("Error slot should be set");
    assert!(message.contains("incompatible size"), "got: {message}");
    assert!(commands.try_recv().is_err());
}

/// **VALUE**: Verifies a receiver starting over a stale queue removes it and starts clean.
///
/// **WHY THIS MATTERS**: After a crash, the previous instance's queue still exists and
/// may hold messages addressed to a UI that no longer exists.
#[test]
fn given_stale_queue_when_receiver_started_then_stale_messages_not_delivered() {
    // GIVEN: A leftover queue with an old message
    let name = unique_name("stale");
    let stale = MemoryBackend
        .create(&name, QueueSpec::default())
        .expect("Failed to create stale queue");
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"stale"}"#));
    drop(stale);

    // WHEN: Starting a receiver
    let errors = IpcErrorSlot::new();
    let (handler, commands) = collecting_handler();
    let handle = start_receiver(MemoryBackend, settings(&name), handler, errors.clone())
        .expect("Failed to start receiver");
    // The stale queue holds one message; the replacement starts empty.
    let deadline = Instant::now() + RECEIVE_WAIT;
    while !MemoryBackend
        .open_only(&name)
        .is_ok_and(|queue| queue.is_empty())
    {
        assert!(Instant::now() < deadline, "Stale queue never replaced");
        sleep(Duration::from_millis(5));
    }
    assert!(send_message(&MemoryBackend, &name, br#"{"action":"fresh"}"#));

    // THEN: Only the fresh message arrives and no error was recorded
    let first = commands.recv_timeout(RECEIVE_WAIT).unwrap();
    assert_eq!(first.action(), Some("fresh"));
    assert_eq!(errors.get(), None);
    handle.shutdown().unwrap();
}

/// **VALUE**: Verifies the full application path: queue → receiver → dispatcher →
/// primary context actor → channel registry.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_full_pipeline_when_select_sent_then_channel_watched_on_primary_context() {
    // GIVEN: Primary context with a shared registry we can inspect afterwards
    struct SharedRegistry(Arc<Mutex<InMemoryChannelRegistry>>);
    impl ChannelRegistry for SharedRegistry {
        fn get_or_add_channel(&mut self, name: &str) -> ChannelHandle {
            self.0.lock().unwrap().get_or_add_channel(name)
        }
        fn watching_channel(&self) -> Option<ChannelHandle> {
            self.0.lock().unwrap().watching_channel()
        }
        fn set_watching_channel(&mut self, channel: ChannelHandle) {
            self.0.lock().unwrap().set_watching_channel(channel)
        }
    }
    let registry = Arc::new(Mutex::new(InMemoryChannelRegistry::new()));
    let (context, primary) = PrimaryContext::new(
        Box::new(SharedRegistry(Arc::clone(&registry))),
        Box::new(UnsupportedWindowAttachment),
        16,
    );
    let actor = context.spawn();

    let name = unique_name("pipeline");
    let handle = start_receiver(
        MemoryBackend,
        settings(&name),
        Dispatcher::new(primary),
        IpcErrorSlot::new(),
    )
    .expect("Failed to start receiver");
    wait_for_queue(&name);

    // WHEN: The helper side sends a select
    assert!(send_message(
        &MemoryBackend,
        &name,
        br#"{"action":"select","type":"twitch","name":"somechannel","attach":false}"#,
    ));

    // THEN: The primary context watches the channel
    let deadline = Instant::now() + RECEIVE_WAIT;
    loop {
        let watching = registry.lock().unwrap().watching_channel();
        if let Some(channel) = watching {
            assert_eq!(channel.name(), "somechannel");
            break;
        }
        assert!(Instant::now() < deadline, "Channel never watched");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(registry.lock().unwrap().len(), 1);

    // AND: Shutting down the receiver drops the last handle, so the actor ends
    assert_eq!(handle.shutdown().unwrap(), ReceiverExit::Stopped);
    tokio::time::timeout(RECEIVE_WAIT, actor)
        .await
        .expect("Actor should stop")
        .unwrap();
}
