use bridge_core::dispatch::Dispatcher;
use bridge_core::error_slot::IpcErrorSlot;
use bridge_core::framing::write_framed;
use bridge_core::host::{HostStats, QueueForwarder, Watchdog, run_host};
use bridge_core::primary::{
    ChannelHandle, ChannelRegistry, InMemoryChannelRegistry, PrimaryContext,
    UnsupportedWindowAttachment,
};
use bridge_core::queue::{MemoryBackend, QueueBackend, QueueSpec};
use bridge_core::receiver::{ReceiverExit, ReceiverSettings, start_receiver};

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde_json::json;

// ============================================================================
// Integration tests for the helper session feeding the application
// Browser stdin bytes → run_host → queue → receiver → dispatcher → primary context
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

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

fn browser_stream(messages: &[serde_json::Value]) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    for message in messages {
        write_framed(&mut bytes, message.to_string().as_bytes()).unwrap();
    }
    Cursor::new(bytes)
}

fn queue_name(tag: &str) -> String {
    format!("native_host_it_{}_{tag}", std::process::id())
}

/// **VALUE**: Verifies a tab switch in the browser ends up as the watched channel in the
/// application, with keepalives filtered out on the way.
///
/// **WHY THIS MATTERS**: This is the user-visible feature end to end, minus the real
/// browser and the real kernel queue.
///
/// **BUG THIS CATCHES**: Would catch keepalives being forwarded (they would decode as
/// unknown actions), or the helper and application disagreeing on message format.
#[test]
fn given_browser_frames_when_host_session_runs_then_application_watches_channel() {
    // GIVEN: An application side listening on a memory queue
    let name = queue_name("pipeline");
    let registry = Arc::new(Mutex::new(InMemoryChannelRegistry::new()));
    let (mut context, primary) = PrimaryContext::new(
        Box::new(SharedRegistry(Arc::clone(&registry))),
        Box::new(UnsupportedWindowAttachment),
        16,
    );
    let settings = ReceiverSettings {
        queue_name: name.clone(),
        spec: QueueSpec::default(),
        poll_interval: Some(Duration::from_millis(20)),
    };
    let receiver = start_receiver(
        MemoryBackend,
        settings,
        Dispatcher::new(primary),
        IpcErrorSlot::new(),
    )
    .unwrap();

    let deadline = Instant::now() + WAIT;
    while MemoryBackend.open_only(&name).is_err() {
        assert!(Instant::now() < deadline, "Queue never created");
        sleep(Duration::from_millis(5));
    }

    // WHEN: The browser sends a keepalive and a select
    let mut stdin = browser_stream(&[
        json!({"type": "nm_pong"}),
        json!({"action": "select", "type": "twitch", "name": "somechannel", "attach": false}),
    ]);
    let forwarder = QueueForwarder::new(MemoryBackend, name.clone(), 1);
    let stats = run_host(
        &mut stdin,
        |payload| forwarder.forward(payload),
        &Watchdog::disarmed(),
    )
    .unwrap();

    // THEN: Only the select was forwarded
    assert_eq!(
        stats,
        HostStats {
            frames: 2,
            keepalives: 1,
            forwarded: 1,
            dropped: 0,
        }
    );

    // AND: The primary context, driven by hand, watches the channel
    let deadline = Instant::now() + WAIT;
    while context.run_pending() == 0 {
        assert!(Instant::now() < deadline, "Select never reached the primary context");
        sleep(Duration::from_millis(5));
    }
    let watching = registry.lock().unwrap().watching_channel().unwrap();
    assert_eq!(watching.name(), "somechannel");

    assert_eq!(receiver.shutdown().unwrap(), ReceiverExit::Stopped);
}

/// **VALUE**: Verifies the helper keeps reading when the application is not running.
///
/// **WHY THIS MATTERS**: Users open the browser long before (or without) the application.
/// The helper must drop messages quietly and stay alive until the browser closes stdin.
#[test]
fn given_no_application_when_host_session_runs_then_messages_dropped_and_eof_is_clean() {
    // GIVEN: No queue with this name exists
    let forwarder = QueueForwarder::new(MemoryBackend, queue_name("absent"), 1);
    let mut stdin = browser_stream(&[
        json!({"action": "select", "type": "twitch", "name": "a"}),
        json!({"action": "detach", "winId": "1"}),
    ]);

    // WHEN
    let stats = run_host(
        &mut stdin,
        |payload| forwarder.forward(payload),
        &Watchdog::disarmed(),
    )
    .unwrap();

    // THEN: Both dropped, session ended normally at EOF
    assert_eq!(stats.forwarded, 0);
    assert_eq!(stats.dropped, 2);
}

/// **VALUE**: Verifies a stream cut mid-frame is an error the binary can exit on.
#[test]
fn given_stream_cut_mid_frame_when_host_session_runs_then_error() {
    // GIVEN: A header announcing 100 bytes followed by 3
    let mut bytes = 100u32.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{\"a");
    let mut stdin = Cursor::new(bytes);

    // WHEN
    let result = run_host(&mut stdin, |_| true, &Watchdog::disarmed());

    // THEN
    assert!(result.is_err());
}
