// Unit tests for the helper-process frame pump

use crate::error::framing::FramingError;
use crate::framing::write_framed;
use crate::host::{HostStats, Watchdog, run_host};

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;

fn stream(frames: &[&[u8]]) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    for frame in frames {
        write_framed(&mut bytes, frame).unwrap();
    }
    Cursor::new(bytes)
}

/// **VALUE**: Verifies every non-keepalive frame is forwarded verbatim, in order, and
/// keepalives are swallowed.
///
/// **WHY THIS MATTERS**: The application parses exactly what the extension sent. Any
/// rewriting in the helper would be a second, untested protocol.
#[test]
fn given_frames_when_host_runs_then_forwarded_verbatim_keepalives_swallowed() {
    // GIVEN: Two commands around a keepalive
    let select = br#"{"action":"select","type":"twitch","name":"a"}"#;
    let keepalive = br#"{"type":"nm_pong"}"#;
    let detach = br#"{"action":"detach","winId":"1"}"#;
    let mut reader = stream(&[select, keepalive, detach]);
    let mut forwarded = Vec::new();

    // WHEN: Running to EOF
    let stats = run_host(
        &mut reader,
        |payload: &[u8]| {
            forwarded.push(payload.to_vec());
            true
        },
        &Watchdog::disarmed(),
    )
    .unwrap();

    // THEN: Two forwarded in order
    assert_eq!(forwarded, vec![select.to_vec(), detach.to_vec()]);
    assert_eq!(
        stats,
        HostStats {
            frames: 3,
            keepalives: 1,
            forwarded: 2,
            dropped: 0,
        }
    );
}

/// **VALUE**: Verifies undeliverable frames are counted as dropped and the session goes on.
#[test]
fn given_failed_forward_when_host_runs_then_dropped_and_continues() {
    let mut reader = stream(&[b"{}", b"{}"]);

    let stats = run_host(&mut reader, |_: &[u8]| false, &Watchdog::disarmed()).unwrap();

    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.forwarded, 0);
}

/// **VALUE**: Verifies a stream cut mid-frame ends the session with an error.
#[test]
fn given_truncated_stream_when_host_runs_then_framing_error() {
    let mut reader = Cursor::new(vec![10u8, 0, 0, 0, b'{']);

    let result = run_host(&mut reader, |_: &[u8]| true, &Watchdog::disarmed());

    assert!(matches!(result, Err(FramingError::Truncated { .. })));
}

/// **VALUE**: Verifies the watchdog fires after an idle window and not while touched.
///
/// **WHY THIS MATTERS**: Without it an orphaned helper lives forever; with a broken
/// `touch` an active helper would be killed mid-session.
#[test]
fn given_watchdog_when_idle_then_fires_and_when_touched_then_not() {
    // GIVEN: Two watchdogs with a short window
    let idle_fired = Arc::new(AtomicBool::new(false));
    let busy_fired = Arc::new(AtomicBool::new(false));
    let idle_flag = Arc::clone(&idle_fired);
    let busy_flag = Arc::clone(&busy_fired);
    let window = Duration::from_millis(100);
    let _idle = Watchdog::spawn(window, move || idle_flag.store(true, Ordering::SeqCst)).unwrap();
    let busy = Watchdog::spawn(window, move || busy_flag.store(true, Ordering::SeqCst)).unwrap();

    // WHEN: Touching only the busy one for several windows
    for _ in 0..40 {
        busy.touch();
        sleep(Duration::from_millis(10));
    }

    // THEN: Only the idle one fired
    assert!(idle_fired.load(Ordering::SeqCst), "Idle watchdog should fire");
    assert!(!busy_fired.load(Ordering::SeqCst), "Touched watchdog should not fire");
}
