//! Helper-process side of the bridge.
//!
//! The browser starts the helper with stdio pipes. The helper reads framed
//! JSON from stdin and forwards each message to the running application's
//! queue. Keepalive frames only reset the [`Watchdog`].

mod watchdog;

pub use watchdog::Watchdog;

use crate::error::framing::FramingError;
use crate::framing::read_frame;
use crate::queue::{QueueBackend, send_message_with_priority};

use std::io::Read;

use log::{debug, info};
use serde_json::Value;

/// `type` of the extension's keepalive frames.
pub const KEEPALIVE_TYPE: &str = "nm_pong";

/// Counters for one helper session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub frames: usize,
    pub keepalives: usize,
    pub forwarded: usize,
    pub dropped: usize,
}

/// Forwards browser frames to the application queue.
pub struct QueueForwarder<B: QueueBackend> {
    backend: B,
    queue_name: String,
    priority: u32,
}

impl<B: QueueBackend> QueueForwarder<B> {
    pub fn new(backend: B, queue_name: impl Into<String>, priority: u32) -> Self {
        Self {
            backend,
            queue_name: queue_name.into(),
            priority,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Best-effort delivery; `false` means the message was dropped.
    pub fn forward(&self, payload: &[u8]) -> bool {
        send_message_with_priority(&self.backend, &self.queue_name, payload, self.priority)
    }
}

fn is_keepalive(frame: &[u8]) -> bool {
    serde_json::from_slice::<Value>(frame)
        .ok()
        .and_then(|root| {
            root.get("type")
                .and_then(Value::as_str)
                .map(|kind| kind == KEEPALIVE_TYPE)
        })
        .unwrap_or(false)
}

/// Pump frames from `reader` until it ends.
///
/// Returns the session counters on clean EOF.
///
/// # Errors
///
/// Returns a [`FramingError`] if the stream breaks mid-frame or announces
/// an oversized frame; the browser side is unusable after that.
pub fn run_host<R, F>(
    reader: &mut R,
    mut forward: F,
    watchdog: &Watchdog,
) -> Result<HostStats, FramingError>
where
    R: Read,
    F: FnMut(&[u8]) -> bool,
{
    let mut stats = HostStats::default();

    while let Some(frame) = read_frame(reader)? {
        watchdog.touch();
        stats.frames += 1;

        if is_keepalive(&frame) {
            stats.keepalives += 1;
            continue;
        }

        if forward(&frame) {
            stats.forwarded += 1;
        } else {
            debug!("Dropped {} byte message from browser", frame.len());
            stats.dropped += 1;
        }
    }

    info!(
        "Browser closed stdin after {} frames ({} forwarded, {} dropped)",
        stats.frames, stats.forwarded, stats.dropped
    );
    Ok(stats)
}
