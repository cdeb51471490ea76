use std::io::Result as IoResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{Builder as ThreadBuilder, sleep};
use std::time::Duration;

use log::warn;

/// Ends an idle helper process.
///
/// The browser keeps the helper alive as long as the extension port is open,
/// but a crashed extension can leave it orphaned. If a whole window passes
/// without [`Watchdog::touch`], the expiry callback runs once.
pub struct Watchdog {
    activity: Arc<AtomicBool>,
}

impl Watchdog {
    /// Start watching. The thread ends when the watchdog is dropped.
    pub fn spawn<F>(window: Duration, on_idle: F) -> IoResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let activity = Arc::new(AtomicBool::new(true));
        let watched = Arc::downgrade(&activity);

        ThreadBuilder::new()
            .name("nm-watchdog".to_string())
            .spawn(move || watch(watched, window, on_idle))?;

        Ok(Self { activity })
    }

    /// A watchdog with no thread behind it.
    pub fn disarmed() -> Self {
        Self {
            activity: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Record that the browser is still talking to us.
    pub fn touch(&self) {
        self.activity.store(true, Ordering::Release);
    }
}

fn watch<F: FnOnce()>(activity: Weak<AtomicBool>, window: Duration, on_idle: F) {
    loop {
        sleep(window);

        let Some(activity) = activity.upgrade() else {
            return;
        };
        if !activity.swap(false, Ordering::AcqRel) {
            warn!("No message from browser for {window:?}, giving up");
            on_idle();
            return;
        }
    }
}
