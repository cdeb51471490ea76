//! Process-wide record of the receiver's fatal setup failure.
//!
//! Lifecycle: empty at process start, written by the receiver thread when it
//! cannot create its queue, read by anything that reports IPC health. There
//! is no reset; the receiver does not restart, so only a new process clears it.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

static PROCESS_SLOT: Lazy<IpcErrorSlot> = Lazy::new(IpcErrorSlot::new);

/// Shared last-error cell. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct IpcErrorSlot {
    message: Arc<RwLock<Option<String>>>,
}

impl IpcErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot shared by the whole process.
    pub fn process() -> &'static IpcErrorSlot {
        &PROCESS_SLOT
    }

    /// Overwrite the slot. Last write wins.
    pub fn set(&self, message: impl Into<String>) {
        let mut slot = self
            .message
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(message.into());
    }

    pub fn get(&self) -> Option<String> {
        self.message
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

/// Fatal IPC setup error of this process, if any.
pub fn get_ipc_error() -> Option<String> {
    IpcErrorSlot::process().get()
}
