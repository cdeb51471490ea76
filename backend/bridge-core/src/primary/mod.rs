//! Primary execution context using actor pattern.
//!
//! Channel and window state belong to the application's primary context and
//! must never be touched from the receiver thread. The dispatcher therefore
//! posts [`UiTask`] messages; a single actor task owns the collaborators and
//! applies the tasks one at a time.
//!
//! # Architecture
//!
//! - Tasks are sent via a bounded mpsc channel
//! - [`PrimaryHandle::post`] never blocks; a full channel drops the task
//! - The actor runs until every [`PrimaryHandle`] is dropped

pub mod channels;
pub mod windows;

pub use channels::{Channel, ChannelHandle, ChannelRegistry, InMemoryChannelRegistry};
pub use windows::{
    AttachArgs, HostWindow, UnsupportedWindowAttachment, ViewHandle, WindowAttachmentService,
};

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Default bound of the hand-off channel.
pub const TASK_CAPACITY: usize = 100;

/// Work handed from the receiver to the primary context.
#[derive(Debug, Clone, PartialEq)]
pub enum UiTask {
    /// Resolve and watch a channel, then optionally attach a view.
    Select(SelectTask),

    /// Remove the view attached to a browser window.
    Detach { win_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectTask {
    pub channel_name: Option<String>,
    pub attach: Option<AttachArgs>,
}

/// Sending side of the primary context. Cheap to clone.
#[derive(Clone)]
pub struct PrimaryHandle {
    task_tx: mpsc::Sender<UiTask>,
    attachment_supported: bool,
}

impl PrimaryHandle {
    /// Queue a task for the primary context.
    ///
    /// Returns `false` if the task was dropped because the channel is full
    /// or the primary context has stopped.
    pub fn post(&self, task: UiTask) -> bool {
        match self.task_tx.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                warn!("Primary context busy, dropping {task:?}");
                false
            }
            Err(TrySendError::Closed(task)) => {
                warn!("Primary context stopped, dropping {task:?}");
                false
            }
        }
    }

    /// Whether the primary context can attach views to host windows.
    pub fn attachment_supported(&self) -> bool {
        self.attachment_supported
    }
}

/// Owner of channel and window state.
pub struct PrimaryContext {
    task_rx: mpsc::Receiver<UiTask>,
    channels: Box<dyn ChannelRegistry>,
    windows: Box<dyn WindowAttachmentService>,
}

impl PrimaryContext {
    /// Create the context and the handle used to post to it.
    pub fn new(
        channels: Box<dyn ChannelRegistry>,
        windows: Box<dyn WindowAttachmentService>,
        capacity: usize,
    ) -> (Self, PrimaryHandle) {
        let (task_tx, task_rx) = mpsc::channel(capacity.max(1));
        let handle = PrimaryHandle {
            task_tx,
            attachment_supported: windows.is_supported(),
        };

        (
            Self {
                task_rx,
                channels,
                windows,
            },
            handle,
        )
    }

    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process tasks until all handles are dropped.
    pub async fn run(mut self) {
        info!("Primary context started");

        while let Some(task) = self.task_rx.recv().await {
            self.apply(task);
        }

        info!("Primary context stopped");
    }

    /// Apply every task already queued, without waiting.
    ///
    /// For hosts that drive the primary context from their own event loop
    /// instead of [`PrimaryContext::run`]. Returns the number applied.
    pub fn run_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(task) = self.task_rx.try_recv() {
            self.apply(task);
            applied += 1;
        }
        applied
    }

    /// Apply one task synchronously.
    pub fn apply(&mut self, task: UiTask) {
        match task {
            UiTask::Select(select) => self.select(select),
            UiTask::Detach { win_id } => {
                debug!("Detaching view for window {win_id}");
                self.windows.detach_view(&win_id);
            }
        }
    }

    fn select(&mut self, task: SelectTask) {
        let channel = task.channel_name.as_deref().map(|name| {
            let channel = self.channels.get_or_add_channel(name);
            let already_watching = self
                .channels
                .watching_channel()
                .is_some_and(|current| Arc::ptr_eq(&current, &channel));
            if !already_watching {
                info!("Watching channel {name}");
                self.channels.set_watching_channel(Arc::clone(&channel));
            }
            channel
        });

        let Some(args) = task.attach else {
            return;
        };

        let Some(host) = self.windows.foreground_window() else {
            warn!("No foreground window to attach {} to", args.win_id);
            return;
        };

        match self.windows.attach_view(host, &args) {
            Some(view) => {
                if let Some(channel) = channel {
                    self.windows.set_view_channel(view, channel);
                }
            }
            None => warn!("Failed to attach view for window {}", args.win_id),
        }
    }
}
