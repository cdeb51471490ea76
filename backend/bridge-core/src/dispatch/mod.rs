//! Maps decoded commands onto primary-context tasks.
//!
//! The dispatcher runs on the receiver thread. It validates each command,
//! then posts a [`UiTask`] instead of touching channel or window state
//! itself. Every failure is logged and absorbed; nothing here returns an
//! error.

use crate::command::{Command, DetachCommand, SelectCommand, UnknownCommand};
use crate::primary::{AttachArgs, PrimaryHandle, SelectTask, UiTask};

use log::{debug, trace, warn};

/// The only channel provider the application knows.
pub const CHANNEL_TYPE_TWITCH: &str = "twitch";

/// Anything that consumes decoded commands on the receiver thread.
pub trait CommandHandler: Send + 'static {
    fn handle(&self, command: Command);
}

impl<F> CommandHandler for F
where
    F: Fn(Command) + Send + 'static,
{
    fn handle(&self, command: Command) {
        self(command)
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingChannelType,
    MissingWinId,
    UnknownChannelType(String),
}

/// What dispatching one command amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A task was handed to the primary context.
    Posted,
    /// Valid, but there was nothing to do.
    NoOp,
    /// The primary context refused the task.
    Dropped,
    Rejected(Rejection),
    /// Unrecognised or missing action.
    Unknown(Option<String>),
}

pub struct Dispatcher {
    primary: PrimaryHandle,
}

impl Dispatcher {
    pub fn new(primary: PrimaryHandle) -> Self {
        Self { primary }
    }

    pub fn dispatch(&self, command: Command) -> DispatchOutcome {
        match command {
            Command::Select(select) => self.select(select),
            Command::Detach(detach) => self.detach(detach),
            Command::Unknown(unknown) => Self::unknown(unknown),
        }
    }

    fn select(&self, select: SelectCommand) -> DispatchOutcome {
        let supported = self.primary.attachment_supported();

        let Some(channel_type) = select.channel_type.as_deref() else {
            warn!("NM select without channel type");
            return DispatchOutcome::Rejected(Rejection::MissingChannelType);
        };

        let attach = if select.wants_attachment() && supported {
            let Some(win_id) = select.win_id.clone() else {
                warn!("NM select requested attachment without winId");
                return DispatchOutcome::Rejected(Rejection::MissingWinId);
            };
            debug!(
                "NM attach: x={} pixelRatio={} width={} height={} winId={win_id}",
                select.size.x, select.size.pixel_ratio, select.size.width, select.size.height
            );
            Some(AttachArgs {
                win_id,
                y_offset: select.y_offset,
                size: select.size,
                fullscreen: select.attach_fullscreen,
            })
        } else {
            if select.wants_attachment() {
                debug!("NM attachment requested but not supported on this platform");
            }
            None
        };

        if channel_type != CHANNEL_TYPE_TWITCH {
            debug!("NM unknown channel type {channel_type}");
            return DispatchOutcome::Rejected(Rejection::UnknownChannelType(
                channel_type.to_string(),
            ));
        }

        let channel_name = select.channel_name().map(str::to_string);
        if channel_name.is_none() && attach.is_none() {
            trace!("NM select with nothing to do");
            return DispatchOutcome::NoOp;
        }

        self.post(UiTask::Select(SelectTask {
            channel_name,
            attach,
        }))
    }

    fn detach(&self, detach: DetachCommand) -> DispatchOutcome {
        let Some(win_id) = detach.win_id else {
            warn!("NM detach without winId");
            return DispatchOutcome::Rejected(Rejection::MissingWinId);
        };

        if !self.primary.attachment_supported() {
            debug!("NM detach ignored, window attachment not supported");
            return DispatchOutcome::NoOp;
        }

        self.post(UiTask::Detach { win_id })
    }

    fn unknown(unknown: UnknownCommand) -> DispatchOutcome {
        match unknown.action.as_deref() {
            None => debug!("NM action was null"),
            Some(action) => debug!("NM unknown action {action}"),
        }
        DispatchOutcome::Unknown(unknown.action)
    }

    fn post(&self, task: UiTask) -> DispatchOutcome {
        if self.primary.post(task) {
            DispatchOutcome::Posted
        } else {
            DispatchOutcome::Dropped
        }
    }
}

impl CommandHandler for Dispatcher {
    fn handle(&self, command: Command) {
        let outcome = self.dispatch(command);
        trace!("NM dispatch outcome: {outcome:?}");
    }
}
