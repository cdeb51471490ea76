//! Window attachment capability.
//!
//! Attaching a view to a browser window needs native window APIs that only
//! some platforms offer. The primary context holds one implementation of
//! [`WindowAttachmentService`]; platforms without support install
//! [`UnsupportedWindowAttachment`], and the dispatcher skips attachment work
//! when [`WindowAttachmentService::is_supported`] is false.

use crate::command::ViewSize;
use crate::primary::channels::ChannelHandle;

/// Native handle of a top-level window, as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostWindow(pub u64);

/// Identifies a view the service attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Where and how to attach a view.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachArgs {
    pub win_id: String,
    pub y_offset: i32,
    pub size: ViewSize,
    pub fullscreen: bool,
}

pub trait WindowAttachmentService: Send {
    fn is_supported(&self) -> bool;

    /// The window that currently has focus, which is the browser that sent
    /// the command.
    fn foreground_window(&self) -> Option<HostWindow>;

    /// Attach (or reuse) the view for `args.win_id` inside `host`.
    fn attach_view(&mut self, host: HostWindow, args: &AttachArgs) -> Option<ViewHandle>;

    fn set_view_channel(&mut self, view: ViewHandle, channel: ChannelHandle);

    fn detach_view(&mut self, win_id: &str);
}

/// No-op service for platforms without window attachment.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedWindowAttachment;

impl WindowAttachmentService for UnsupportedWindowAttachment {
    fn is_supported(&self) -> bool {
        false
    }

    fn foreground_window(&self) -> Option<HostWindow> {
        None
    }

    fn attach_view(&mut self, _host: HostWindow, _args: &AttachArgs) -> Option<ViewHandle> {
        None
    }

    fn set_view_channel(&mut self, _view: ViewHandle, _channel: ChannelHandle) {}

    fn detach_view(&mut self, _win_id: &str) {}
}
