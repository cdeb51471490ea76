// Recording collaborators shared by the dispatch and primary-context tests

use crate::primary::{
    AttachArgs, ChannelHandle, ChannelRegistry, HostWindow, InMemoryChannelRegistry,
    PrimaryContext, PrimaryHandle, ViewHandle, WindowAttachmentService,
};

use std::cell::RefCell;
use std::sync::{Arc, Mutex, Once};

use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Resolve(String),
    Watch(String),
    Attach(AttachArgs),
    ViewChannel(u64, String),
    Detach(String),
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

pub struct RecordingRegistry {
    inner: InMemoryChannelRegistry,
    log: EventLog,
}

impl ChannelRegistry for RecordingRegistry {
    fn get_or_add_channel(&mut self, name: &str) -> ChannelHandle {
        self.log.push(Event::Resolve(name.to_string()));
        self.inner.get_or_add_channel(name)
    }

    fn watching_channel(&self) -> Option<ChannelHandle> {
        self.inner.watching_channel()
    }

    fn set_watching_channel(&mut self, channel: ChannelHandle) {
        self.log.push(Event::Watch(channel.name().to_string()));
        self.inner.set_watching_channel(channel);
    }
}

pub struct RecordingWindows {
    supported: bool,
    foreground: Option<HostWindow>,
    next_view: u64,
    log: EventLog,
}

impl WindowAttachmentService for RecordingWindows {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn foreground_window(&self) -> Option<HostWindow> {
        self.foreground
    }

    fn attach_view(&mut self, _host: HostWindow, args: &AttachArgs) -> Option<ViewHandle> {
        self.log.push(Event::Attach(args.clone()));
        self.next_view += 1;
        Some(ViewHandle(self.next_view))
    }

    fn set_view_channel(&mut self, view: ViewHandle, channel: ChannelHandle) {
        self.log
            .push(Event::ViewChannel(view.0, channel.name().to_string()));
    }

    fn detach_view(&mut self, win_id: &str) {
        self.log.push(Event::Detach(win_id.to_string()));
    }
}

/// Primary context wired to recording collaborators.
pub fn recording_context(
    attachment_supported: bool,
    foreground: Option<HostWindow>,
    capacity: usize,
) -> (PrimaryContext, PrimaryHandle, EventLog) {
    let log = EventLog::default();
    let registry = RecordingRegistry {
        inner: InMemoryChannelRegistry::new(),
        log: log.clone(),
    };
    let windows = RecordingWindows {
        supported: attachment_supported,
        foreground,
        next_view: 0,
        log: log.clone(),
    };
    let (context, handle) = PrimaryContext::new(Box::new(registry), Box::new(windows), capacity);
    (context, handle, log)
}

// ============================================
// LOG CAPTURE
// ============================================

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps each record on the thread that emitted it, so parallel tests stay apart.
struct ThreadCapture;

impl Log for ThreadCapture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let entry = (record.level(), record.args().to_string());
        CAPTURED.with(|captured| captured.borrow_mut().push(entry));
    }

    fn flush(&self) {}
}

static CAPTURE: ThreadCapture = ThreadCapture;
static INSTALL: Once = Once::new();

/// Start capturing log records emitted on this thread.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&CAPTURE).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    CAPTURED.with(|captured| captured.borrow_mut().clear());
}

/// Messages captured on this thread at exactly `level`.
pub fn captured_logs(level: Level) -> Vec<String> {
    CAPTURED.with(|captured| {
        captured
            .borrow()
            .iter()
            .filter(|(record_level, _)| *record_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
