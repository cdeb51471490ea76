pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod error_slot;
pub mod framing;
pub mod host;
pub mod primary;
pub mod queue;
pub mod receiver;

#[cfg(test)]
mod tests;

/// Bound on one queue message, agreed by both ends at build time.
pub const MESSAGE_SIZE: usize = 1024;
/// Number of slots in the application's queue. Linux caps unprivileged queues at 10.
pub const QUEUE_CAPACITY: usize = 10;
/// Every sender uses the same priority, which keeps delivery FIFO.
pub const MESSAGE_PRIORITY: u32 = 1;
/// Priorities must stay below this (`MQ_PRIO_MAX` on Linux).
pub const PRIORITY_LIMIT: u32 = 32_768;
/// Prefix of the installation-specific queue name.
pub const QUEUE_NAME_PREFIX: &str = "bridge_gui";
/// Native-messaging host name registered with the browsers.
pub const NATIVE_HOST_NAME: &str = "com.bridge.native_host";
/// File name of the configuration document inside the config directory.
pub const CONFIG_FILE_NAME: &str = const_format::concatcp!(QUEUE_NAME_PREFIX, ".json");
