mod config;
mod dispatch;
mod error_slot;
mod host;
mod primary;
mod queue_name;
mod support;
