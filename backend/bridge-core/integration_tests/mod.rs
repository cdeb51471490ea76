mod helpers;
#[cfg(target_os = "linux")]
mod posix;
mod receiver;
