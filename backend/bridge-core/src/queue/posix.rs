use crate::error::queue::QueueError;
use crate::queue::{MessageQueue, QueueBackend, QueueSpec, Received, check_priority};

use common::ErrorLocation;

use std::ffi::CString;
use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::io::Error as IoError;
use std::panic::Location;
use std::time::Duration;

use log::{trace, warn};
use nix::errno::Errno;
use nix::mqueue::{
    MQ_OFlag, MqAttr, MqdT, mq_attr_member_t, mq_close, mq_getattr, mq_open, mq_receive,
    mq_send, mq_timedreceive, mq_unlink,
};
use nix::sys::stat::Mode;
use nix::sys::time::TimeSpec;
use nix::time::{ClockId, clock_gettime};

/// Kernel POSIX message queues (`mq_overview(7)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixBackend;

#[track_caller]
fn queue_path(name: &str) -> Result<CString, QueueError> {
    if name.is_empty() || name.contains('/') {
        return Err(QueueError::InvalidName {
            message: format!("'{name}' must be non-empty and contain no '/'"),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    CString::new(format!("/{name}")).map_err(|e| QueueError::InvalidName {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn attr_member(value: usize, field: &str) -> Result<mq_attr_member_t, QueueError> {
    mq_attr_member_t::try_from(value).map_err(|_| QueueError::InvalidSpec {
        message: format!("{field} {value} does not fit the platform limit"),
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn os_error(operation: &'static str, errno: Errno) -> QueueError {
    QueueError::os(operation, IoError::from(errno))
}

impl QueueBackend for PosixBackend {
    type Queue = PosixQueue;

    #[track_caller]
    fn open_only(&self, name: &str) -> Result<PosixQueue, QueueError> {
        let path = queue_path(name)?;
        let flags = MQ_OFlag::O_WRONLY | MQ_OFlag::O_NONBLOCK;

        match mq_open(path.as_c_str(), flags, Mode::empty(), None) {
            Ok(descriptor) => PosixQueue::from_descriptor(name, descriptor),
            Err(Errno::ENOENT) => Err(QueueError::NotFound {
                name: name.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(errno) => Err(os_error("mq_open", errno)),
        }
    }

    #[track_caller]
    fn create(&self, name: &str, spec: QueueSpec) -> Result<PosixQueue, QueueError> {
        let path = queue_path(name)?;
        let attributes = MqAttr::new(
            0,
            attr_member(spec.capacity, "capacity")?,
            attr_member(spec.max_message_size, "max_message_size")?,
            0,
        );

        // Private to the user that runs the application.
        let mode = Mode::S_IRUSR | Mode::S_IWUSR;
        let flags = MQ_OFlag::O_RDONLY | MQ_OFlag::O_CREAT;

        let descriptor = mq_open(path.as_c_str(), flags, mode, Some(&attributes))
            .map_err(|errno| os_error("mq_open", errno))?;

        PosixQueue::from_descriptor(name, descriptor)
    }

    #[track_caller]
    fn remove(&self, name: &str) -> Result<bool, QueueError> {
        let path = queue_path(name)?;

        match mq_unlink(path.as_c_str()) {
            Ok(()) => Ok(true),
            Err(Errno::ENOENT) => Ok(false),
            Err(errno) => Err(os_error("mq_unlink", errno)),
        }
    }
}

/// Open descriptor on a kernel queue. Closed on drop.
pub struct PosixQueue {
    name: String,
    /// Only `None` while being dropped.
    descriptor: Option<MqdT>,
    max_message_size: usize,
}

impl Debug for PosixQueue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter
            .debug_struct("PosixQueue")
            .field("name", &self.name)
            .field("max_message_size", &self.max_message_size)
            .finish()
    }
}

impl PosixQueue {
    #[track_caller]
    fn from_descriptor(name: &str, descriptor: MqdT) -> Result<Self, QueueError> {
        let attributes = match mq_getattr(&descriptor) {
            Ok(attributes) => attributes,
            Err(errno) => {
                let _ = mq_close(descriptor);
                return Err(os_error("mq_getattr", errno));
            }
        };

        trace!(
            "Opened queue {name}: maxmsg={}, msgsize={}",
            attributes.maxmsg(),
            attributes.msgsize()
        );

        Ok(Self {
            name: name.to_string(),
            descriptor: Some(descriptor),
            max_message_size: usize::try_from(attributes.msgsize()).unwrap_or(0),
        })
    }

    #[track_caller]
    fn descriptor(&self) -> Result<&MqdT, QueueError> {
        self.descriptor
            .as_ref()
            .ok_or_else(|| os_error("mq_descriptor", Errno::EBADF))
    }

    #[track_caller]
    fn check_buffer(&self, buffer: &[u8]) -> Result<(), QueueError> {
        if buffer.len() < self.max_message_size {
            return Err(QueueError::BufferTooSmall {
                size: buffer.len(),
                required: self.max_message_size,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

/// Absolute CLOCK_REALTIME deadline `timeout` from now, as mq_timedreceive wants.
fn deadline_after(timeout: Duration) -> Result<TimeSpec, Errno> {
    let now = clock_gettime(ClockId::CLOCK_REALTIME)?;
    Ok(now + TimeSpec::from_duration(timeout))
}

impl MessageQueue for PosixQueue {
    #[track_caller]
    fn try_send(&self, payload: &[u8], priority: u32) -> Result<(), QueueError> {
        check_priority(priority)?;
        if payload.len() > self.max_message_size {
            return Err(QueueError::MessageTooLarge {
                size: payload.len(),
                limit: self.max_message_size,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        match mq_send(self.descriptor()?, payload, priority) {
            Ok(()) => Ok(()),
            Err(Errno::EAGAIN) => Err(QueueError::Full {
                name: self.name.clone(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(Errno::EMSGSIZE) => Err(QueueError::MessageTooLarge {
                size: payload.len(),
                limit: self.max_message_size,
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(errno) => Err(os_error("mq_send", errno)),
        }
    }

    #[track_caller]
    fn receive(&self, buffer: &mut [u8]) -> Result<Received, QueueError> {
        self.check_buffer(buffer)?;
        let descriptor = self.descriptor()?;

        loop {
            let mut priority = 0u32;
            match mq_receive(descriptor, buffer, &mut priority) {
                Ok(size) => return Ok(Received { size, priority }),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(os_error("mq_receive", errno)),
            }
        }
    }

    #[track_caller]
    fn timed_receive(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<Received>, QueueError> {
        self.check_buffer(buffer)?;
        let descriptor = self.descriptor()?;
        let deadline = deadline_after(timeout).map_err(|errno| os_error("clock_gettime", errno))?;

        let mut priority = 0u32;
        match mq_timedreceive(descriptor, buffer, &mut priority, &deadline) {
            Ok(size) => Ok(Some(Received { size, priority })),
            Err(Errno::ETIMEDOUT) | Err(Errno::EINTR) => Ok(None),
            Err(errno) => Err(os_error("mq_timedreceive", errno)),
        }
    }

    fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Drop for PosixQueue {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            if let Err(errno) = mq_close(descriptor) {
                warn!("Failed to close queue {}: {errno}", self.name);
            }
        }
    }
}
