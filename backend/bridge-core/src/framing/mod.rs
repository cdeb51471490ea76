//! Native-messaging stdio framing.
//!
//! Each message is a 4-byte little-endian length followed by that many bytes
//! of UTF-8 JSON. The helper process writes frames to stdout for the browser
//! and reads the browser's frames from stdin.

use crate::error::framing::FramingError;

use common::ErrorLocation;

use std::io::{ErrorKind, Read, Write, stdout};
use std::panic::Location;

/// Largest frame a host may send to the browser.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Largest frame the browser sends to a host.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Write one frame to `writer` and flush it.
///
/// # Errors
///
/// Returns [`FramingError::FrameTooLarge`] before writing anything when the
/// payload exceeds [`MAX_OUTBOUND_FRAME`], and [`FramingError::Stream`] when
/// the underlying stream fails (for stdout this means the browser is gone).
#[track_caller]
pub fn write_framed<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError> {
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(FramingError::FrameTooLarge {
            size: payload.len(),
            limit: MAX_OUTBOUND_FRAME,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    // Bounded above, so the cast cannot truncate.
    let size = payload.len() as u32;

    writer.write_all(&size.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;

    Ok(())
}

/// Write one frame to the process's standard output.
///
/// Outbound counterpart of [`read_frame`] for a host answering the extension.
/// The bridge host never replies, so only library users call this.
///
/// The stdout lock is held for the whole frame so concurrent callers cannot
/// interleave a header with another frame's payload.
#[track_caller]
pub fn write_to_stdout(payload: &[u8]) -> Result<(), FramingError> {
    let mut handle = stdout().lock();
    write_framed(&mut handle, payload)
}

/// Read one frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
///
/// # Errors
///
/// - [`FramingError::Truncated`] if the stream ends inside a header or payload
/// - [`FramingError::FrameTooLarge`] if the announced length exceeds [`MAX_INBOUND_FRAME`]
/// - [`FramingError::Stream`] on any other I/O failure
#[track_caller]
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FramingError> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;

    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(FramingError::Truncated {
                    message: format!("stream ended after {filled} of {HEADER_LEN} header bytes"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Ok(read) => filled += read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let size = u32::from_le_bytes(header) as usize;
    if size > MAX_INBOUND_FRAME {
        return Err(FramingError::FrameTooLarge {
            size,
            limit: MAX_INBOUND_FRAME,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload)?;

    Ok(Some(payload))
}
