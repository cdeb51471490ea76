//! Installation-specific queue names.
//!
//! Every installation gets its own queue so two side-by-side copies of the
//! application never read each other's commands. The helper and the
//! application derive the name from the same directory, so they agree
//! without any coordination.

use crate::error::queue::QueueError;

use common::ErrorLocation;

use std::env::current_exe;
use std::panic::Location;
use std::path::Path;

use uuid::Uuid;

/// `prefix` followed by a stable hash of `install_dir`.
pub fn queue_name(prefix: &str, install_dir: &Path) -> String {
    let hash = Uuid::new_v5(&Uuid::NAMESPACE_URL, install_dir.as_os_str().as_encoded_bytes());
    format!("{prefix}{}", hash.simple())
}

/// Queue name for the installation the running executable belongs to.
///
/// # Errors
///
/// Returns [`QueueError::InvalidName`] if the executable path cannot be resolved.
#[track_caller]
pub fn installation_queue_name(prefix: &str) -> Result<String, QueueError> {
    let location = ErrorLocation::from(Location::caller());

    let executable = current_exe().map_err(|e| QueueError::InvalidName {
        message: format!("Failed to resolve executable path: {e}"),
        location,
    })?;
    let install_dir = executable.parent().ok_or_else(|| QueueError::InvalidName {
        message: format!("Executable {} has no parent directory", executable.display()),
        location,
    })?;

    Ok(queue_name(prefix, install_dir))
}
