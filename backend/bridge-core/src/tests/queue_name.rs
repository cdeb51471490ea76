// Unit tests for installation-specific queue names

use crate::queue::{installation_queue_name, queue_name};

use std::path::Path;

/// **VALUE**: Verifies the name is deterministic per directory and differs between
/// installations.
///
/// **WHY THIS MATTERS**: The helper and the application compute the name independently.
/// Any non-determinism means they never meet; a collision means two installations read
/// each other's commands.
#[test]
fn given_install_dirs_when_named_then_stable_and_distinct() {
    // GIVEN: Two installation directories
    let first = Path::new("/opt/bridge");
    let second = Path::new("/home/user/.local/bridge");

    // WHEN: Naming each twice
    let a1 = queue_name("bridge_gui", first);
    let a2 = queue_name("bridge_gui", first);
    let b = queue_name("bridge_gui", second);

    // THEN: Stable, distinct, prefixed, POSIX-safe
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
    assert!(a1.starts_with("bridge_gui"));
    assert_eq!(a1.len(), "bridge_gui".len() + 32);
    assert!(!a1.contains('/'));
}

/// **VALUE**: Verifies the executable-based name resolves in a normal process.
#[test]
fn given_running_process_when_installation_name_requested_then_resolves() {
    let name = installation_queue_name("bridge_gui").unwrap();

    assert!(name.starts_with("bridge_gui"));
    assert_eq!(name, installation_queue_name("bridge_gui").unwrap());
}
