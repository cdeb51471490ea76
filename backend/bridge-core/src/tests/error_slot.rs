// Unit tests for the shared IPC error slot

use crate::error_slot::{IpcErrorSlot, get_ipc_error};

use std::thread;

use serial_test::serial;

/// **VALUE**: Verifies a new slot is empty and clones share the written value.
///
/// **WHY THIS MATTERS**: The receiver thread writes through its clone while the main
/// context reads through another. Separate storage would hide the failure.
#[test]
fn given_cloned_slot_when_set_from_thread_then_visible_to_reader() {
    // GIVEN: A fresh slot and a clone for the writer thread
    let slot = IpcErrorSlot::new();
    assert_eq!(slot.get(), None);
    let writer = slot.clone();

    // WHEN: Setting from another thread
    thread::spawn(move || writer.set("queue creation failed"))
        .join()
        .unwrap();

    // THEN: The reader sees it
    assert_eq!(slot.get().as_deref(), Some("queue creation failed"));
    assert!(slot.is_set());
}

/// **VALUE**: Verifies last write wins.
#[test]
fn given_slot_when_set_twice_then_last_message_kept() {
    let slot = IpcErrorSlot::new();

    slot.set("first");
    slot.set("second");

    assert_eq!(slot.get().as_deref(), Some("second"));
}

/// **VALUE**: Verifies the process slot and `get_ipc_error` are the same cell.
#[test]
#[serial(process_slot)]
fn given_process_slot_when_set_then_get_ipc_error_reports_it() {
    IpcErrorSlot::process().set("process-wide failure");

    assert_eq!(get_ipc_error().as_deref(), Some("process-wide failure"));
}
