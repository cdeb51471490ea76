use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures the file of the call site.
///
/// **WHY THIS MATTERS**: Every bridge error prints its location. A wrong file makes a
/// dropped queue message or a failed receiver setup impossible to trace in the logs.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated or the
/// file path is no longer copied into the struct.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_and_column() {
    // GIVEN/WHEN: Creating ErrorLocation from the current location
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file and a non-zero column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the caller of a
/// `#[track_caller]` helper rather than the helper itself.
///
/// **WHY THIS MATTERS**: Error constructors across the bridge are `#[track_caller]` helpers.
/// If `caller()` stopped forwarding, every error would point at the same constructor line.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is removed from `caller()`.
#[test]
fn given_track_caller_helper_when_caller_used_then_each_call_site_differs() {
    // GIVEN: A helper that captures location through caller()
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing from two consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Lines should be sequential and in this file
    assert_eq!(first.file, second.file, "Should have same file");
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}

/// **VALUE**: Verifies the `[file:line:column]` rendering used in every error message.
///
/// **WHY THIS MATTERS**: Log lines are grepped by location. A format change silently breaks
/// that workflow.
///
/// **BUG THIS CATCHES**: Would catch a Display implementation that drops brackets or fields.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/receiver/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting as string
    let formatted = location.to_string();

    // THEN: Should produce "[file:line:column]"
    assert_eq!(formatted, "[src/receiver/mod.rs:42:7]");
}
