// Unit tests for the primary-context actor

use crate::primary::{
    ChannelRegistry, HostWindow, InMemoryChannelRegistry, PrimaryContext, SelectTask, UiTask,
    UnsupportedWindowAttachment,
};
use crate::tests::support::{Event, recording_context};

use std::sync::Arc;
use std::time::Duration;

fn select(name: &str) -> UiTask {
    UiTask::Select(SelectTask {
        channel_name: Some(name.to_string()),
        attach: None,
    })
}

/// **VALUE**: Verifies the spawned actor applies posted tasks in order and stops once
/// every handle is dropped.
///
/// **WHY THIS MATTERS**: All channel and window mutation is funnelled through this actor.
/// If it dropped or reordered tasks, a quick select-then-detach from the browser would
/// leave a stale view.
///
/// **BUG THIS CATCHES**: Would catch the actor exiting early or never exiting.
#[tokio::test]
async fn given_spawned_actor_when_tasks_posted_then_applied_in_order() {
    // GIVEN: A spawned actor
    let (context, handle, log) = recording_context(true, Some(HostWindow(3)), 8);
    let actor = context.spawn();

    // WHEN: Posting two tasks and dropping the handle
    assert!(handle.post(select("first")));
    assert!(handle.post(UiTask::Detach {
        win_id: "9".to_string()
    }));
    drop(handle);

    // THEN: The actor drains and stops
    tokio::time::timeout(Duration::from_secs(2), actor)
        .await
        .expect("Actor should stop when handles are dropped")
        .expect("Actor task should not panic");
    assert_eq!(
        log.events(),
        vec![
            Event::Resolve("first".to_string()),
            Event::Watch("first".to_string()),
            Event::Detach("9".to_string()),
        ]
    );
}

/// **VALUE**: Verifies re-selecting the watched channel does not reset the watching slot.
///
/// **BUG THIS CATCHES**: Would catch a comparison by name copy instead of by identity,
/// or an unconditional reset that re-triggers "channel changed" handling.
#[test]
fn given_same_channel_selected_twice_when_applied_then_watch_set_once() {
    // GIVEN: A context
    let (mut context, handle, log) = recording_context(true, None, 8);

    // WHEN: Selecting the same channel twice, then another
    handle.post(select("a"));
    handle.post(select("a"));
    handle.post(select("b"));
    context.run_pending();

    // THEN: Three resolutions, two watch changes
    assert_eq!(log.count(|e| matches!(e, Event::Resolve(_))), 3);
    assert_eq!(
        log.count(|e| matches!(e, Event::Watch(_))),
        2,
        "Watching should only change when the channel differs"
    );
}

/// **VALUE**: Verifies the in-memory registry hands out the same channel for the same name.
#[test]
fn given_in_memory_registry_when_channel_added_twice_then_same_handle() {
    let mut registry = InMemoryChannelRegistry::new();

    let first = registry.get_or_add_channel("somechannel");
    let second = registry.get_or_add_channel("somechannel");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
    assert!(registry.watching_channel().is_none());
}

/// **VALUE**: Verifies the handle reports attachment support from the installed service.
#[test]
fn given_unsupported_service_when_context_created_then_handle_reports_unsupported() {
    let (_context, handle) = PrimaryContext::new(
        Box::new(InMemoryChannelRegistry::new()),
        Box::new(UnsupportedWindowAttachment),
        4,
    );

    assert!(!handle.attachment_supported());
}
