// Unit tests for command validation and hand-off to the primary context

use crate::command::{Command, DetachCommand, SelectCommand, UnknownCommand};
use crate::dispatch::{DispatchOutcome, Dispatcher, Rejection};
use crate::primary::HostWindow;
use crate::tests::support::{Event, capture_logs, captured_logs, recording_context};

use log::Level;

fn twitch_select(name: &str) -> SelectCommand {
    SelectCommand {
        channel_type: Some("twitch".to_string()),
        name: Some(name.to_string()),
        ..SelectCommand::default()
    }
}

/// **VALUE**: Verifies a plain `select` resolves the channel exactly once and never
/// touches window attachment.
///
/// **WHY THIS MATTERS**: This is the most common message: the user switched tabs in the
/// browser. Extra registry calls would create duplicate channels; an attach call would pop
/// a view over the browser uninvited.
///
/// **BUG THIS CATCHES**: Would catch the channel being resolved twice (once for watching,
/// once for the view), or attachment happening with `attach = false`.
#[test]
fn given_select_without_attach_when_dispatched_then_one_resolution_no_attachment() {
    // GIVEN: A dispatcher on a context that supports attachment
    let (mut context, handle, log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);

    // WHEN: Dispatching select{name=somechannel, type=twitch, attach=false}
    let outcome = dispatcher.dispatch(Command::Select(twitch_select("somechannel")));
    let applied = context.run_pending();

    // THEN: One task, one resolution, one watch, zero attachments
    assert_eq!(outcome, DispatchOutcome::Posted);
    assert_eq!(applied, 1);
    assert_eq!(
        log.events(),
        vec![
            Event::Resolve("somechannel".to_string()),
            Event::Watch("somechannel".to_string()),
        ]
    );
    assert_eq!(log.count(|e| matches!(e, Event::Attach(_))), 0);
}

/// **VALUE**: Verifies a `select` with attachment posts the window geometry and binds the
/// resolved channel to the new view.
#[test]
fn given_select_with_attach_when_dispatched_then_view_attached_with_channel() {
    // GIVEN: Attachment supported and a foreground window
    let (mut context, handle, log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);
    let mut select = twitch_select("somechannel");
    select.attach = true;
    select.win_id = Some("77".to_string());
    select.y_offset = 80;

    // WHEN: Dispatching and applying
    assert_eq!(
        dispatcher.dispatch(Command::Select(select)),
        DispatchOutcome::Posted
    );
    context.run_pending();

    // THEN: Resolve once, attach, then bind the channel to view 1
    let events = log.events();
    assert_eq!(events[0], Event::Resolve("somechannel".to_string()));
    assert!(matches!(&events[2], Event::Attach(args)
        if args.win_id == "77" && args.y_offset == 80 && !args.fullscreen));
    assert_eq!(events[3], Event::ViewChannel(1, "somechannel".to_string()));
    assert_eq!(log.count(|e| matches!(e, Event::Resolve(_))), 1);
}

/// **VALUE**: Verifies attachment without `winId` is rejected before anything is posted.
///
/// **BUG THIS CATCHES**: Would catch a view being attached under an empty window id,
/// which could never be detached again.
#[test]
fn given_attach_without_win_id_when_dispatched_then_rejected() {
    // GIVEN: Attachment supported
    let (mut context, handle, log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);
    let mut select = twitch_select("somechannel");
    select.attach_fullscreen = true;

    // WHEN: Dispatching without winId
    let outcome = dispatcher.dispatch(Command::Select(select));

    // THEN: Rejected, nothing applied
    assert_eq!(outcome, DispatchOutcome::Rejected(Rejection::MissingWinId));
    assert_eq!(context.run_pending(), 0);
    assert!(log.events().is_empty());
}

/// **VALUE**: Verifies attachment requests degrade to channel selection when the platform
/// has no window attachment.
#[test]
fn given_unsupported_attachment_when_select_with_attach_then_only_channel_selected() {
    // GIVEN: No attachment support
    let (mut context, handle, log) = recording_context(false, None, 8);
    let dispatcher = Dispatcher::new(handle);
    let mut select = twitch_select("somechannel");
    select.attach = true;

    // WHEN: Dispatching (winId missing is fine here)
    let outcome = dispatcher.dispatch(Command::Select(select));
    context.run_pending();

    // THEN: Channel selected, no attachment
    assert_eq!(outcome, DispatchOutcome::Posted);
    assert_eq!(log.count(|e| matches!(e, Event::Attach(_))), 0);
    assert_eq!(log.count(|e| matches!(e, Event::Resolve(_))), 1);
}

/// **VALUE**: Verifies missing and unknown channel types are rejected.
#[test]
fn given_bad_channel_type_when_dispatched_then_rejected() {
    let (mut context, handle, _log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);

    let mut missing = twitch_select("a");
    missing.channel_type = None;
    let mut other = twitch_select("a");
    other.channel_type = Some("youtube".to_string());

    assert_eq!(
        dispatcher.dispatch(Command::Select(missing)),
        DispatchOutcome::Rejected(Rejection::MissingChannelType)
    );
    assert_eq!(
        dispatcher.dispatch(Command::Select(other)),
        DispatchOutcome::Rejected(Rejection::UnknownChannelType("youtube".to_string()))
    );
    assert_eq!(context.run_pending(), 0);
}

/// **VALUE**: Verifies a `select` with neither a name nor an attachment is a no-op.
#[test]
fn given_select_with_nothing_to_do_when_dispatched_then_noop() {
    let (mut context, handle, _log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);

    let outcome = dispatcher.dispatch(Command::Select(twitch_select("")));

    assert_eq!(outcome, DispatchOutcome::NoOp);
    assert_eq!(context.run_pending(), 0);
}

/// **VALUE**: Verifies `detach` without `winId` makes zero detach calls and logs exactly
/// one validation failure.
///
/// **WHY THIS MATTERS**: Detaching "nothing" must not be turned into detaching every view,
/// and the warning is the only trace a malformed message leaves.
///
/// **BUG THIS CATCHES**: Would catch a default window id being substituted, or the
/// rejection happening silently (or being logged twice).
#[test]
fn given_detach_without_win_id_when_dispatched_then_no_detach_call() {
    // GIVEN: Attachment supported, logs captured
    let (mut context, handle, log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);
    capture_logs();

    // WHEN: Dispatching detach{}
    let outcome = dispatcher.dispatch(Command::Detach(DetachCommand { win_id: None }));
    context.run_pending();

    // THEN: Rejected with zero detach calls and one warning
    assert_eq!(outcome, DispatchOutcome::Rejected(Rejection::MissingWinId));
    assert_eq!(log.count(|e| matches!(e, Event::Detach(_))), 0);
    assert_eq!(
        captured_logs(Level::Warn),
        vec!["NM detach without winId".to_string()]
    );
}

/// **VALUE**: Verifies `detach` with `winId` reaches the window service on the primary
/// context, and only there.
#[test]
fn given_detach_with_win_id_when_dispatched_then_detached_on_primary_context() {
    // GIVEN: Attachment supported
    let (mut context, handle, log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);

    // WHEN: Dispatching
    let outcome = dispatcher.dispatch(Command::Detach(DetachCommand {
        win_id: Some("5".to_string()),
    }));

    // THEN: Nothing happens until the primary context runs
    assert_eq!(outcome, DispatchOutcome::Posted);
    assert!(log.events().is_empty(), "Dispatcher must not act directly");
    context.run_pending();
    assert_eq!(log.events(), vec![Event::Detach("5".to_string())]);
}

/// **VALUE**: Verifies unknown commands are reported and never posted.
#[test]
fn given_unknown_command_when_dispatched_then_nothing_posted() {
    let (mut context, handle, _log) = recording_context(true, Some(HostWindow(1)), 8);
    let dispatcher = Dispatcher::new(handle);

    let outcome = dispatcher.dispatch(Command::Unknown(UnknownCommand {
        action: Some("reload".to_string()),
    }));

    assert_eq!(outcome, DispatchOutcome::Unknown(Some("reload".to_string())));
    assert_eq!(context.run_pending(), 0);
}

/// **VALUE**: Verifies a full hand-off channel drops the task instead of blocking the
/// receiver thread.
///
/// **WHY THIS MATTERS**: The receiver thread must never wait on the UI. A stalled primary
/// context would otherwise stall the queue and every helper process behind it.
#[test]
fn given_full_primary_channel_when_dispatched_then_dropped() {
    // GIVEN: Capacity of one, already used
    let (_context, handle, _log) = recording_context(true, Some(HostWindow(1)), 1);
    let dispatcher = Dispatcher::new(handle);
    assert_eq!(
        dispatcher.dispatch(Command::Select(twitch_select("a"))),
        DispatchOutcome::Posted
    );

    // WHEN: Dispatching another
    let outcome = dispatcher.dispatch(Command::Select(twitch_select("b")));

    // THEN: Dropped without blocking
    assert_eq!(outcome, DispatchOutcome::Dropped);
}
