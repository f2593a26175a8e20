//! Session tests against the in-memory fake channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use icon_client::condition::{is_less_than, is_true};
use icon_client::testing::{WatcherReadyBehavior, fake_channel};
use icon_client::{ActionDescriptor, ReactionDescriptor, Session, SessionOptions};
use icon_common::{ActionInstanceId, IconError, ReactionHandle, ReactionId, SessionId};
use icon_wire::session as wire_session;
use icon_wire::{RpcCode, RpcStatus, service};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn counter_callback(counter: &Arc<AtomicUsize>) -> impl FnMut() + Send + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn start_allocates_parts_and_assigns_session_id() {
    init_tracing();
    let (channel, server) = fake_channel();
    let session = Session::start(
        channel,
        &["arm0", "gripper0"],
        SessionOptions {
            log_context: Some(wire_session::LogContext { context_id: 99 }),
            deadline: Some(Duration::from_secs(1)),
        },
    )
    .unwrap();
    assert_eq!(session.id(), SessionId::new(1));

    let requests = server.session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].log_context,
        Some(wire_session::LogContext { context_id: 99 })
    );
    match &requests[0].data {
        wire_session::SessionRequestData::InitialSessionData(data) => {
            assert_eq!(data.allocate_parts, vec!["arm0", "gripper0"]);
            assert!(data.deadline.is_some());
        }
        other => panic!("expected initial session data, got {other:?}"),
    }
}

#[test]
fn start_rejects_reaction_event_before_ready() {
    let (channel, server) = fake_channel();
    server.set_watcher_ready_behavior(WatcherReadyBehavior::EventBeforeReady(3));
    let err = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap_err();
    assert!(matches!(err, IconError::Internal(_)));
    assert!(err.to_string().contains("empty reaction first"));
}

#[test]
fn start_fails_when_watcher_closes_before_ready() {
    let (channel, server) = fake_channel();
    server.set_watcher_ready_behavior(WatcherReadyBehavior::CloseImmediately);
    let err = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap_err();
    assert!(matches!(err, IconError::Aborted(_)));
}

#[test]
fn add_actions_sends_wire_request_and_assigns_reaction_ids() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let action = session
        .add_action(
            ActionDescriptor::new("xfa.point_to_point_move", ActionInstanceId::new(7), "arm0")
                .with_reaction(
                    ReactionDescriptor::new(is_true("xfa.is_done"))
                        .with_realtime_action_on_condition(ActionInstanceId::new(8))
                        .fire_once(true),
                )
                .with_reaction(ReactionDescriptor::new(is_less_than("err", 1e-3))),
        )
        .unwrap();
    assert_eq!(action.id(), ActionInstanceId::new(7));

    let requests = server.session_requests();
    assert_eq!(requests.len(), 2);
    match &requests[1].data {
        wire_session::SessionRequestData::AddActionsAndReactions {
            action_instances,
            reactions,
        } => {
            assert_eq!(action_instances.len(), 1);
            assert_eq!(action_instances[0].action_instance_id, 7);
            assert_eq!(
                action_instances[0].slot_data,
                wire_session::SlotData::PartName("arm0".to_string())
            );
            // Reaction ids come from the session's monotonic counter.
            assert_eq!(reactions.len(), 2);
            assert_eq!(reactions[0].reaction_instance_id, 0);
            assert_eq!(reactions[1].reaction_instance_id, 1);
            assert!(reactions[0].fire_once);
            let association = reactions[0].action_association.as_ref().unwrap();
            assert_eq!(association.action_instance_id, 7);
            assert!(association.stop_associated_action);
            assert_eq!(
                reactions[0].response.as_ref().unwrap().start_action_instance_id,
                8
            );
        }
        other => panic!("expected add actions request, got {other:?}"),
    }
}

#[test]
fn watcher_loop_dispatches_one_callback_per_event() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    session
        .add_action(
            ActionDescriptor::new("xfa.stop", ActionInstanceId::new(1), "arm0").with_reaction(
                ReactionDescriptor::new(is_true("xfa.is_stopped"))
                    .with_handle(ReactionHandle::new(42))
                    .with_watcher_on_condition(counter_callback(&counter)),
            ),
        )
        .unwrap();

    server.send_reaction_event(0);
    session
        .run_watcher_loop_until_reaction(ReactionHandle::new(42), far_deadline())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // The callback survives; a second event fires it again.
    server.send_reaction_event(0);
    session
        .run_watcher_loop_until_reaction(ReactionHandle::new(42), far_deadline())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn watcher_loop_ignores_unknown_reaction_ids() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    session
        .add_freestanding_reaction(
            ReactionDescriptor::new(is_true("flag"))
                .with_handle(ReactionHandle::new(1))
                .with_watcher_on_condition(counter_callback(&counter)),
        )
        .unwrap();

    server.send_reaction_event(999);
    server.send_reaction_event(0);
    session
        .run_watcher_loop_until_reaction(ReactionHandle::new(1), far_deadline())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn watcher_loop_times_out_but_drains_queued_events_first() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    session
        .add_freestanding_reaction(
            ReactionDescriptor::new(is_true("flag"))
                .with_watcher_on_condition(counter_callback(&counter)),
        )
        .unwrap();

    server.send_reaction_event(0);
    // Give the reader thread time to move the event into the queue.
    std::thread::sleep(Duration::from_millis(200));

    let err = session
        .run_watcher_loop(Instant::now() - Duration::from_secs(1))
        .unwrap_err();
    assert!(matches!(err, IconError::DeadlineExceeded(_)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn quit_watcher_loop_wakes_a_blocked_loop() {
    let (channel, _server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let quitter = session.watcher_loop_quitter();
    let waker = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        quitter.quit();
    });
    session.run_watcher_loop(far_deadline()).unwrap();
    waker.join().unwrap();
}

#[test]
fn watcher_error_aborts_loop_and_ends_session() {
    init_tracing();
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.close_watcher(Err(IconError::aborted("connection reset")));
    let err = session.run_watcher_loop(far_deadline()).unwrap_err();
    assert_eq!(err, IconError::aborted("connection reset"));

    let err = session.stop_all_actions().unwrap_err();
    assert!(matches!(err, IconError::FailedPrecondition(_)));
}

#[test]
fn watcher_closure_without_error_aborts_loop() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.close_watcher(Ok(()));
    let err = session.run_watcher_loop(far_deadline()).unwrap_err();
    assert!(matches!(err, IconError::Aborted(_)));
    assert!(err.to_string().contains("died while reading reactions"));
}

#[test]
fn duplicate_handle_in_one_batch_is_rejected() {
    let (channel, _server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let err = session
        .add_actions(vec![
            ActionDescriptor::new("a", ActionInstanceId::new(1), "arm0").with_reaction(
                ReactionDescriptor::new(is_true("x")).with_handle(ReactionHandle::new(42)),
            ),
            ActionDescriptor::new("b", ActionInstanceId::new(2), "arm0").with_reaction(
                ReactionDescriptor::new(is_true("y")).with_handle(ReactionHandle::new(42)),
            ),
        ])
        .unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, IconError::AlreadyExists(_)));
    assert!(message.contains("The reaction handle 42 already exists"));
    assert!(message.contains("First handle was applied at"));
    assert!(message.contains("Second handle at"));
    assert!(message.contains("session_tests.rs"));
}

#[test]
fn duplicate_handle_across_calls_keeps_first_registration() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    session
        .add_action(
            ActionDescriptor::new("a", ActionInstanceId::new(1), "arm0").with_reaction(
                ReactionDescriptor::new(is_true("x"))
                    .with_handle(ReactionHandle::new(42))
                    .with_watcher_on_condition(counter_callback(&counter)),
            ),
        )
        .unwrap();

    let err = session
        .add_action(
            ActionDescriptor::new("b", ActionInstanceId::new(2), "arm0").with_reaction(
                ReactionDescriptor::new(is_true("y")).with_handle(ReactionHandle::new(42)),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, IconError::AlreadyExists(_)));

    // Only two requests went out: the failed add never reached the server.
    assert_eq!(server.session_requests().len(), 2);

    // The first registration is intact.
    server.send_reaction_event(0);
    session
        .run_watcher_loop_until_reaction(ReactionHandle::new(42), far_deadline())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn until_reaction_with_unknown_handle_is_not_found() {
    let (channel, _server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    let err = session
        .run_watcher_loop_until_reaction(ReactionHandle::new(5), far_deadline())
        .unwrap_err();
    assert!(matches!(err, IconError::NotFound(_)));
    assert!(err.to_string().contains("ReactionHandle(5)"));
}

#[test]
fn mutators_fail_after_end() {
    let (channel, _server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    session.end().unwrap();

    let err = session
        .add_action(ActionDescriptor::new("a", ActionInstanceId::new(1), "arm0"))
        .unwrap_err();
    assert!(matches!(err, IconError::FailedPrecondition(_)));
    assert!(matches!(
        session.clear_all_actions_and_reactions().unwrap_err(),
        IconError::FailedPrecondition(_)
    ));
    assert!(matches!(
        session.remove_action(ActionInstanceId::new(1)).unwrap_err(),
        IconError::FailedPrecondition(_)
    ));

    // End is idempotent-guarded.
    let err = session.end().unwrap_err();
    assert!(matches!(err, IconError::FailedPrecondition(_)));
}

#[test]
fn server_abort_status_ends_session() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.push_session_status(RpcStatus::new(RpcCode::Aborted, "server shutting down"));
    let err = session
        .add_action(ActionDescriptor::new("a", ActionInstanceId::new(1), "arm0"))
        .unwrap_err();
    assert_eq!(err, IconError::aborted("Session ended"));

    assert!(matches!(
        session.stop_all_actions().unwrap_err(),
        IconError::FailedPrecondition(_)
    ));
}

#[test]
fn non_abort_server_error_leaves_session_usable() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.push_session_status(RpcStatus::new(
        RpcCode::InvalidArgument,
        "unknown action type",
    ));
    let err = session
        .add_action(ActionDescriptor::new("nope", ActionInstanceId::new(1), "arm0"))
        .unwrap_err();
    assert_eq!(err, IconError::invalid_argument("unknown action type"));

    // The session is still alive.
    session
        .add_action(ActionDescriptor::new("a", ActionInstanceId::new(2), "arm0"))
        .unwrap();
}

#[test]
fn transport_write_failure_aborts_and_ends_session() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.fail_next_session_write();
    let err = session.stop_all_actions().unwrap_err();
    assert!(matches!(err, IconError::Aborted(_)));
    assert!(err.to_string().contains("session ended"));

    assert!(matches!(
        session.stop_all_actions().unwrap_err(),
        IconError::FailedPrecondition(_)
    ));
}

#[test]
fn transport_read_failure_aborts_and_ends_session() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.fail_next_session_read();
    let err = session.stop_all_actions().unwrap_err();
    assert!(matches!(err, IconError::Aborted(_)));
}

#[test]
fn start_and_remove_requests_have_expected_shape() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    let a = session
        .add_action(ActionDescriptor::new("a", ActionInstanceId::new(1), "arm0"))
        .unwrap();
    let b = session
        .add_action(ActionDescriptor::new("b", ActionInstanceId::new(2), "arm0"))
        .unwrap();

    session.start_actions(&[a, b], false).unwrap();
    session.stop_all_actions().unwrap();
    session.remove_actions(&[a.id(), b.id()]).unwrap();
    session.remove_reactions(&[ReactionId::new(0)]).unwrap();
    session.clear_all_actions_and_reactions().unwrap();

    let requests = server.session_requests();
    match &requests[3].data {
        wire_session::SessionRequestData::StartActionsRequest {
            action_instance_ids,
            stop_active_actions,
        } => {
            assert_eq!(action_instance_ids, &vec![1, 2]);
            assert!(!stop_active_actions);
        }
        other => panic!("expected start request, got {other:?}"),
    }
    match &requests[4].data {
        wire_session::SessionRequestData::StartActionsRequest {
            action_instance_ids,
            stop_active_actions,
        } => {
            assert!(action_instance_ids.is_empty());
            assert!(stop_active_actions);
        }
        other => panic!("expected stop request, got {other:?}"),
    }
    match &requests[5].data {
        wire_session::SessionRequestData::RemoveActionAndReactionIds {
            action_instance_ids,
            reaction_ids,
        } => {
            assert_eq!(action_instance_ids, &vec![1, 2]);
            assert!(reaction_ids.is_empty());
        }
        other => panic!("expected remove request, got {other:?}"),
    }
    match &requests[6].data {
        wire_session::SessionRequestData::RemoveActionAndReactionIds { reaction_ids, .. } => {
            assert_eq!(reaction_ids, &vec![0]);
        }
        other => panic!("expected remove request, got {other:?}"),
    }
    assert!(matches!(
        requests[7].data,
        wire_session::SessionRequestData::ClearAllActionsReactions
    ));
}

#[test]
fn stream_writer_opens_and_writes_values() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    let action = session
        .add_action(ActionDescriptor::new(
            "xfa.trajectory_tracking",
            ActionInstanceId::new(3),
            "arm0",
        ))
        .unwrap();

    let mut writer = session
        .stream_writer::<Vec<f64>>(&action, "joint_setpoints")
        .unwrap();
    writer.write(&vec![0.1, 0.2]).unwrap();
    drop(writer);

    let requests = server.write_stream_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].session_id, 1);
    match &requests[0].stream_operation {
        wire_session::StreamOperation::AddWriteStream {
            action_id,
            field_name,
        } => {
            assert_eq!(*action_id, 3);
            assert_eq!(field_name, "joint_setpoints");
        }
        other => panic!("expected add write stream, got {other:?}"),
    }
    match &requests[1].stream_operation {
        wire_session::StreamOperation::WriteValue { value } => {
            assert_eq!(value.unpack::<Vec<f64>>().unwrap(), vec![0.1, 0.2]);
        }
        other => panic!("expected write value, got {other:?}"),
    }
}

#[test]
fn stream_writer_surfaces_per_message_errors() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    let action = session
        .add_action(ActionDescriptor::new(
            "xfa.trajectory_tracking",
            ActionInstanceId::new(3),
            "arm0",
        ))
        .unwrap();

    // Open succeeds (default OK), then the first write is rejected.
    let mut writer = session
        .stream_writer::<f64>(&action, "speed_factor")
        .unwrap();
    server.push_write_stream_response(wire_session::OpenWriteStreamResponse {
        stream_operation_response: Some(wire_session::StreamOperationResponse::WriteValueResponse(
            RpcStatus::new(RpcCode::InvalidArgument, "value out of range"),
        )),
    });
    let err = writer.write(&2.5).unwrap_err();
    assert_eq!(err, IconError::invalid_argument("value out of range"));

    // A later write on the same stream can still succeed.
    writer.write(&0.5).unwrap();
}

#[test]
fn stream_writer_open_checks_add_stream_status() {
    let (channel, server) = fake_channel();
    let mut session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    let action = session
        .add_action(ActionDescriptor::new(
            "xfa.trajectory_tracking",
            ActionInstanceId::new(3),
            "arm0",
        ))
        .unwrap();

    server.push_write_stream_response(wire_session::OpenWriteStreamResponse {
        stream_operation_response: Some(wire_session::StreamOperationResponse::AddStreamResponse(
            RpcStatus::new(RpcCode::NotFound, "no such input"),
        )),
    });
    let err = session
        .stream_writer::<f64>(&action, "nope")
        .err()
        .expect("open must fail");
    assert_eq!(err, IconError::not_found("no such input"));
}

#[test]
fn planned_trajectory_concatenates_segments() {
    let (channel, server) = fake_channel();
    let session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.set_trajectory_segments(vec![
        service::JointTrajectoryPva {
            time_since_start: vec![0.0, 0.1],
            positions: vec![
                service::JointVec { joints: vec![0.0] },
                service::JointVec { joints: vec![0.5] },
            ],
            velocities: vec![
                service::JointVec { joints: vec![0.0] },
                service::JointVec { joints: vec![1.0] },
            ],
            accelerations: vec![
                service::JointVec { joints: vec![0.0] },
                service::JointVec { joints: vec![0.0] },
            ],
            ..Default::default()
        },
        service::JointTrajectoryPva {
            time_since_start: vec![0.2],
            positions: vec![service::JointVec { joints: vec![1.0] }],
            velocities: vec![service::JointVec { joints: vec![0.0] }],
            accelerations: vec![service::JointVec { joints: vec![0.0] }],
            ..Default::default()
        },
    ]);

    let trajectory = session
        .get_planned_trajectory(ActionInstanceId::new(1))
        .unwrap();
    assert_eq!(trajectory.time_since_start, vec![0.0, 0.1, 0.2]);
    assert_eq!(trajectory.positions.len(), 3);
    assert_eq!(trajectory.positions[2].joints, vec![1.0]);
}

#[test]
fn latest_output_is_returned() {
    let (channel, server) = fake_channel();
    let session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();

    server.set_streaming_output(service::StreamingOutput {
        action_instance_id: 4,
        output: icon_wire::AnyMessage::pack("progress", &0.75f64).unwrap(),
    });
    let output = session
        .get_latest_output(ActionInstanceId::new(4), Duration::from_secs(1))
        .unwrap();
    assert_eq!(output.action_instance_id, 4);
    assert_eq!(output.output.unpack::<f64>().unwrap(), 0.75);
}

#[test]
fn drop_ends_the_session() {
    let (channel, server) = fake_channel();
    {
        let _session = Session::start(channel, &["arm0"], SessionOptions::default()).unwrap();
    }
    // The initial request went out; dropping must not hang or panic.
    assert_eq!(server.session_requests().len(), 1);
}
