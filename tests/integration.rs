//! End-to-end tests: service, publisher, log backends, and projector
//! working against the same stream.

use handoff::{
    AssignmentError, AssignmentService, EventLog, JsonlLog, MemoryLog, StatusProjector,
    SupportEvent, SupportState, DEFAULT_STREAM,
};

#[tokio::test]
async fn full_lifecycle_over_memory_log() {
    let log = MemoryLog::new();
    let service = AssignmentService::new(log.clone());

    service
        .request_support("user-1")
        .await
        .expect("request should succeed");
    service
        .assign("user-1", "sup-1", Some("mod-1"))
        .await
        .expect("assign should succeed");
    service
        .unassign("user-1")
        .await
        .expect("unassign should succeed");
    service
        .assign("user-1", "sup-2", None)
        .await
        .expect("second assign should succeed");
    service
        .resolve("user-1")
        .await
        .expect("resolve should succeed");
    service
        .archive("user-1")
        .await
        .expect("archive should succeed");

    // An independent reader folds the same stream to the same answer.
    let mut projector = StatusProjector::new(log.clone());
    projector.catch_up().await.expect("catch up should succeed");
    assert_eq!(projector.state_of("user-1"), SupportState::Archived);
    assert_eq!(log.len(DEFAULT_STREAM).await, 6);
}

#[tokio::test]
async fn concurrent_assigns_are_both_accepted_and_log_order_decides() {
    let log = MemoryLog::new();
    let service = AssignmentService::new(log.clone());
    service
        .request_support("user-1")
        .await
        .expect("request should succeed");

    // Both callers observe `pending` and race their appends. Neither is
    // rejected; the log serializes them and the later record owns.
    let (a, b) = tokio::join!(
        service.assign("user-1", "alice", None),
        service.assign("user-1", "bob", None),
    );
    a.expect("first racing assign should be accepted");
    b.expect("second racing assign should be accepted");
    assert_eq!(log.len(DEFAULT_STREAM).await, 3);

    // Final owner matches whichever record the log ordered last.
    let records = log
        .read_from(DEFAULT_STREAM, None)
        .await
        .expect("read should succeed");
    let last = handoff::decode(&records.last().expect("log should not be empty").1)
        .expect("decode should succeed");
    let expected_owner = match &last {
        SupportEvent::AssignmentAssigned {
            supervisor_user_id, ..
        } => supervisor_user_id.clone(),
        other => panic!("last record should be an assignment, got {other:?}"),
    };

    let state = service
        .current_state("user-1")
        .await
        .expect("state read should succeed");
    assert_eq!(
        state,
        SupportState::Active {
            supervisor_user_id: expected_owner
        }
    );
}

#[tokio::test]
async fn projector_and_service_agree_at_every_step() {
    let log = MemoryLog::new();
    let service = AssignmentService::new(log.clone());
    let mut projector = StatusProjector::new(log);

    service
        .request_support("user-1")
        .await
        .expect("request should succeed");
    projector.catch_up().await.expect("catch up should succeed");
    assert_eq!(projector.state_of("user-1"), SupportState::Pending);

    service
        .assign("user-1", "sup-1", None)
        .await
        .expect("assign should succeed");
    projector.catch_up().await.expect("catch up should succeed");
    assert_eq!(
        projector.state_of("user-1"),
        SupportState::Active {
            supervisor_user_id: "sup-1".into()
        }
    );

    let service_view = service
        .current_state("user-1")
        .await
        .expect("state read should succeed");
    assert_eq!(service_view, projector.state_of("user-1"));
}

#[tokio::test]
async fn foreign_records_on_the_stream_do_not_break_anything() {
    let log = MemoryLog::new();

    // Some other producer wrote a record shape this crate does not know.
    log.append(
        DEFAULT_STREAM,
        vec![("event".to_owned(), r#"{"type":"panel.created","panelId":"p-1"}"#.to_owned())],
    )
    .await
    .expect("append should succeed");
    log.append(DEFAULT_STREAM, vec![("note".to_owned(), "not an event".to_owned())])
        .await
        .expect("append should succeed");

    let service = AssignmentService::new(log.clone());
    service
        .request_support("user-1")
        .await
        .expect("request should succeed despite foreign records");
    service
        .assign("user-1", "sup-1", None)
        .await
        .expect("assign should succeed despite foreign records");

    let mut projector = StatusProjector::new(log);
    projector.catch_up().await.expect("catch up should succeed");
    assert_eq!(
        projector.state_of("user-1"),
        SupportState::Active {
            supervisor_user_id: "sup-1".into()
        }
    );
}

#[tokio::test]
async fn rejected_assign_reports_state_and_leaves_log_untouched() {
    let log = MemoryLog::new();
    let service = AssignmentService::new(log.clone());

    service
        .request_support("user-1")
        .await
        .expect("request should succeed");
    service
        .resolve("user-1")
        .await
        .expect("resolve should succeed");
    let before = log.len(DEFAULT_STREAM).await;

    let err = service
        .assign("user-1", "sup-1", None)
        .await
        .expect_err("assign on resolved should be rejected");
    match err {
        AssignmentError::InvalidTransition { current } => {
            assert_eq!(current, SupportState::Resolved);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert_eq!(log.len(DEFAULT_STREAM).await, before);
}

#[tokio::test]
async fn jsonl_backend_survives_reopen() {
    let tmp = tempfile::TempDir::new().expect("failed to create temp dir");

    {
        let log = JsonlLog::new(tmp.path());
        let service = AssignmentService::new(log);
        service
            .request_support("user-1")
            .await
            .expect("request should succeed");
        service
            .assign("user-1", "sup-1", None)
            .await
            .expect("assign should succeed");
    }

    // A new process over the same directory sees the same history and
    // continues the lifecycle where it left off.
    let log = JsonlLog::new(tmp.path());
    let service = AssignmentService::new(log.clone());

    let state = service
        .current_state("user-1")
        .await
        .expect("state read should succeed");
    assert_eq!(
        state,
        SupportState::Active {
            supervisor_user_id: "sup-1".into()
        }
    );

    service
        .resolve("user-1")
        .await
        .expect("resolve should succeed");

    let mut projector = StatusProjector::new(log);
    projector.catch_up().await.expect("catch up should succeed");
    assert_eq!(projector.state_of("user-1"), SupportState::Resolved);
}

#[tokio::test]
async fn replaying_a_full_stream_into_a_fresh_projector_is_stable() {
    let log = MemoryLog::new();
    let service = AssignmentService::new(log.clone());

    service
        .request_support("user-1")
        .await
        .expect("request should succeed");
    service
        .assign("user-1", "sup-1", None)
        .await
        .expect("assign should succeed");
    service
        .unassign("user-1")
        .await
        .expect("unassign should succeed");

    // Two independent readers, one of them replaying twice.
    let mut first = StatusProjector::new(log.clone());
    first.catch_up().await.expect("catch up should succeed");

    let mut second = StatusProjector::new(log);
    second.catch_up().await.expect("catch up should succeed");
    second.catch_up().await.expect("second pass should be a no-op");

    assert_eq!(first.state_of("user-1"), second.state_of("user-1"));
    assert_eq!(first.state_of("user-1"), SupportState::Pending);
}
