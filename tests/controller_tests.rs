//! Concurrency tests for the discussion controller: interleaved operations,
//! context switches and late responses.

use comment_forest::service::ServiceCall;
use comment_forest::tree::ops::{check_consistency, find};
use comment_forest::{
    CommentId, CommentNode, ContextKey, DiscussionController, EngineConfig, ForestError, Forest,
    MemoryCommentService, OperationKind, Outcome, Session,
};
use std::sync::Arc;

fn alice() -> Session {
    Session::new("u1", "Alice", "alice-token")
}

fn seeded_service() -> Arc<MemoryCommentService> {
    let service = Arc::new(MemoryCommentService::new());
    service
        .seed(
            &ContextKey::topic("a"),
            &Forest::from_roots(vec![
                CommentNode::new(1u64, "by bob", "u2", "Bob", 0),
                CommentNode::new(2u64, "by alice", "u1", "Alice", 0),
                CommentNode::new(3u64, "also alice", "u1", "Alice", 0),
            ]),
        )
        .unwrap();
    service
        .seed(
            &ContextKey::content("a", "intro"),
            &Forest::from_roots(vec![CommentNode::new(10u64, "other", "u1", "Alice", 0)]),
        )
        .unwrap();
    service
}

/// Waits until the service has received `count` calls.
async fn wait_for_calls(service: &MemoryCommentService, count: usize) {
    while service.calls().len() < count {
        tokio::task::yield_now().await;
    }
}

/// Operations on different comments settle independently; a rejection only
/// undoes its own change.
#[tokio::test]
async fn test_rollback_does_not_revert_other_operations() {
    let service = seeded_service();
    let (controller, mut events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    controller.load(ContextKey::topic("a")).await.unwrap();
    service.pause();

    // Bob's comment cannot be edited by Alice: the service rejects it.
    let edit = controller
        .submit_edit(&alice(), CommentId::from(1), "hijacked")
        .unwrap();
    let reply = controller
        .submit_reply(&alice(), CommentId::from(2), "a reply")
        .unwrap();
    let delete = controller
        .submit_delete(&alice(), CommentId::from(3))
        .unwrap();
    assert_eq!(controller.in_flight_count(), 3);

    service.resume();
    let (edit, reply, delete) = tokio::join!(edit.settled(), reply.settled(), delete.settled());

    assert!(edit.is_rolled_back());
    assert!(reply.is_confirmed());
    assert!(delete.is_confirmed());

    let forest = controller.forest();
    assert_eq!(find(&forest, &CommentId::from(1)).unwrap().body, "by bob");
    let two = find(&forest, &CommentId::from(2)).unwrap();
    assert_eq!(two.reply_count, 1);
    assert!(!two.children[0].is_pending);
    assert!(!find(&forest, &CommentId::from(3)).unwrap().is_active);
    assert!(check_consistency(&forest).is_empty());
    assert!(forest.iter().all(|(_, node)| !node.is_pending));

    let mut kinds = Vec::new();
    for _ in 0..3 {
        kinds.push(events.recv().await.unwrap().kind);
    }
    assert!(kinds.contains(&OperationKind::EditBody));
    assert!(kinds.contains(&OperationKind::AddReply));
    assert!(kinds.contains(&OperationKind::ToggleActive));
}

/// Two replies to the same parent are separate comments and may be in
/// flight together.
#[tokio::test]
async fn test_sibling_replies_in_flight_together() {
    let service = seeded_service();
    let (controller, _events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    controller.load(ContextKey::topic("a")).await.unwrap();
    service.pause();

    let first = controller
        .submit_reply(&alice(), CommentId::from(2), "first")
        .unwrap();
    let second = controller
        .submit_reply(&alice(), CommentId::from(3), "second")
        .unwrap();
    assert_ne!(first.target(), second.target());

    service.resume();
    assert!(first.settled().await.is_confirmed());
    assert!(second.settled().await.is_confirmed());
    assert_eq!(controller.in_flight_count(), 0);
}

/// A response that arrives after the context switched is ignored.
#[tokio::test]
async fn test_late_response_after_context_switch() {
    let service = seeded_service();
    let (controller, mut events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    controller.load(ContextKey::topic("a")).await.unwrap();
    service.pause();

    let reply = controller
        .submit_reply(&alice(), CommentId::from(2), "late")
        .unwrap();
    wait_for_calls(&service, 2).await;

    // Switch while the reply is held by the service.
    let switch = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load(ContextKey::content("a", "intro")).await })
    };
    wait_for_calls(&service, 3).await;
    assert_eq!(controller.in_flight_count(), 0);
    service.resume();

    switch.await.unwrap().unwrap();
    assert_eq!(reply.settled().await, Outcome::Discarded);

    let forest = controller.forest();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest.roots()[0].id, CommentId::from(10));
    assert!(forest.iter().all(|(_, node)| !node.is_pending));
    assert_eq!(
        controller.context(),
        Some(ContextKey::content("a", "intro"))
    );
    assert_eq!(events.recv().await.unwrap().outcome, Outcome::Discarded);
}

/// Reloading the same context aborts the outstanding request, so a new
/// operation on that comment never races the old one.
#[tokio::test]
async fn test_reload_aborts_outstanding_request() {
    let service = seeded_service();
    let (controller, mut events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    controller.load(ContextKey::topic("a")).await.unwrap();
    service.pause();

    let stale = controller
        .submit_edit(&alice(), CommentId::from(2), "first")
        .unwrap();
    wait_for_calls(&service, 2).await;

    let reload = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load(ContextKey::topic("a")).await })
    };
    wait_for_calls(&service, 3).await;
    assert!(!controller.is_in_flight(&CommentId::from(2)));
    service.resume();

    reload.await.unwrap().unwrap();
    assert_eq!(stale.settled().await, Outcome::Discarded);
    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, OperationKind::EditBody);
    assert_eq!(event.outcome, Outcome::Discarded);
    assert_eq!(
        find(&controller.forest(), &CommentId::from(2)).unwrap().body,
        "by alice"
    );

    let fresh = controller
        .submit_edit(&alice(), CommentId::from(2), "second")
        .unwrap();
    assert!(fresh.settled().await.is_confirmed());

    controller.load(ContextKey::topic("a")).await.unwrap();
    let stored = find(&controller.forest(), &CommentId::from(2)).unwrap().clone();
    assert_eq!(stored.body, "second");
    assert!(stored.is_edited);
}

/// A load overtaken by another load does not install its forest.
#[tokio::test]
async fn test_superseded_load() {
    let service = seeded_service();
    let (controller, _events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    service.pause();

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load(ContextKey::topic("a")).await })
    };
    wait_for_calls(&service, 1).await;
    let second = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.load(ContextKey::content("a", "intro")).await })
    };
    wait_for_calls(&service, 2).await;
    service.resume();

    assert!(matches!(
        first.await.unwrap(),
        Err(ForestError::ContextChanged)
    ));
    second.await.unwrap().unwrap();
    assert_eq!(controller.forest().roots()[0].id, CommentId::from(10));
    assert_eq!(
        service.calls(),
        vec![
            ServiceCall::List(ContextKey::topic("a")),
            ServiceCall::List(ContextKey::content("a", "intro")),
        ]
    );
}

/// A failed load leaves the context selected with an empty forest.
#[tokio::test]
async fn test_failed_load() {
    let service = seeded_service();
    let (controller, _events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    service.fail_next(1);

    let result = controller.load(ContextKey::topic("a")).await;
    assert!(matches!(result, Err(ForestError::RemoteRejected(_))));
    assert!(controller.forest().is_empty());
    assert_eq!(controller.context(), Some(ContextKey::topic("a")));

    controller.load(ContextKey::topic("a")).await.unwrap();
    assert_eq!(controller.forest().len(), 3);
}

/// Every context variant selects its own list call.
#[tokio::test]
async fn test_context_variants_use_matching_list_call() {
    let service = Arc::new(MemoryCommentService::new());
    let (controller, _events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    let contexts = [
        ContextKey::topic("t"),
        ContextKey::content("t", "c"),
        ContextKey::knowledge_path("k"),
    ];
    for context in &contexts {
        controller.load(context.clone()).await.unwrap();
    }
    let expected: Vec<ServiceCall> = contexts.iter().cloned().map(ServiceCall::List).collect();
    assert_eq!(service.calls(), expected);
}

/// Watch subscribers observe the optimistic forest and the reconciled one.
#[tokio::test]
async fn test_subscriber_sees_rollback() {
    let service = seeded_service();
    let (controller, _events) =
        DiscussionController::new(service.clone(), EngineConfig::default()).unwrap();
    controller.load(ContextKey::topic("a")).await.unwrap();
    let mut forests = controller.subscribe();
    let before = controller.forest();
    service.pause();
    service.fail_next(1);

    let submission = controller
        .submit_reply(&alice(), CommentId::from(2), "doomed")
        .unwrap();
    forests.changed().await.unwrap();
    assert_eq!(
        find(&forests.borrow_and_update(), &CommentId::from(2))
            .unwrap()
            .reply_count,
        1
    );

    service.resume();
    forests.changed().await.unwrap();
    assert_eq!(*forests.borrow_and_update(), before);
    assert!(submission.settled().await.is_rolled_back());
}
