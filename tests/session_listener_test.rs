use std::sync::Arc;
use std::time::Duration;

use unitrack::cache::LoadState;
use unitrack::models::{NewCourseRequest, Session};
use unitrack::remote::{Collection, InMemoryRemoteStore, Operation, RemoteStore};
use unitrack::services::{
    Backend, SessionEvent, SessionHub, SessionListener, SessionTransition, SyncService, SyncStrategy,
};

fn session(user: &str, token: &str) -> Session {
    Session {
        user_id: user.to_string(),
        email: None,
        access_token: token.to_string(),
    }
}

fn service(store: &Arc<InMemoryRemoteStore>) -> Arc<SyncService> {
    let remote: Arc<dyn RemoteStore> = store.clone();
    Arc::new(SyncService::new(Backend::Remote(remote), SyncStrategy::default()))
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for the listener");
}

#[tokio::test]
async fn test_first_event_repeating_initial_session_is_ignored() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);
    let hub = SessionHub::new();
    hub.sign_in(session("alice", "t1")).await;

    sync.initialize(&hub).await.expect("Failed to initialize");
    assert_eq!(store.calls(Collection::Courses, Operation::Select), 1);

    let transition = sync
        .handle_event(SessionEvent::SignedIn(session("alice", "t1")))
        .await;

    assert_eq!(transition, SessionTransition::Ignored);
    assert_eq!(store.calls(Collection::Courses, Operation::Select), 1);
}

#[tokio::test]
async fn test_token_refresh_does_not_refetch() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);
    sync.apply_session(Some(session("alice", "t1"))).await;

    let transition = sync.apply_session(Some(session("alice", "t2"))).await;

    assert_eq!(transition, SessionTransition::Refreshed);
    assert_eq!(store.calls(Collection::Courses, Operation::Select), 1);
    assert_eq!(
        sync.current_session().await.map(|s| s.access_token),
        Some("t2".to_string())
    );
}

#[tokio::test]
async fn test_without_session_nothing_is_loaded() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);
    let hub = SessionHub::new();

    sync.initialize(&hub).await.expect("Failed to initialize");

    assert_eq!(store.calls(Collection::Courses, Operation::Select), 0);
    assert_eq!(sync.cache().load_state().await, LoadState::Idle);
}

#[tokio::test]
async fn test_listener_follows_sign_in_and_sign_out() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);
    let hub = SessionHub::new();

    let listener = SessionListener::new(sync.clone(), &hub);
    sync.initialize(&hub).await.expect("Failed to initialize");
    let handle = tokio::spawn(listener.start());

    hub.sign_in(session("alice", "t1")).await;
    wait_until(|| {
        let sync = sync.clone();
        async move { sync.cache().load_state().await == LoadState::Loaded }
    })
    .await;

    sync.create_course(NewCourseRequest {
        name: "CS101".to_string(),
        color: None,
        icon: None,
    })
    .await
    .expect("Failed to create course");
    assert_eq!(sync.courses().await.len(), 1);

    hub.sign_out().await;
    wait_until(|| {
        let sync = sync.clone();
        async move { sync.cache().load_state().await == LoadState::Idle }
    })
    .await;
    assert!(sync.courses().await.is_empty());
    assert!(sync.current_session().await.is_none());

    // the listener stops once every hub handle is gone
    drop(hub);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("Listener did not stop")
        .expect("Listener panicked");
}

#[tokio::test]
async fn test_switching_owner_reloads_their_data() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);

    sync.apply_session(Some(session("alice", "t1"))).await;
    sync.create_course(NewCourseRequest {
        name: "CS101".to_string(),
        color: None,
        icon: None,
    })
    .await
    .expect("Failed to create course");

    let transition = sync.apply_session(Some(session("bob", "t9"))).await;
    assert_eq!(transition, SessionTransition::Reloaded);
    assert!(sync.courses().await.is_empty());

    sync.apply_session(Some(session("alice", "t3"))).await;
    assert_eq!(sync.courses().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_sign_in_handled_twice_loads_once() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let sync = service(&store);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let sync = sync.clone();
            tokio::spawn(async move { sync.apply_session(Some(session("alice", "t1"))).await })
        })
        .collect();

    let mut transitions = Vec::new();
    for handle in handles {
        transitions.push(handle.await.expect("task panicked"));
    }

    let reloaded = transitions
        .iter()
        .filter(|t| **t == SessionTransition::Reloaded)
        .count();
    assert_eq!(reloaded, 1);
    assert!(transitions.contains(&SessionTransition::Ignored));
    assert_eq!(store.calls(Collection::Courses, Operation::Select), 1);
}
