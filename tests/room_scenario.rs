//! End-to-end room behaviour driven through the public facade
//! Run with: cargo test --test room_scenario

use std::sync::{Arc, Once};

use chrono::Duration;
use presence_chat::infrastructure::clock::ManualClock;
use presence_chat::infrastructure::config::Config;
use presence_chat::infrastructure::database::SqliteStore;
use presence_chat::infrastructure::storage::MemoryStore;
use presence_chat::{ChatError, ChatRoom, MessageKind};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn memory_room(clock: &ManualClock) -> ChatRoom {
    let store = Arc::new(MemoryStore::new());
    ChatRoom::from_config(&Config::default(), store.clone(), store, Arc::new(clock.clone()))
}

fn texts(messages: &[presence_chat::Message]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

async fn walk_through_scenario(room: ChatRoom, clock: ManualClock) {
    // Ana joins, everyone sees it
    room.register("Ana").await.unwrap();
    let carla = room.get_messages("Carla", None).await.unwrap();
    assert_eq!(carla.len(), 1);
    assert_eq!(carla[0].kind, MessageKind::Status);
    assert_eq!(carla[0].text, "joined");

    // Bruno is not here yet
    assert!(matches!(
        room.post_message("Ana", "Bruno", "oi", MessageKind::Private).await,
        Err(ChatError::UnknownSender(ref n)) if n == "Bruno"
    ));
    assert!(matches!(
        room.post_message("Bruno", "Todos", "oi", MessageKind::Broadcast).await,
        Err(ChatError::UnknownSender(_))
    ));

    room.register("Bruno").await.unwrap();
    room.post_message("Ana", "Bruno", "oi", MessageKind::Private).await.unwrap();

    let ana = room.get_messages("Ana", None).await.unwrap();
    let bruno = room.get_messages("Bruno", None).await.unwrap();
    let carla = room.get_messages("Carla", None).await.unwrap();
    assert_eq!(texts(&ana), vec!["joined", "joined", "oi"]);
    assert_eq!(texts(&bruno), vec!["joined", "joined", "oi"]);
    assert_eq!(texts(&carla), vec!["joined", "joined"]);

    // Bruno keeps beating, Ana goes silent
    clock.advance(Duration::seconds(6));
    room.heartbeat("Bruno").await.unwrap();
    clock.advance(Duration::seconds(5));

    let report = room.sweeper().sweep().await.unwrap();
    assert_eq!(report.evicted, vec!["Ana".to_string()]);

    let carla = room.get_messages("Carla", None).await.unwrap();
    let last = carla.last().unwrap();
    assert_eq!((last.from.as_str(), last.text.as_str(), last.kind), ("Ana", "left", MessageKind::Status));
    assert_eq!(last.to, "Todos");

    assert!(matches!(room.heartbeat("Ana").await, Err(ChatError::NotFound(_))));
    let names: Vec<String> = room.list_participants().await.unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Bruno"]);

    // messages outlive their sender
    let bruno = room.get_messages("Bruno", None).await.unwrap();
    assert!(bruno.iter().any(|m| m.from == "Ana" && m.text == "oi"));

    // re-joining takes a fresh registration
    room.register("Ana").await.unwrap();
    room.heartbeat("Ana").await.unwrap();
}

#[tokio::test]
async fn test_end_to_end_memory() {
    ensure_init();
    let clock = ManualClock::default();
    walk_through_scenario(memory_room(&clock), clock).await;
}

#[tokio::test]
async fn test_end_to_end_sqlite() {
    ensure_init();
    let clock = ManualClock::default();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let room = ChatRoom::from_config(&Config::default(), store.clone(), store, Arc::new(clock.clone()));
    walk_through_scenario(room, clock).await;
}

#[tokio::test]
async fn test_limit_counts_visible_messages_only() {
    ensure_init();
    let clock = ManualClock::default();
    let room = memory_room(&clock);

    room.register("Ana").await.unwrap();
    room.register("Bruno").await.unwrap();
    room.post_message("Ana", "Todos", "one", MessageKind::Broadcast).await.unwrap();
    room.post_message("Ana", "Bruno", "secret", MessageKind::Private).await.unwrap();
    room.post_message("Bruno", "Ana", "secret too", MessageKind::Private).await.unwrap();

    let carla = room.get_messages("Carla", Some(2)).await.unwrap();
    assert_eq!(texts(&carla), vec!["joined", "one"]);

    let bruno = room.get_messages("Bruno", Some(2)).await.unwrap();
    assert_eq!(texts(&bruno), vec!["secret", "secret too"]);

    assert_eq!(room.get_messages("Carla", None).await.unwrap().len(), 3);
    assert_eq!(room.get_messages("Carla", Some(0)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_heartbeat_never_moves_time_backward() {
    ensure_init();
    let clock = ManualClock::default();
    let room = memory_room(&clock);
    room.register("Ana").await.unwrap();

    clock.advance(Duration::seconds(5));
    room.heartbeat("Ana").await.unwrap();
    let seen = room.registry().lookup("Ana").await.unwrap().unwrap().last_seen_at;

    clock.advance(Duration::seconds(-3));
    room.heartbeat("Ana").await.unwrap();
    assert_eq!(room.registry().lookup("Ana").await.unwrap().unwrap().last_seen_at, seen);
}

#[tokio::test]
async fn test_legacy_visibility_from_config() {
    ensure_init();
    let clock = ManualClock::default();
    let mut config = Config::default();
    config.visibility.private_to_everyone_is_public = true;
    let store = Arc::new(MemoryStore::new());
    let room = ChatRoom::from_config(&config, store.clone(), store, Arc::new(clock.clone()));

    room.register("Ana").await.unwrap();
    room.post_message("Ana", "Todos", "to all, privately", MessageKind::Private).await.unwrap();

    let carla = room.get_messages("Carla", None).await.unwrap();
    assert_eq!(texts(&carla), vec!["joined", "to all, privately"]);
}
