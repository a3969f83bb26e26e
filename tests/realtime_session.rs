//! End-to-end scenarios across the realtime channels and the event bridge,
//! driven through the public library API.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;

use mindbridge::adapters::events::InMemoryEventBus;
use mindbridge::adapters::memory::{InMemoryMessageStore, InMemoryUserDirectory};
use mindbridge::adapters::websocket::messages::{AnonymousServerEvent, BookedServerEvent};
use mindbridge::adapters::websocket::{AnonymousChannel, BookedChannel, BookingEventBridge};
use mindbridge::domain::foundation::{
    BookingId, ConnectionId, EventEnvelope, RoomId, Role, UserId,
};
use mindbridge::domain::session::MeetingMode;
use mindbridge::ports::{EventPublisher, UserProfile, VerifiedIdentity};

struct AnonClient {
    connection: ConnectionId,
    rx: mpsc::UnboundedReceiver<AnonymousServerEvent>,
}

impl AnonClient {
    async fn connect(channel: &AnonymousChannel) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = channel.connect(tx).await;
        Self { connection, rx }
    }

    fn drain(&mut self) -> Vec<AnonymousServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[tokio::test]
async fn anonymous_session_lifecycle() {
    let store = Arc::new(InMemoryMessageStore::new());
    let channel = AnonymousChannel::new(store.clone(), 0);

    // X searches first and waits.
    let mut x = AnonClient::connect(&channel).await;
    channel.find_match(x.connection, MeetingMode::Chat).await;
    assert_eq!(channel.queue_len(MeetingMode::Chat).await, 1);
    assert!(!x
        .drain()
        .iter()
        .any(|e| matches!(e, AnonymousServerEvent::MatchFound { .. })));

    // Y arrives; both are paired into the same fresh room.
    let mut y = AnonClient::connect(&channel).await;
    channel.find_match(y.connection, MeetingMode::Chat).await;

    let room = x
        .drain()
        .into_iter()
        .find_map(|e| match e {
            AnonymousServerEvent::MatchFound { room_id, .. } => Some(room_id),
            _ => None,
        })
        .expect("X should be matched");
    assert!(y.drain().iter().any(|e| matches!(
        e,
        AnonymousServerEvent::MatchFound { room_id, .. } if *room_id == room
    )));
    assert_eq!(channel.queue_len(MeetingMode::Chat).await, 0);

    // X chats; the message is persisted, acked, and delivered to Y.
    channel
        .send_message(x.connection, room.clone(), "hey stranger".to_string())
        .await;

    let stored = store.anonymous_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sender, x.connection);

    assert!(x.drain().iter().any(|e| matches!(
        e,
        AnonymousServerEvent::MessageAck { success: true, .. }
    )));
    assert!(y.drain().iter().any(|e| matches!(
        e,
        AnonymousServerEvent::NewMessage { message } if message.text == "hey stranger"
    )));

    // X drops; Y learns its partner is gone and is not silently requeued.
    channel.disconnect(x.connection).await;
    assert!(y
        .drain()
        .contains(&AnonymousServerEvent::PartnerDisconnected));
    assert_eq!(channel.pairing_count().await, 0);
    assert_eq!(channel.queue_len(MeetingMode::Chat).await, 0);

    // Y searches again explicitly and waits for the next stranger.
    channel.find_match(y.connection, MeetingMode::Chat).await;
    assert_eq!(channel.queue_len(MeetingMode::Chat).await, 1);
}

#[tokio::test]
async fn booked_session_lifecycle_with_event_bridge() {
    let store = Arc::new(InMemoryMessageStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let channel = Arc::new(BookedChannel::new(store.clone(), directory.clone()));
    let bridge = Arc::new(BookingEventBridge::new(channel.clone(), store.clone()));
    let bus = InMemoryEventBus::new();
    bridge.register(&bus);

    let student = VerifiedIdentity {
        user_id: UserId::new(),
        role: Role::Student,
    };
    let counselor = VerifiedIdentity {
        user_id: UserId::new(),
        role: Role::Counselor,
    };
    directory.upsert(UserProfile {
        user_id: student.user_id,
        username: "student-7".to_string(),
        avatar_url: None,
    });

    let (student_tx, mut student_rx) = mpsc::unbounded_channel();
    let student_conn = channel.connect(student, student_tx).await;
    channel
        .identify(student_conn, &student.user_id.to_string())
        .await;

    let (counselor_tx, mut counselor_rx) = mpsc::unbounded_channel();
    let counselor_conn = channel.connect(counselor, counselor_tx).await;
    channel
        .identify(counselor_conn, &counselor.user_id.to_string())
        .await;

    // The student books; the counselor group hears about it.
    let booking_id = BookingId::new();
    bus.publish(EventEnvelope::new(
        "booking.created",
        json!({"booking": {"id": booking_id.to_string()}}),
    ))
    .await
    .unwrap();

    while student_rx.try_recv().is_ok() {}
    let mut saw_booking = false;
    while let Ok(event) = counselor_rx.try_recv() {
        if matches!(event, BookedServerEvent::BookingCreated { .. }) {
            saw_booking = true;
        }
    }
    assert!(saw_booking);

    // Both sides join the conversation room and chat.
    let room = RoomId::new(format!("room-{}", booking_id)).unwrap();
    channel.join_room(student_conn, room.clone()).await;
    channel.join_room(counselor_conn, room.clone()).await;

    channel
        .send_message(
            student_conn,
            room.clone(),
            &student.user_id.to_string(),
            Some("I'd like to talk".to_string()),
            Some(booking_id),
            None,
            None,
            false,
        )
        .await;

    let delivered = counselor_rx.try_recv().unwrap();
    match delivered {
        BookedServerEvent::NewMessage { message } => {
            assert_eq!(message.text, "I'd like to talk");
            assert_eq!(message.sender.as_ref().unwrap().username, "student-7");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    while student_rx.try_recv().is_ok() {}

    // The counselor ends the session: history purged, then the room told.
    bus.publish(EventEnvelope::new(
        "session.ended",
        json!({
            "roomId": room.to_string(),
            "bookingId": booking_id.to_string(),
        }),
    ))
    .await
    .unwrap();

    assert!(store.booked_in_room(&room).is_empty());
    assert_eq!(
        student_rx.try_recv().unwrap(),
        BookedServerEvent::SessionEnded { booking_id }
    );
}

#[tokio::test]
async fn presence_survives_stale_disconnect_and_routes_calls() {
    let store = Arc::new(InMemoryMessageStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let channel = BookedChannel::new(store, directory);

    let callee = VerifiedIdentity {
        user_id: UserId::new(),
        role: Role::Counselor,
    };
    let caller = VerifiedIdentity {
        user_id: UserId::new(),
        role: Role::Student,
    };

    // The callee reconnects: old socket lingers, new one takes over.
    let (old_tx, mut old_rx) = mpsc::unbounded_channel();
    let old_conn = channel.connect(callee, old_tx).await;
    channel.identify(old_conn, &callee.user_id.to_string()).await;

    let (new_tx, mut new_rx) = mpsc::unbounded_channel();
    let new_conn = channel.connect(callee, new_tx).await;
    channel.identify(new_conn, &callee.user_id.to_string()).await;

    // The stale socket finally reports its disconnect.
    channel.disconnect(old_conn).await;
    assert!(channel.is_present(&callee.user_id).await);

    let (caller_tx, mut caller_rx) = mpsc::unbounded_channel();
    let caller_conn = channel.connect(caller, caller_tx).await;
    while caller_rx.try_recv().is_ok() {}
    while old_rx.try_recv().is_ok() {}
    while new_rx.try_recv().is_ok() {}

    channel
        .call_user(caller_conn, callee.user_id, json!({"sdp": "offer"}), None)
        .await;

    // The offer lands on the live socket only, naming the verified caller.
    assert!(old_rx.try_recv().is_err());
    match new_rx.try_recv().unwrap() {
        BookedServerEvent::CallOffer { from, .. } => assert_eq!(from, caller.user_id),
        other => panic!("unexpected event: {:?}", other),
    }
}
