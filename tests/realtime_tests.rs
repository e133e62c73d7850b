//! End-to-end tests for the realtime core over in-memory collaborators:
//! room membership, ordered dispatch, quoting, read receipts, typing, and
//! push hand-off.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use test_case::test_case;

use support_chat_server::domain::{
    Message, MessageKind, MessageStore, NewMessage, QuoteView,
};
use support_chat_server::presentation::websocket::{
    MessageDispatcher, PresenceRegistry, RoomHub, ServerEvent,
};
use support_chat_server::presentation::websocket::events::{
    MarkReadPayload, SendMessagePayload,
};
use support_chat_server::shared::error::AppError;

use common::{
    assert_silent, client, drain, next_event, room, technician, Harness, RecordingNotifier,
    StaticRoomDirectory,
};

fn text_message(room_id: i64, body: &str) -> SendMessagePayload {
    SendMessagePayload {
        room_id,
        body: Some(body.to_string()),
        kind: MessageKind::Text,
        file_url: None,
        file_name: None,
        file_size: None,
        quoted_id: None,
    }
}

#[tokio::test]
async fn broadcast_reaches_all_subscribers_in_send_order() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, mut c_rx) = harness.connect(&carol).await;
    let (_t_session, mut t_rx) = harness.connect(&theo).await;
    drain(&mut c_rx);

    harness
        .dispatcher
        .send(&c_session, text_message(7, "first"))
        .await
        .unwrap();
    harness
        .dispatcher
        .send(&c_session, text_message(7, "second"))
        .await
        .unwrap();

    for rx in [&mut c_rx, &mut t_rx] {
        for expected in ["first", "second"] {
            match next_event(rx) {
                ServerEvent::NewMessage(view) => {
                    assert_eq!(view.body, expected);
                    assert_eq!(view.room_id, 7);
                    assert_eq!(view.sender_username, "carol");
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_silent(rx);
    }

    assert_eq!(harness.store.message_count(), 2);
}

#[tokio::test]
async fn sending_to_an_unjoined_room_is_denied() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let mallory = client(9, "mallory");
    let harness = Harness::new(
        vec![room(7, &carol, &theo)],
        &[carol.clone(), theo.clone(), mallory.clone()],
    );

    let (_t_session, mut t_rx) = harness.connect(&theo).await;
    let (m_session, _m_rx) = harness.connect(&mallory).await;

    let err = harness
        .dispatcher
        .send(&m_session, text_message(7, "let me in"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccessDenied(_)));
    assert_eq!(harness.store.message_count(), 0);
    assert_silent(&mut t_rx);
}

#[tokio::test]
async fn quotes_must_reference_the_same_room() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let dave = client(3, "dave");
    let tina = technician(4, "tina");
    let harness = Harness::new(
        vec![room(7, &carol, &theo), room(8, &dave, &tina)],
        &[carol.clone(), theo.clone(), dave.clone(), tina.clone()],
    );

    let foreign = harness
        .store
        .append(&NewMessage {
            room_id: 8,
            sender_id: dave.id,
            body: "elsewhere".into(),
            kind: MessageKind::Text,
            file_url: None,
            file_name: None,
            file_size: None,
            quoted_id: None,
        })
        .await
        .unwrap();

    let (c_session, _c_rx) = harness.connect(&carol).await;
    let (_t_session, mut t_rx) = harness.connect(&theo).await;

    let mut payload = text_message(7, "replying across rooms");
    payload.quoted_id = Some(foreign.id);
    let err = harness.dispatcher.send(&c_session, payload).await.unwrap_err();

    assert!(matches!(err, AppError::InvalidQuote));
    assert_eq!(harness.store.message_count(), 1);
    assert_silent(&mut t_rx);

    // A quote of a message that never existed fails the same way
    let mut payload = text_message(7, "replying to nothing");
    payload.quoted_id = Some(424242);
    let err = harness.dispatcher.send(&c_session, payload).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidQuote));
}

#[tokio::test]
async fn quoted_message_is_hydrated_on_broadcast() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, mut c_rx) = harness.connect(&carol).await;
    let (t_session, mut t_rx) = harness.connect(&theo).await;
    drain(&mut c_rx);

    let original = harness
        .dispatcher
        .send(&c_session, text_message(7, "does it reboot?"))
        .await
        .unwrap();
    next_event(&mut c_rx);
    next_event(&mut t_rx);

    let mut reply = text_message(7, "yes, twice");
    reply.quoted_id = Some(original.id);
    harness.dispatcher.send(&t_session, reply).await.unwrap();

    match next_event(&mut c_rx) {
        ServerEvent::NewMessage(view) => {
            assert_eq!(view.quoted_id, Some(original.id));
            let quoted = view.quoted.expect("quote should be hydrated");
            assert_eq!(quoted.body, "does it reboot?");
            assert_eq!(quoted.sender_username, "carol");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn join_returns_the_capped_recent_backlog() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::with_backlog_limit(
        vec![room(7, &carol, &theo)],
        &[carol.clone(), theo.clone()],
        2,
    );

    let (c_session, mut c_rx) = harness.connect(&carol).await;
    for body in ["one", "two", "three"] {
        harness
            .dispatcher
            .send(&c_session, text_message(7, body))
            .await
            .unwrap();
        next_event(&mut c_rx);
    }

    let (t_session, _t_rx) = harness.connect(&theo).await;
    let (joined, backlog) = harness.rooms.join(&t_session, 7).await.unwrap();

    assert_eq!(joined.id, 7);
    let bodies: Vec<&str> = backlog.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["two", "three"]);

    // Rejoining is idempotent and returns the snapshot again
    let (_, backlog) = harness.rooms.join(&t_session, 7).await.unwrap();
    assert_eq!(backlog.len(), 2);
    assert_eq!(harness.hub.members_of(7).len(), 2);
}

#[tokio::test]
async fn join_is_refused_outside_membership() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let mallory = client(9, "mallory");
    let harness = Harness::new(
        vec![room(7, &carol, &theo)],
        &[carol.clone(), theo.clone(), mallory.clone()],
    );

    let (m_session, _m_rx) = harness.connect(&mallory).await;

    let err = harness.rooms.join(&m_session, 7).await.unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)));
    assert!(!harness.hub.is_subscribed(&m_session.id, 7));

    let err = harness.rooms.join(&m_session, 404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn read_receipts_record_once_and_broadcast_to_others() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, mut c_rx) = harness.connect(&carol).await;
    let (t_session, mut t_rx) = harness.connect(&theo).await;
    drain(&mut c_rx);

    let sent = harness
        .dispatcher
        .send(&c_session, text_message(7, "hi"))
        .await
        .unwrap();
    next_event(&mut c_rx);
    next_event(&mut t_rx);

    let marked = harness
        .receipts
        .mark_read(
            &t_session,
            MarkReadPayload {
                room_id: 7,
                message_ids: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(marked, vec![sent.id]);
    assert_eq!(harness.receipt_store.receipt_count(), 1);
    assert!(harness.store.stored(sent.id).unwrap().read);

    match next_event(&mut c_rx) {
        ServerEvent::MessagesRead {
            room_id,
            user_id,
            message_ids,
            ..
        } => {
            assert_eq!(room_id, 7);
            assert_eq!(user_id, theo.id);
            assert_eq!(message_ids, vec![sent.id]);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    // The marker itself is skipped
    assert_silent(&mut t_rx);

    // Marking everything again finds no unread targets and broadcasts nothing
    let marked = harness
        .receipts
        .mark_read(
            &t_session,
            MarkReadPayload {
                room_id: 7,
                message_ids: None,
            },
        )
        .await
        .unwrap();
    assert!(marked.is_empty());
    assert_eq!(harness.receipt_store.receipt_count(), 1);
    assert_silent(&mut c_rx);

    // Explicit ids target again for UI resync, but the receipt set never grows
    harness
        .receipts
        .mark_read(
            &t_session,
            MarkReadPayload {
                room_id: 7,
                message_ids: Some(vec![sent.id]),
            },
        )
        .await
        .unwrap();
    assert_eq!(harness.receipt_store.receipt_count(), 1);
}

#[tokio::test]
async fn own_messages_are_never_receipt_targets() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, mut c_rx) = harness.connect(&carol).await;
    let (_t_session, mut t_rx) = harness.connect(&theo).await;
    drain(&mut c_rx);

    let sent = harness
        .dispatcher
        .send(&c_session, text_message(7, "note to self"))
        .await
        .unwrap();
    next_event(&mut c_rx);
    next_event(&mut t_rx);

    let marked = harness
        .receipts
        .mark_read(
            &c_session,
            MarkReadPayload {
                room_id: 7,
                message_ids: Some(vec![sent.id]),
            },
        )
        .await
        .unwrap();

    assert!(marked.is_empty());
    assert_eq!(harness.receipt_store.receipt_count(), 0);
    assert!(!harness.store.stored(sent.id).unwrap().read);
    assert_silent(&mut t_rx);
}

#[tokio::test]
async fn typing_events_skip_the_typist() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (_c_session, mut c_rx) = harness.connect(&carol).await;
    let (t_session, mut t_rx) = harness.connect(&theo).await;
    drain(&mut c_rx);

    harness.typing.start(&t_session, 7).unwrap();
    match next_event(&mut c_rx) {
        ServerEvent::UserTyping { user_id, .. } => assert_eq!(user_id, theo.id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert_silent(&mut t_rx);

    harness.typing.stop(&t_session, 7).unwrap();
    match next_event(&mut c_rx) {
        ServerEvent::UserStoppedTyping { user_id, .. } => assert_eq!(user_id, theo.id),
        other => panic!("unexpected event: {:?}", other),
    }

    // Typing in a room the session never joined is refused
    let err = harness.typing.start(&t_session, 9).unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)));
}

#[tokio::test]
async fn presence_broadcasts_fire_only_on_edge_transitions() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (_c_session, mut c_rx) = harness.connect(&carol).await;

    // First technician device: the room hears the 0->1 transition
    let (t1, mut t1_rx) = harness.connect(&theo).await;
    match next_event(&mut c_rx) {
        ServerEvent::UserOnline { user_id, username } => {
            assert_eq!(user_id, theo.id);
            assert_eq!(username, "theo");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    // The connecting session never hears its own transition
    assert_silent(&mut t1_rx);
    assert_eq!(
        harness.presence_store.marked_online(),
        vec![carol.id, theo.id]
    );

    // Second device: already online, nothing to broadcast
    let (t2, _t2_rx) = harness.connect(&theo).await;
    assert_silent(&mut c_rx);

    // First device leaves: still online through the second one
    harness.disconnect(&t1).await;
    assert_silent(&mut c_rx);
    assert!(harness.presence.is_online(theo.id));

    // Last device leaves: the rooms it was subscribed to hear user_offline
    harness.disconnect(&t2).await;
    match next_event(&mut c_rx) {
        ServerEvent::UserOffline { user_id, .. } => assert_eq!(user_id, theo.id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!harness.presence.is_online(theo.id));
    assert_eq!(harness.presence_store.marked_offline(), vec![theo.id]);
    assert_eq!(harness.hub.members_of(7).len(), 1);

    // Redundant teardown is a no-op
    harness.disconnect(&t2).await;
    assert_silent(&mut c_rx);
}

#[tokio::test]
async fn offline_counterpart_is_handed_to_the_notifier() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    // Only the client connects; the technician is offline
    let (c_session, _c_rx) = harness.connect(&carol).await;

    let sent = harness
        .dispatcher
        .send(&c_session, text_message(7, "are you there?"))
        .await
        .unwrap();

    let handoffs = harness.notifier.sent();
    assert_eq!(handoffs.len(), 1);
    assert_eq!(handoffs[0].user_id, theo.id);
    assert_eq!(handoffs[0].message_id, sent.id);
    assert_eq!(handoffs[0].preview, "are you there?");
}

#[tokio::test]
async fn online_counterpart_gets_no_push() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, _c_rx) = harness.connect(&carol).await;
    let (_t_session, _t_rx) = harness.connect(&theo).await;

    harness
        .dispatcher
        .send(&c_session, text_message(7, "hello"))
        .await
        .unwrap();

    assert!(harness.notifier.sent().is_empty());
}

#[test_case(Some(String::new()), MessageKind::Text ; "blank text body")]
#[test_case(None, MessageKind::Text ; "missing text body")]
#[test_case(Some("caption".to_string()), MessageKind::Image ; "file kind without file reference")]
#[tokio::test]
async fn invalid_payloads_are_rejected(body: Option<String>, kind: MessageKind) {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, _c_rx) = harness.connect(&carol).await;

    let payload = SendMessagePayload {
        room_id: 7,
        body,
        kind,
        file_url: None,
        file_name: None,
        file_size: None,
        quoted_id: None,
    };
    let err = harness.dispatcher.send(&c_session, payload).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(harness.store.message_count(), 0);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");
    let harness = Harness::new(vec![room(7, &carol, &theo)], &[carol.clone(), theo.clone()]);

    let (c_session, _c_rx) = harness.connect(&carol).await;

    let err = harness
        .dispatcher
        .send(&c_session, text_message(7, &"x".repeat(4001)))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(harness.store.message_count(), 0);
}

mockall::mock! {
    Store {}

    #[async_trait]
    impl MessageStore for Store {
        async fn append(&self, draft: &NewMessage) -> Result<Message, AppError>;
        async fn recent(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, AppError>;
        async fn fetch_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;
        async fn quote_view(&self, id: i64) -> Result<Option<QuoteView>, AppError>;
        async fn set_read(&self, room_id: i64, message_ids: &[i64]) -> Result<(), AppError>;
        async fn unread_ids(&self, room_id: i64, reader_id: i64) -> Result<Vec<i64>, AppError>;
        async fn readable_ids(
            &self,
            room_id: i64,
            reader_id: i64,
            candidates: &[i64],
        ) -> Result<Vec<i64>, AppError>;
    }
}

#[tokio::test]
async fn append_failure_reaches_no_subscriber() {
    let carol = client(1, "carol");
    let theo = technician(2, "theo");

    let mut store = MockStore::new();
    store
        .expect_append()
        .returning(|_| Err(AppError::Internal("append failed".into())));

    let hub = Arc::new(RoomHub::new());
    let presence = Arc::new(PresenceRegistry::new());
    let directory = Arc::new(StaticRoomDirectory::new(vec![room(7, &carol, &theo)]));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = MessageDispatcher::new(
        hub.clone(),
        presence,
        directory,
        Arc::new(store),
        notifier.clone(),
    );

    let (c_session, _c_rx) =
        support_chat_server::presentation::websocket::ConnectedSession::new(carol.clone());
    let (t_session, mut t_rx) =
        support_chat_server::presentation::websocket::ConnectedSession::new(theo.clone());
    hub.register(c_session.clone());
    hub.register(t_session.clone());
    hub.subscribe(&c_session.id, 7);
    hub.subscribe(&t_session.id, 7);

    let err = dispatcher
        .send(&c_session, text_message(7, "doomed"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(t_rx.try_recv().is_err(), "failed append must not broadcast");
    assert!(notifier.sent().is_empty());
}
