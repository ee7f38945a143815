//! 端到端场景：注册表与各服务协同，复现完整的用户流程。

use uuid::Uuid;

use crate::events::LiveEvent;
use crate::services::test_support::TestEnv;
use crate::services::{
    AuthenticateUserRequest, SendPrivateMessageRequest, SendRoomMessageRequest,
};

/// A 建房，B 加入并发言，双方的在线连接都收到同一条消息。
#[tokio::test]
async fn room_message_reaches_every_live_participant() {
    let env = TestEnv::new();

    let alice = env.register_user("alice", "alice@example.com").await;
    env.user_service
        .authenticate(AuthenticateUserRequest {
            email: "alice@example.com".into(),
            password: TestEnv::DEFAULT_PASSWORD.into(),
        })
        .await
        .unwrap();
    let room = env.create_room(&alice, "general").await;

    let bob = env.register_user("bob", "bob@example.com").await;
    env.room_service.join(room.id, bob.id).await.unwrap();
    let (_, participants) = env.room_service.get_room(room.id).await.unwrap();
    assert_eq!(participants.len(), 2);

    let mut alice_live = env.registry.register(alice.id).await;
    let mut bob_live = env.registry.register(bob.id).await;
    env.registry
        .join(alice_live.session_id, room.id)
        .await
        .unwrap();
    env.registry
        .join(bob_live.session_id, room.id)
        .await
        .unwrap();

    env.message_service
        .send_room_message(SendRoomMessageRequest {
            room_id: room.id.into(),
            sender_id: bob.id.into(),
            content: "hi".into(),
        })
        .await
        .unwrap();

    for live in [&mut alice_live, &mut bob_live] {
        match live.events.try_recv().unwrap() {
            LiveEvent::Message {
                content, sender_id, ..
            } => {
                assert_eq!(content, "hi");
                assert_eq!(sender_id, Uuid::from(bob.id));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(live.events.try_recv().is_err());
    }
}

/// 离线私聊：B 上线后看到未读消息，已读标记幂等，发送者无权标记。
#[tokio::test]
async fn offline_private_message_lifecycle() {
    let env = TestEnv::new();
    let alice = env.register_user("alice", "alice@example.com").await;
    let bob = env.register_user("bob", "bob@example.com").await;

    // B 不在线时发送
    let sent = env
        .message_service
        .send_private_message(SendPrivateMessageRequest {
            recipient_id: bob.id.into(),
            sender_id: alice.id.into(),
            content: "secret".into(),
        })
        .await
        .unwrap();

    let inbox = env
        .message_service
        .list_private_messages(bob.id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].content.as_str(), "secret");
    assert!(!inbox[0].is_read);

    let first = env
        .message_service
        .mark_read(sent.id, bob.id)
        .await
        .unwrap();
    assert!(first.is_read);
    let second = env
        .message_service
        .mark_read(sent.id, bob.id)
        .await
        .unwrap();
    assert!(second.is_read);

    let by_sender = env.message_service.mark_read(sent.id, alice.id).await;
    assert!(by_sender.is_err());
}

/// B 断开连接后仍是持久成员：历史可见，但不再有实时投递。
#[tokio::test]
async fn disconnected_participant_keeps_history_but_gets_no_events() {
    let env = TestEnv::new();
    let alice = env.register_user("alice", "alice@example.com").await;
    let bob = env.register_user("bob", "bob@example.com").await;
    let room = env.create_room(&alice, "general").await;
    env.room_service.join(room.id, bob.id).await.unwrap();

    let mut bob_live = env.registry.register(bob.id).await;
    env.registry
        .join(bob_live.session_id, room.id)
        .await
        .unwrap();

    // B 断开
    env.registry.unregister(bob_live.session_id).await.unwrap();
    env.user_service.mark_offline(bob.id).await.unwrap();

    env.message_service
        .send_room_message(SendRoomMessageRequest {
            room_id: room.id.into(),
            sender_id: alice.id.into(),
            content: "after-disconnect".into(),
        })
        .await
        .unwrap();

    assert!(bob_live.events.try_recv().is_err());

    // 持久历史仍然包含这条消息
    let history = env
        .message_service
        .list_room_messages(room.id, bob.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content.as_str(), "after-disconnect");

    let profile = env.user_service.profile(bob.id).await.unwrap();
    assert!(!profile.is_online);
}
