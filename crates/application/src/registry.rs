//! 房间注册表：进程内唯一的共享可变状态。
//!
//! 维护 房间 → 在线会话 的权威映射，以及每个会话的出站事件通道。
//! 加入、离开、会话销毁和广播快照都在同一把锁内完成，保证：
//! 并发加入不丢条目；销毁与广播要么先序要么后序，不会出现半投递；
//! 同一房间内的广播顺序与发起顺序一致。投递本身只是向各会话的
//! 无界通道入队，持锁期间不会阻塞在慢连接上。

use std::collections::{HashMap, HashSet};

use domain::{DomainError, RoomId, SessionId, UserId};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::events::LiveEvent;

/// 注册成功后交给传输层的会话句柄。
pub struct LiveSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub events: mpsc::UnboundedReceiver<LiveEvent>,
}

struct SessionEntry {
    user_id: UserId,
    joined: HashSet<RoomId>,
    sender: mpsc::UnboundedSender<LiveEvent>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SessionEntry>,
    /// 懒创建、空时剪除；缺失条目等价于空集合。
    rooms: HashMap<RoomId, HashSet<SessionId>>,
    users: HashMap<UserId, HashSet<SessionId>>,
}

#[derive(Default)]
pub struct RoomRegistry {
    inner: Mutex<RegistryInner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为已认证的用户注册一个新会话。
    pub async fn register(&self, user_id: UserId) -> LiveSession {
        let session_id = SessionId::from(Uuid::new_v4());
        let (sender, events) = mpsc::unbounded_channel();

        let mut inner = self.inner.lock().await;
        inner.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                joined: HashSet::new(),
                sender,
            },
        );
        inner.users.entry(user_id).or_default().insert(session_id);

        tracing::debug!(session_id = %session_id, user_id = %user_id, "live session registered");
        LiveSession {
            session_id,
            user_id,
            events,
        }
    }

    /// 销毁会话：从所有房间条目中移除，返回它加入过的房间。
    /// 之后针对该会话的任何操作都会得到 `SessionClosed`。
    pub async fn unregister(&self, session_id: SessionId) -> Result<Vec<RoomId>, DomainError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .sessions
            .remove(&session_id)
            .ok_or(DomainError::SessionClosed)?;

        for room_id in &entry.joined {
            if let Some(members) = inner.rooms.get_mut(room_id) {
                members.remove(&session_id);
                if members.is_empty() {
                    inner.rooms.remove(room_id);
                }
            }
        }
        if let Some(sessions) = inner.users.get_mut(&entry.user_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                inner.users.remove(&entry.user_id);
            }
        }

        tracing::debug!(session_id = %session_id, user_id = %entry.user_id, "live session unregistered");
        Ok(entry.joined.into_iter().collect())
    }

    /// 实时层加入房间。重复加入是无害的空操作；返回是否为新加入。
    /// 持久成员资格检查由授权方在调用前完成。
    pub async fn join(&self, session_id: SessionId, room_id: RoomId) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionClosed)?;

        let newly_joined = entry.joined.insert(room_id);
        if newly_joined {
            inner.rooms.entry(room_id).or_default().insert(session_id);
        }
        Ok(newly_joined)
    }

    /// 实时层离开房间；未加入时同样是空操作。
    pub async fn leave(&self, session_id: SessionId, room_id: RoomId) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionClosed)?;

        if entry.joined.remove(&room_id) {
            if let Some(members) = inner.rooms.get_mut(&room_id) {
                members.remove(&session_id);
                if members.is_empty() {
                    inner.rooms.remove(&room_id);
                }
            }
        }
        Ok(())
    }

    /// 把某个用户的所有会话从一个房间剪除。
    /// 持久离开房间后调用，确保实时投递立刻停止。
    pub async fn prune_user_from_room(&self, user_id: UserId, room_id: RoomId) -> usize {
        let mut inner = self.inner.lock().await;
        let RegistryInner {
            sessions,
            rooms,
            users,
        } = &mut *inner;

        let Some(user_sessions) = users.get(&user_id) else {
            return 0;
        };

        let mut pruned = 0;
        for session_id in user_sessions.iter() {
            if let Some(entry) = sessions.get_mut(session_id) {
                if entry.joined.remove(&room_id) {
                    pruned += 1;
                }
            }
        }
        if pruned > 0 {
            if let Some(members) = rooms.get_mut(&room_id) {
                members.retain(|id| !user_sessions.contains(id));
                if members.is_empty() {
                    rooms.remove(&room_id);
                }
            }
        }
        pruned
    }

    /// 向房间内每个在线会话投递一份事件，可排除一个会话（打字提示
    /// 不回显给发起者）。返回入队成功的数量；单个会话投递失败只记录
    /// 日志，不影响其余会话。
    pub async fn broadcast_room(
        &self,
        room_id: RoomId,
        event: LiveEvent,
        exclude: Option<SessionId>,
    ) -> usize {
        let inner = self.inner.lock().await;
        let Some(members) = inner.rooms.get(&room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for session_id in members {
            if Some(*session_id) == exclude {
                continue;
            }
            let Some(entry) = inner.sessions.get(session_id) else {
                continue;
            };
            if entry.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(session_id = %session_id, room_id = %room_id, "failed to enqueue event for session");
            }
        }
        delivered
    }

    /// 私聊直达通道：按收件人投递到其所有在线会话。
    pub async fn send_direct(&self, user_id: UserId, event: LiveEvent) -> usize {
        let inner = self.inner.lock().await;
        let Some(sessions) = inner.users.get(&user_id) else {
            return 0;
        };

        let mut delivered = 0;
        for session_id in sessions {
            let Some(entry) = inner.sessions.get(session_id) else {
                continue;
            };
            if entry.sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(session_id = %session_id, user_id = %user_id, "failed to enqueue direct event");
            }
        }
        delivered
    }

    /// 定向投递给单个会话，用于错误回执等会话私有事件。
    pub async fn send_to_session(
        &self,
        session_id: SessionId,
        event: LiveEvent,
    ) -> Result<(), DomainError> {
        let inner = self.inner.lock().await;
        let entry = inner
            .sessions
            .get(&session_id)
            .ok_or(DomainError::SessionClosed)?;
        entry
            .sender
            .send(event)
            .map_err(|_| DomainError::SessionClosed)
    }

    pub async fn is_joined(&self, session_id: SessionId, room_id: RoomId) -> bool {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .get(&session_id)
            .map(|entry| entry.joined.contains(&room_id))
            .unwrap_or(false)
    }

    pub async fn room_session_count(&self, room_id: RoomId) -> usize {
        let inner = self.inner.lock().await;
        inner.rooms.get(&room_id).map(HashSet::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn typing(room_id: RoomId, user_id: UserId) -> LiveEvent {
        LiveEvent::Typing {
            room_id: room_id.into(),
            user_id: user_id.into(),
            is_typing: true,
        }
    }

    #[tokio::test]
    async fn concurrent_joins_both_land() {
        let registry = Arc::new(RoomRegistry::new());
        let room_id = RoomId::from(Uuid::new_v4());

        let a = registry.register(UserId::from(Uuid::new_v4())).await;
        let b = registry.register(UserId::from(Uuid::new_v4())).await;

        let ra = registry.clone();
        let rb = registry.clone();
        let (sa, sb) = (a.session_id, b.session_id);
        let ja = tokio::spawn(async move { ra.join(sa, room_id).await });
        let jb = tokio::spawn(async move { rb.join(sb, room_id).await });
        assert!(ja.await.unwrap().unwrap());
        assert!(jb.await.unwrap().unwrap());

        assert_eq!(registry.room_session_count(room_id).await, 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_each_session_exactly_once() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_a = UserId::from(Uuid::new_v4());
        let user_b = UserId::from(Uuid::new_v4());

        let mut a = registry.register(user_a).await;
        let mut b = registry.register(user_b).await;
        registry.join(a.session_id, room_id).await.unwrap();
        registry.join(b.session_id, room_id).await.unwrap();

        let delivered = registry
            .broadcast_room(room_id, typing(room_id, user_a), None)
            .await;
        assert_eq!(delivered, 2);

        assert!(a.events.try_recv().is_ok());
        assert!(a.events.try_recv().is_err());
        assert!(b.events.try_recv().is_ok());
        assert!(b.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn exclude_suppresses_sender_echo() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_a = UserId::from(Uuid::new_v4());

        let mut a = registry.register(user_a).await;
        let mut b = registry.register(UserId::from(Uuid::new_v4())).await;
        registry.join(a.session_id, room_id).await.unwrap();
        registry.join(b.session_id, room_id).await.unwrap();

        let delivered = registry
            .broadcast_room(room_id, typing(room_id, user_a), Some(a.session_id))
            .await;
        assert_eq!(delivered, 1);
        assert!(a.events.try_recv().is_err());
        assert!(b.events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn rejoining_is_idempotent_and_delivers_once() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_a = UserId::from(Uuid::new_v4());

        let mut a = registry.register(user_a).await;
        assert!(registry.join(a.session_id, room_id).await.unwrap());
        assert!(!registry.join(a.session_id, room_id).await.unwrap());

        registry
            .broadcast_room(room_id, typing(room_id, user_a), None)
            .await;
        assert!(a.events.try_recv().is_ok());
        assert!(a.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregistered_session_receives_nothing_and_rejects_operations() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_a = UserId::from(Uuid::new_v4());

        let mut a = registry.register(user_a).await;
        let b = registry.register(UserId::from(Uuid::new_v4())).await;
        registry.join(a.session_id, room_id).await.unwrap();
        registry.join(b.session_id, room_id).await.unwrap();

        let joined = registry.unregister(a.session_id).await.unwrap();
        assert_eq!(joined, vec![room_id]);

        let delivered = registry
            .broadcast_room(room_id, typing(room_id, user_a), None)
            .await;
        assert_eq!(delivered, 1);
        assert!(a.events.try_recv().is_err());

        // 已关闭的会话拒绝任何后续操作
        assert_eq!(
            registry.join(a.session_id, room_id).await,
            Err(DomainError::SessionClosed)
        );
        assert_eq!(
            registry.unregister(a.session_id).await.unwrap_err(),
            DomainError::SessionClosed
        );
    }

    #[tokio::test]
    async fn prune_user_stops_delivery_for_all_their_sessions() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let user_a = UserId::from(Uuid::new_v4());

        let mut first = registry.register(user_a).await;
        let mut second = registry.register(user_a).await;
        registry.join(first.session_id, room_id).await.unwrap();
        registry.join(second.session_id, room_id).await.unwrap();

        assert_eq!(registry.prune_user_from_room(user_a, room_id).await, 2);
        assert_eq!(registry.room_session_count(room_id).await, 0);

        registry
            .broadcast_room(room_id, typing(room_id, user_a), None)
            .await;
        assert!(first.events.try_recv().is_err());
        assert!(second.events.try_recv().is_err());

        // 会话仍然在线，私聊直达不受影响
        assert_eq!(
            registry
                .send_direct(user_a, typing(room_id, user_a))
                .await,
            2
        );
        assert!(first.events.try_recv().is_ok());
        assert!(second.events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_to_absent_room_is_empty_not_an_error() {
        let registry = RoomRegistry::new();
        let room_id = RoomId::from(Uuid::new_v4());
        let delivered = registry
            .broadcast_room(room_id, typing(room_id, UserId::from(Uuid::new_v4())), None)
            .await;
        assert_eq!(delivered, 0);
    }
}
