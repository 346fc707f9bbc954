//! # Notification Delivery
//!
//! Fan-out of notifications to a user, to every holder of a role, or to
//! all connected clients. Delivery is durable-first: the notification
//! record is always persisted before any push attempt, so a user who was
//! offline can still query unread notifications later. Live push is an
//! additional best-effort channel to currently-connected clients.
//!
//! ## Live-Connection Registry
//!
//! The registry maps user ids to their open push channels. It is the one
//! piece of shared mutable state in the delivery path and is guarded by
//! a `parking_lot::Mutex`; registration, unregistration, and push are the
//! only operations that touch it. A failed send means the client went
//! away — the channel is pruned and the failure logged, never surfaced.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dede_core::{NotificationId, Role, Timestamp, UserId, WorkflowError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::store::Store;

// -- Notification Records -----------------------------------------------------

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Informational only.
    Info,
    /// The recipient must act (review, inspect, approve).
    ActionRequired,
    /// A deadline is approaching.
    Reminder,
    /// A deadline has passed.
    Overdue,
    /// A request changed status.
    StatusChange,
}

/// Display priority of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// Who a notification is addressed to.
///
/// A specific user and a role are mutually exclusive by construction;
/// `Broadcast` reaches every connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "target")]
pub enum Recipient {
    /// One specific user.
    User(UserId),
    /// Every user currently holding the role.
    Role(Role),
    /// Everyone.
    Broadcast,
}

/// A persisted notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Short headline.
    pub title: String,
    /// Full message body.
    pub message: String,
    /// Category.
    pub kind: NotificationKind,
    /// Display priority.
    pub priority: NotificationPriority,
    /// Addressee.
    pub recipient: Recipient,
    /// Back-reference entity kind, e.g. `"license_request"`.
    pub entity_type: Option<String>,
    /// Back-reference entity id.
    pub entity_id: Option<String>,
    /// Deep link for the client to open.
    pub action_url: Option<String>,
    /// Deliver at this time instead of immediately.
    pub scheduled_at: Option<Timestamp>,
    /// When delivery happened. `None` means not yet delivered.
    pub sent_at: Option<Timestamp>,
    /// When the recipient read it.
    pub read_at: Option<Timestamp>,
    /// When the record was created.
    pub created_at: Timestamp,
}

/// Content of a notification before the service addresses it.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    /// Short headline.
    pub title: String,
    /// Full message body.
    pub message: String,
    /// Category.
    pub kind: NotificationKind,
    /// Display priority.
    pub priority: NotificationPriority,
    /// Back-reference entity kind.
    pub entity_type: Option<String>,
    /// Back-reference entity id.
    pub entity_id: Option<String>,
    /// Deep link for the client to open.
    pub action_url: Option<String>,
}

impl NotificationDraft {
    /// Create a draft with the given content and normal priority.
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            priority: NotificationPriority::Normal,
            entity_type: None,
            entity_id: None,
            action_url: None,
        }
    }

    /// Set the priority.
    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a back-reference to the entity this notification is about.
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl std::fmt::Display) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Attach a deep link.
    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    fn into_record(self, recipient: Recipient, scheduled_at: Option<Timestamp>) -> Notification {
        Notification {
            id: NotificationId::new(),
            title: self.title,
            message: self.message,
            kind: self.kind,
            priority: self.priority,
            recipient,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action_url: self.action_url,
            scheduled_at,
            sent_at: None,
            read_at: None,
            created_at: Timestamp::now(),
        }
    }
}

// -- Role Directory -----------------------------------------------------------

/// Resolves role membership. User management itself is an external
/// collaborator — the engine only needs these two lookups.
pub trait RoleDirectory: Send + Sync {
    /// Every user currently holding `role`.
    fn users_with_role(&self, role: Role) -> Vec<UserId>;

    /// Every role `user` currently holds.
    fn roles_of(&self, user: UserId) -> Vec<Role>;
}

/// In-memory role directory backing tests and the demo CLI.
#[derive(Debug, Default)]
pub struct InMemoryRoleDirectory {
    grants: RwLock<HashMap<UserId, HashSet<Role>>>,
}

impl InMemoryRoleDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `user`.
    pub fn grant(&self, user: UserId, role: Role) {
        self.grants.write().entry(user).or_default().insert(role);
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn users_with_role(&self, role: Role) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .grants
            .read()
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user, _)| *user)
            .collect();
        users.sort();
        users
    }

    fn roles_of(&self, user: UserId) -> Vec<Role> {
        self.grants
            .read()
            .get(&user)
            .map(|roles| {
                let mut v: Vec<Role> = roles.iter().copied().collect();
                v.sort_by_key(Role::as_str);
                v
            })
            .unwrap_or_default()
    }
}

// -- Connection Registry ------------------------------------------------------

/// Identifier of one live push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Registry of live push channels, one entry per open client connection.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<UserId, Vec<Connection>>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open connection for `user`. The returned id is needed
    /// to unregister when the client disconnects.
    pub fn register(&self, user: UserId, sender: UnboundedSender<String>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections
            .lock()
            .entry(user)
            .or_default()
            .push(Connection { id, sender });
        tracing::debug!(user = %user, "push connection registered");
        id
    }

    /// Remove one connection of `user`.
    pub fn unregister(&self, user: UserId, id: ConnectionId) {
        let mut guard = self.connections.lock();
        if let Some(conns) = guard.get_mut(&user) {
            conns.retain(|c| c.id != id);
            if conns.is_empty() {
                guard.remove(&user);
            }
        }
    }

    /// Number of open connections for `user`.
    pub fn connection_count(&self, user: UserId) -> usize {
        self.connections
            .lock()
            .get(&user)
            .map_or(0, |conns| conns.len())
    }

    /// Push a payload to every connection of `user`. Dead channels are
    /// pruned; returns the number of successful deliveries.
    fn push_to_user(&self, user: UserId, payload: &str) -> usize {
        let mut guard = self.connections.lock();
        let Some(conns) = guard.get_mut(&user) else {
            return 0;
        };
        let before = conns.len();
        conns.retain(|c| c.sender.send(payload.to_string()).is_ok());
        let delivered = conns.len();
        if delivered < before {
            tracing::warn!(
                user = %user,
                dropped = before - delivered,
                "push delivery failed on closed connections; pruned"
            );
        }
        if conns.is_empty() {
            guard.remove(&user);
        }
        delivered
    }

    /// Push a payload to every open connection of every user.
    fn push_to_all(&self, payload: &str) -> usize {
        let users: Vec<UserId> = self.connections.lock().keys().copied().collect();
        users
            .into_iter()
            .map(|user| self.push_to_user(user, payload))
            .sum()
    }
}

// -- Notification Service -----------------------------------------------------

/// Durable-first notification delivery with best-effort live push.
#[derive(Clone)]
pub struct NotificationService {
    store: Store<NotificationId, Notification>,
    registry: ConnectionRegistry,
    directory: Arc<dyn RoleDirectory>,
}

impl NotificationService {
    /// Create a service over an empty notification table.
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self {
            store: Store::new(),
            registry: ConnectionRegistry::new(),
            directory,
        }
    }

    /// The live-connection registry, for the excluded transport layer to
    /// register client channels on.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Notify one specific user. Persists the record, then pushes.
    pub fn notify_user(&self, user: UserId, draft: NotificationDraft) -> NotificationId {
        self.deliver(draft.into_record(Recipient::User(user), None))
    }

    /// Notify every user currently holding `role`.
    pub fn notify_role(&self, role: Role, draft: NotificationDraft) -> NotificationId {
        self.deliver(draft.into_record(Recipient::Role(role), None))
    }

    /// Notify every connected client.
    pub fn broadcast(&self, draft: NotificationDraft) -> NotificationId {
        self.deliver(draft.into_record(Recipient::Broadcast, None))
    }

    /// Persist a notification for later delivery at `at`.
    pub fn schedule(
        &self,
        recipient: Recipient,
        draft: NotificationDraft,
        at: Timestamp,
    ) -> NotificationId {
        let record = draft.into_record(recipient, Some(at));
        let id = record.id;
        self.store.insert(id, record);
        id
    }

    /// Deliver every scheduled notification whose time has come. Returns
    /// the number delivered. Already-sent records are never re-sent.
    pub fn process_scheduled(&self, now: Timestamp) -> usize {
        let due: Vec<Notification> = self
            .store
            .list()
            .into_iter()
            .filter(|n| n.sent_at.is_none() && n.scheduled_at.is_some_and(|at| at <= now))
            .collect();
        let count = due.len();
        for record in due {
            self.deliver(record);
        }
        count
    }

    /// Mark a notification read by `user`. `NotFound` if the record does
    /// not exist or is not visible to that user.
    pub fn mark_read(&self, id: NotificationId, user: UserId) -> Result<(), WorkflowError> {
        let visible = self
            .store
            .get(&id)
            .map(|n| self.visible_to(&n, user))
            .unwrap_or(false);
        if !visible {
            return Err(WorkflowError::not_found("notification", id));
        }
        self.store.update(&id, |n| {
            if n.read_at.is_none() {
                n.read_at = Some(Timestamp::now());
            }
        });
        Ok(())
    }

    /// Count of delivered, unread notifications visible to `user`.
    pub fn unread_count(&self, user: UserId) -> usize {
        self.unread_for(user).len()
    }

    /// Delivered, unread notifications visible to `user`, oldest first.
    pub fn unread_for(&self, user: UserId) -> Vec<Notification> {
        let mut unread: Vec<Notification> = self
            .store
            .list()
            .into_iter()
            .filter(|n| n.sent_at.is_some() && n.read_at.is_none() && self.visible_to(n, user))
            .collect();
        unread.sort_by_key(|n| n.created_at);
        unread
    }

    /// Fetch one notification record.
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.store.get(&id)
    }

    fn visible_to(&self, n: &Notification, user: UserId) -> bool {
        match n.recipient {
            Recipient::User(u) => u == user,
            Recipient::Role(role) => self.directory.roles_of(user).contains(&role),
            Recipient::Broadcast => true,
        }
    }

    /// Persist the record as sent, then fan the push envelope out to the
    /// live connections of the target audience.
    fn deliver(&self, mut record: Notification) -> NotificationId {
        record.sent_at = Some(Timestamp::now());
        let id = record.id;
        self.store.insert(id, record.clone());

        let payload = envelope(&record);
        let delivered = match record.recipient {
            Recipient::User(user) => self.registry.push_to_user(user, &payload),
            Recipient::Role(role) => self
                .directory
                .users_with_role(role)
                .into_iter()
                .map(|user| self.registry.push_to_user(user, &payload))
                .sum(),
            Recipient::Broadcast => self.registry.push_to_all(&payload),
        };
        tracing::debug!(
            notification = %id,
            recipient = ?record.recipient,
            delivered,
            "notification dispatched"
        );
        id
    }
}

/// The JSON push envelope sent over live connections.
fn envelope(record: &Notification) -> String {
    serde_json::json!({
        "type": "notification",
        "notification": record,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn service_with_directory() -> (NotificationService, Arc<InMemoryRoleDirectory>) {
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let service = NotificationService::new(directory.clone());
        (service, directory)
    }

    fn draft(title: &str) -> NotificationDraft {
        NotificationDraft::new(NotificationKind::Info, title, "body")
    }

    #[test]
    fn user_notification_is_durable_without_connections() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        let id = service.notify_user(user, draft("hello"));

        let record = service.get(id).unwrap();
        assert!(record.sent_at.is_some());
        assert_eq!(service.unread_count(user), 1);
        assert_eq!(service.unread_count(UserId::new()), 0);
    }

    #[test]
    fn push_envelope_reaches_registered_connections() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        let (tx, mut rx) = unbounded_channel();
        service.registry().register(user, tx);

        service.notify_user(user, draft("ping"));

        let payload = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["notification"]["title"], "ping");
    }

    #[test]
    fn role_notification_fans_out_to_every_holder() {
        let (service, directory) = service_with_directory();
        let a = UserId::new();
        let b = UserId::new();
        directory.grant(a, Role::Admin);
        directory.grant(b, Role::Admin);

        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        service.registry().register(a, tx_a);
        service.registry().register(b, tx_b);

        service.notify_role(Role::Admin, draft("review queue"));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(service.unread_count(a), 1);
        assert_eq!(service.unread_count(b), 1);
    }

    #[test]
    fn dead_connections_are_pruned_not_fatal() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        let (tx, rx) = unbounded_channel();
        service.registry().register(user, tx);
        drop(rx);

        service.notify_user(user, draft("into the void"));
        assert_eq!(service.registry().connection_count(user), 0);
        // The durable record survives the failed push.
        assert_eq!(service.unread_count(user), 1);
    }

    #[test]
    fn unregister_removes_only_that_connection() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        let id1 = service.registry().register(user, tx1);
        service.registry().register(user, tx2);

        service.registry().unregister(user, id1);
        assert_eq!(service.registry().connection_count(user), 1);
    }

    #[test]
    fn scheduled_notifications_wait_for_their_time() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        let now = Timestamp::now();
        service.schedule(Recipient::User(user), draft("later"), now.plus_days(1));

        assert_eq!(service.process_scheduled(now), 0);
        assert_eq!(service.unread_count(user), 0);

        assert_eq!(service.process_scheduled(now.plus_days(2)), 1);
        assert_eq!(service.unread_count(user), 1);

        // A second pass never re-sends.
        assert_eq!(service.process_scheduled(now.plus_days(3)), 0);
    }

    #[test]
    fn mark_read_requires_visibility() {
        let (service, _) = service_with_directory();
        let owner = UserId::new();
        let stranger = UserId::new();
        let id = service.notify_user(owner, draft("private"));

        assert!(service.mark_read(id, stranger).is_err());
        service.mark_read(id, owner).unwrap();
        assert_eq!(service.unread_count(owner), 0);
    }

    #[test]
    fn broadcast_is_visible_to_everyone() {
        let (service, _) = service_with_directory();
        let user = UserId::new();
        service.broadcast(draft("maintenance window"));
        assert_eq!(service.unread_count(user), 1);
    }
}
