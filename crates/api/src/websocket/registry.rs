//! Connection registry
//!
//! The single owner of the `user -> live connection` mapping. One entry per
//! user; the newest connection wins.

use std::collections::{BTreeSet, HashMap};

use duochat_shared::{ConnectionId, UserId};
use tokio::sync::RwLock;

/// Maps each online user to exactly one live connection
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<UserId, ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `user_id`.
    ///
    /// Returns the connection this one superseded, if any. The superseded
    /// connection is left open; it just stops receiving relayed messages.
    pub async fn register(&self, user_id: UserId, connection_id: ConnectionId) -> Option<ConnectionId> {
        let previous = self.entries.write().await.insert(user_id, connection_id);

        match previous {
            Some(old) if old != connection_id => {
                tracing::info!(
                    user_id = %user_id,
                    session_id = %connection_id,
                    superseded = %old,
                    "Newer connection replaced registry entry"
                );
                Some(old)
            }
            _ => None,
        }
    }

    /// Remove the entry for `user_id`, but only while it still points at
    /// `connection_id`. Returns whether an entry was removed.
    pub async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&user_id) {
            Some(current) if *current == connection_id => {
                entries.remove(&user_id);
                true
            }
            Some(current) => {
                tracing::debug!(
                    user_id = %user_id,
                    session_id = %connection_id,
                    current = %current,
                    "Ignoring disconnect of stale connection"
                );
                false
            }
            None => false,
        }
    }

    /// The live connection for `user_id`, if online
    pub async fn lookup(&self, user_id: UserId) -> Option<ConnectionId> {
        self.entries.read().await.get(&user_id).copied()
    }

    /// Point-in-time set of online users
    pub async fn snapshot(&self) -> BTreeSet<UserId> {
        self.entries.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_lookup_unregister() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        assert_eq!(registry.register(user, conn).await, None);
        assert_eq!(registry.lookup(user).await, Some(conn));
        assert!(registry.snapshot().await.contains(&user));

        assert!(registry.unregister(user, conn).await);
        assert_eq!(registry.lookup(user).await, None);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_newer_entry() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        registry.register(user, first).await;
        assert_eq!(registry.register(user, second).await, Some(first));

        assert!(!registry.unregister(user, first).await);
        assert_eq!(registry.lookup(user).await, Some(second));
        assert_eq!(registry.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister(UserId::new(), ConnectionId::new()).await);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_reregister_same_connection_reports_nothing_superseded() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        registry.register(user, conn).await;
        assert_eq!(registry.register(user, conn).await, None);
    }

    #[tokio::test]
    async fn test_snapshot_matches_model_over_mixed_sequence() {
        let registry = ConnectionRegistry::new();
        let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let conns: Vec<ConnectionId> = (0..6).map(|_| ConnectionId::new()).collect();
        let mut model: HashMap<UserId, ConnectionId> = HashMap::new();

        // (user index, connection index, is_register)
        let ops = [
            (0, 0, true),
            (1, 1, true),
            (0, 2, true),
            (0, 0, false),
            (2, 3, true),
            (1, 1, false),
            (3, 4, true),
            (2, 5, false),
            (0, 2, false),
            (1, 5, true),
        ];

        for (u, c, is_register) in ops {
            let (user, conn) = (users[u], conns[c]);
            if is_register {
                registry.register(user, conn).await;
                model.insert(user, conn);
            } else {
                registry.unregister(user, conn).await;
                if model.get(&user) == Some(&conn) {
                    model.remove(&user);
                }
            }

            let expected: BTreeSet<UserId> = model.keys().copied().collect();
            assert_eq!(registry.snapshot().await, expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_registers() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let user = UserId::new();
                registry.register(user, ConnectionId::new()).await;
                user
            }));
        }

        let mut expected = BTreeSet::new();
        for handle in handles {
            expected.insert(handle.await.unwrap());
        }

        assert_eq!(registry.snapshot().await, expected);
    }
}
