//! Per-DC connection reuse and the auth-export handshake.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::remote::{AuthKey, DcAddr, MainClient, RemoteSender, SenderError};

/// One live, possibly-shared channel to a DC.
///
/// `handshake_lock` is held only while `connect`/`import_authorization` run;
/// ordinary traffic only takes `sender`'s lock, so a connection already
/// serving one caller can still be handed to another while in flight.
pub struct Connection {
    sender: Mutex<Box<dyn RemoteSender>>,
    handshake_lock: Mutex<()>,
    users: AtomicUsize,
}

impl Connection {
    fn users(&self) -> usize {
        self.users.load(Ordering::Acquire)
    }
}

/// RAII guard returned by [`DcConnectionManager::get_connection`].
///
/// Decrements the held connection's `users` counter on every exit path,
/// including an early return, a panic unwind, or the holding task being
/// cancelled mid-await.
pub struct ConnectionHandle {
    conn: Arc<Connection>,
}

impl ConnectionHandle {
    /// Locks the underlying sender for the duration of one RPC.
    pub async fn sender(&self) -> tokio::sync::MutexGuard<'_, Box<dyn RemoteSender>> {
        self.conn.sender.lock().await
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.conn.users.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owns every live connection to one DC and the auth key shared across them.
pub struct DcConnectionManager {
    dc_id: u8,
    main_client: Arc<dyn MainClient>,
    connection_limit: usize,
    dc_addr: Mutex<Option<DcAddr>>,
    auth_key: Mutex<Option<AuthKey>>,
    connections: Mutex<Vec<Arc<Connection>>>,
}

impl DcConnectionManager {
    /// Builds a manager for `dc_id`, bounded at `connection_limit` live
    /// connections.
    #[must_use]
    pub fn new(dc_id: u8, main_client: Arc<dyn MainClient>, connection_limit: usize) -> Self {
        Self {
            dc_id,
            main_client,
            connection_limit,
            dc_addr: Mutex::new(None),
            auth_key: Mutex::new(None),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Seeds this manager's auth key directly, skipping the export handshake.
    ///
    /// Called once, for the DC the main client is already authenticated
    /// against.
    pub async fn seed_auth_key(&self, auth_key: AuthKey) {
        *self.auth_key.lock().await = Some(auth_key);
    }

    async fn resolve_dc(&self) -> Result<DcAddr, SenderError> {
        let mut guard = self.dc_addr.lock().await;
        if let Some(addr) = *guard {
            return Ok(addr);
        }
        let addr = self.main_client.resolve_dc(self.dc_id).await?;
        *guard = Some(addr);
        Ok(addr)
    }

    async fn export_auth_key(&self, conn: &Connection) -> Result<(), SenderError> {
        info!(dc_id = self.dc_id, "exporting auth key");
        match self.main_client.export_authorization(self.dc_id).await {
            Ok((auth_id, auth_bytes)) => {
                conn.sender
                    .lock()
                    .await
                    .import_authorization(auth_id, auth_bytes)
                    .await?;
                let key = conn.sender.lock().await.auth_key();
                *self.auth_key.lock().await = key;
                Ok(())
            }
            Err(SenderError::DcIdInvalid) => {
                debug!(dc_id = self.dc_id, "dc id invalid, reusing home auth key");
                let key = self.main_client.home_auth_key();
                *self.auth_key.lock().await = Some(key.clone());
                conn.sender.lock().await.connect(self.resolve_dc().await?, Some(key)).await
            }
            Err(err) => Err(err),
        }
    }

    /// Connects and authenticates a fresh [`Connection`]. Does not add it to
    /// `self.connections` — the caller does that while still holding the
    /// list lock, so the new connection is visible to the next decision
    /// atomically with this one.
    async fn new_connection(&self) -> Result<Arc<Connection>, SenderError> {
        let addr = self.resolve_dc().await?;
        let sender = self.main_client.new_sender();
        let conn = Arc::new(Connection {
            sender: Mutex::new(sender),
            handshake_lock: Mutex::new(()),
            users: AtomicUsize::new(0),
        });

        let _guard = conn.handshake_lock.lock().await;
        let existing_key = self.auth_key.lock().await.clone();
        conn.sender.lock().await.connect(addr, existing_key.clone()).await?;
        if existing_key.is_none() {
            self.export_auth_key(&conn).await?;
        }

        Ok(conn)
    }

    /// Reserves a connection for the duration of one transfer, opening a new
    /// one if every existing connection is busy and the pool has headroom.
    ///
    /// Holds `connections`'s lock across the whole choose-or-create sequence
    /// and the `users` increment, one critical section — matching the
    /// original's `_list_lock`/`_next_connection`/`conn.users += 1`
    /// sequence. Without this, concurrent first-time callers could each
    /// observe `len() < connection_limit` before any of them pushes, letting
    /// the pool grow past `connection_limit` and running the auth-export
    /// handshake more than once for the same DC.
    pub async fn get_connection(&self) -> Result<ConnectionHandle, SenderError> {
        let mut connections = self.connections.lock().await;
        let best = connections.iter().min_by_key(|c| c.users()).cloned();
        let under_limit = connections.len() < self.connection_limit;

        let conn = match best {
            Some(conn) if conn.users() == 0 || !under_limit => conn,
            _ => {
                let conn = self.new_connection().await?;
                connections.push(conn.clone());
                conn
            }
        };

        conn.users.fetch_add(1, Ordering::AcqRel);
        Ok(ConnectionHandle { conn })
    }

    /// Disconnects every live connection to this DC. Idempotent.
    pub async fn disconnect_all(&self) {
        let connections = self.connections.lock().await;
        for conn in connections.iter() {
            conn.sender.lock().await.disconnect().await;
        }
    }
}

/// Five per-DC managers, published with the home DC's auth key once the main
/// client has connected.
pub struct SenderPool {
    managers: [Arc<DcConnectionManager>; gwcore::constants::DC_COUNT as usize],
}

impl SenderPool {
    /// Builds a manager for each DC `1..=DC_COUNT`.
    #[must_use]
    pub fn new(main_client: Arc<dyn MainClient>, connection_limit: usize) -> Self {
        let managers = std::array::from_fn(|i| {
            Arc::new(DcConnectionManager::new(
                (i + 1) as u8,
                main_client.clone(),
                connection_limit,
            ))
        });
        Self { managers }
    }

    /// Seeds the home DC's manager with the main client's own auth key,
    /// mirroring the original's `post_init` step.
    pub async fn publish_home_auth_key(&self) {
        let home_dc = self.managers[0].main_client.home_dc_id();
        if let Some(manager) = self.managers.iter().find(|m| m.dc_id == home_dc) {
            manager.seed_auth_key(self.managers[0].main_client.home_auth_key()).await;
        }
    }

    /// Returns the manager for `dc_id` (1-indexed).
    ///
    /// # Panics
    ///
    /// Panics if `dc_id` is zero or greater than [`gwcore::constants::DC_COUNT`].
    #[must_use]
    pub fn manager(&self, dc_id: u8) -> Arc<DcConnectionManager> {
        self.managers[(dc_id - 1) as usize].clone()
    }

    /// Disconnects every connection in every DC manager.
    pub async fn disconnect_all(&self) {
        for manager in &self.managers {
            manager.disconnect_all().await;
        }
    }
}

#[cfg(all(test, feature = "test-support"))]
mod tests {
    use super::*;
    use crate::test_support::{FakeMainClient, FakeRemote};

    #[tokio::test]
    async fn concurrent_first_requests_never_exceed_the_connection_limit() {
        let remote = FakeRemote::new(1);
        let main_client: Arc<dyn MainClient> = Arc::new(FakeMainClient::new(remote.clone()));
        let manager = Arc::new(DcConnectionManager::new(2, main_client, 3));

        let handles = futures::future::join_all((0..10).map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_connection().await.unwrap() })
        }))
        .await;
        let handles: Vec<_> = handles.into_iter().map(Result::unwrap).collect();

        assert_eq!(manager.connections.lock().await.len(), 3);
        drop(handles);
    }

    #[tokio::test]
    async fn concurrent_first_requests_export_the_auth_key_exactly_once() {
        let remote = FakeRemote::new(1);
        let main_client: Arc<dyn MainClient> = Arc::new(FakeMainClient::new(remote.clone()));
        let manager = Arc::new(DcConnectionManager::new(2, main_client, 5));

        let _handles: Vec<_> = futures::future::join_all((0..5).map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_connection().await.unwrap() })
        }))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

        assert_eq!(remote.export_count(), 1);
    }
}
