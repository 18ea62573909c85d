#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! The multi-client dispatcher (`spec.md` §4.D): a read-mostly registry of
//! `bot_user_id -> ParallelTransferrer`, populated once at startup, with an
//! atomic least-loaded selection for every incoming HTTP request.
//!
//! # Design
//!
//! Selection and the subsequent `active_clients` increment happen under one
//! [`tokio::sync::Mutex`] so the sequence of counter values observed across
//! concurrent requests is a consistent linearization (`spec.md` §5
//! "Ordering guarantees"), rather than two independent racing requests
//! snapping to the same least-loaded client.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use transfer::ParallelTransferrer;

/// Registry of bot clients, keyed by their resolved `user_id`.
pub struct Dispatcher {
    clients: HashMap<i64, Arc<ParallelTransferrer>>,
    selection_lock: Mutex<()>,
}

impl Dispatcher {
    /// Builds a dispatcher over `clients`, already connected and resolved.
    #[must_use]
    pub fn new(clients: HashMap<i64, Arc<ParallelTransferrer>>) -> Self {
        Self { clients, selection_lock: Mutex::new(()) }
    }

    /// Picks the transferrer with the minimum `active_clients` and
    /// increments it atomically with the pick, returning both the chosen
    /// client's id and its transferrer.
    ///
    /// # Panics
    ///
    /// Panics if the registry is empty — the binary must register at least
    /// the main client before binding the HTTP listener.
    pub async fn select(&self) -> (i64, Arc<ParallelTransferrer>) {
        let _guard = self.selection_lock.lock().await;
        let (id, transferrer) = self
            .clients
            .iter()
            .min_by_key(|(_, t)| t.active_clients())
            .map(|(id, t)| (*id, t.clone()))
            .expect("dispatcher registry must not be empty");
        transferrer.mark_selected();
        debug!(client_id = id, active_clients = transferrer.active_clients(), "selected client");
        (id, transferrer)
    }

    /// A JSON-serializable snapshot of every registered client's
    /// `[active_clients, users]`, for `GET /` (`spec.md` §4.E).
    #[must_use]
    pub fn snapshot(&self) -> HashMap<i64, [i64; 2]> {
        self.clients
            .iter()
            .map(|(id, t)| (*id, [t.active_clients(), t.users()]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use senders::remote::MainClient;
    use senders::test_support::{FakeMainClient, FakeRemote};
    use senders::SenderPool;

    async fn make_transferrer() -> Arc<ParallelTransferrer> {
        let remote = FakeRemote::new(1);
        let main_client: Arc<dyn MainClient> = Arc::new(FakeMainClient::new(remote));
        let pool = Arc::new(SenderPool::new(main_client, 20));
        pool.publish_home_auth_key().await;
        Arc::new(ParallelTransferrer::new(pool))
    }

    #[tokio::test]
    async fn selects_least_loaded_client() {
        let mut clients = HashMap::new();
        let busy = make_transferrer().await;
        busy.mark_selected();
        busy.mark_selected();
        let idle = make_transferrer().await;
        clients.insert(1, busy);
        clients.insert(2, idle.clone());

        let dispatcher = Dispatcher::new(clients);
        let (id, transferrer) = dispatcher.select().await;

        assert_eq!(id, 2);
        assert_eq!(transferrer.active_clients(), 1);
    }

    #[tokio::test]
    async fn concurrent_selections_balance_across_clients() {
        let mut clients = HashMap::new();
        clients.insert(1, make_transferrer().await);
        clients.insert(2, make_transferrer().await);
        let dispatcher = Arc::new(Dispatcher::new(clients));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move { dispatcher.select().await.0 }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = dispatcher.snapshot();
        let total: i64 = snapshot.values().map(|v| v[0]).sum();
        assert_eq!(total, 20);
        let diff = (snapshot[&1][0] - snapshot[&2][0]).abs();
        assert!(diff <= 1, "selection should balance within one request: {snapshot:?}");
    }
}
