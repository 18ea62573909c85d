//! Deterministic in-memory fakes for testing the pool and the transferrer
//! without a live connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::remote::{
    AuthKey, DcAddr, GetFileChunk, GetFileRequest, MainClient, RemoteSender, SenderError,
};

/// Shared fixture backing every [`FakeSender`] produced by a [`FakeMainClient`].
///
/// Holds the file contents to serve and knobs to inject rate limiting or
/// transport errors on demand.
pub struct FakeRemote {
    files: Mutex<HashMap<i64, Bytes>>,
    home_dc_id: u8,
    home_auth_key: AuthKey,
    export_count: AtomicU32,
    rate_limit_once: AtomicU32,
}

impl FakeRemote {
    /// Builds an empty fixture authenticated against `home_dc_id`.
    #[must_use]
    pub fn new(home_dc_id: u8) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(HashMap::new()),
            home_dc_id,
            home_auth_key: AuthKey(vec![0u8; 256]),
            export_count: AtomicU32::new(0),
            rate_limit_once: AtomicU32::new(0),
        })
    }

    /// Registers `bytes` as the content addressed by `location_id`.
    pub async fn put_file(&self, location_id: i64, bytes: Bytes) {
        self.files.lock().await.insert(location_id, bytes);
    }

    /// Forces the next `get_file` call to return a flood-wait error once.
    pub fn inject_rate_limit_once(&self) {
        self.rate_limit_once.store(1, Ordering::Release);
    }

    /// Number of times `export_authorization` has been called. Used to
    /// assert the handshake runs at most once per DC.
    #[must_use]
    pub fn export_count(&self) -> u32 {
        self.export_count.load(Ordering::Acquire)
    }
}

/// Fake [`MainClient`] vending [`FakeSender`]s against a shared [`FakeRemote`].
pub struct FakeMainClient {
    remote: Arc<FakeRemote>,
}

impl FakeMainClient {
    /// Wraps `remote` as a [`MainClient`].
    #[must_use]
    pub fn new(remote: Arc<FakeRemote>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl MainClient for FakeMainClient {
    async fn resolve_dc(&self, _dc_id: u8) -> Result<DcAddr, SenderError> {
        Ok(DcAddr { ip: "127.0.0.1".parse().unwrap(), port: 443 })
    }

    async fn export_authorization(&self, dc_id: u8) -> Result<(i64, Vec<u8>), SenderError> {
        self.remote.export_count.fetch_add(1, Ordering::AcqRel);
        if dc_id == self.remote.home_dc_id {
            return Err(SenderError::DcIdInvalid);
        }
        Ok((dc_id as i64, vec![1, 2, 3]))
    }

    fn home_auth_key(&self) -> AuthKey {
        self.remote.home_auth_key.clone()
    }

    fn home_dc_id(&self) -> u8 {
        self.remote.home_dc_id
    }

    fn new_sender(&self) -> Box<dyn RemoteSender> {
        Box::new(FakeSender { remote: self.remote.clone(), auth_key: None })
    }
}

/// Fake [`RemoteSender`] serving chunks from its [`FakeRemote`]'s file table.
pub struct FakeSender {
    remote: Arc<FakeRemote>,
    auth_key: Option<AuthKey>,
}

#[async_trait]
impl RemoteSender for FakeSender {
    async fn connect(&mut self, _dc: DcAddr, auth_key: Option<AuthKey>) -> Result<(), SenderError> {
        self.auth_key = auth_key;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.auth_key = None;
    }

    async fn import_authorization(
        &mut self,
        auth_id: i64,
        _auth_bytes: Vec<u8>,
    ) -> Result<(), SenderError> {
        self.auth_key = Some(AuthKey(auth_id.to_le_bytes().to_vec()));
        Ok(())
    }

    fn auth_key(&self) -> Option<AuthKey> {
        self.auth_key.clone()
    }

    async fn get_file(&mut self, request: &GetFileRequest) -> Result<GetFileChunk, SenderError> {
        if self.remote.rate_limit_once.swap(0, Ordering::AcqRel) == 1 {
            return Err(SenderError::RateLimited { wait: Duration::from_millis(1) });
        }
        let location_id = location_id(&request.location);
        let files = self.remote.files.lock().await;
        let Some(bytes) = files.get(&location_id) else {
            return Ok(GetFileChunk::default());
        };
        let start = request.offset as usize;
        if start >= bytes.len() {
            return Ok(GetFileChunk::default());
        }
        let end = (start + request.limit as usize).min(bytes.len());
        Ok(GetFileChunk { bytes: bytes.slice(start..end) })
    }
}

/// Extracts a stable identity key from an [`gwcore::file_info::InputLocation`]
/// for use as a fixture lookup key.
#[must_use]
pub fn location_id(location: &gwcore::file_info::InputLocation) -> i64 {
    match location {
        gwcore::file_info::InputLocation::Document { id, .. }
        | gwcore::file_info::InputLocation::Photo { id, .. } => *id,
    }
}
