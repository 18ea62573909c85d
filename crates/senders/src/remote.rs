//! The trait seam between the connection pool and the live transport.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gwcore::file_info::InputLocation;

/// Resolved IP/port of a DC, as returned by the remote network's
/// `help.getConfig` RPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DcAddr {
    /// DC's public IP address.
    pub ip: IpAddr,
    /// DC's port.
    pub port: u16,
}

/// Symmetric auth key produced by the remote network's authorization
/// handshake; valid only for the DC it was established against.
#[derive(Clone)]
pub struct AuthKey(pub Vec<u8>);

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthKey").field(&format_args!("<{} bytes>", self.0.len())).finish()
    }
}

/// A single aligned-chunk request, mirroring the remote `upload.GetFile` RPC.
#[derive(Clone, Debug)]
pub struct GetFileRequest {
    /// Input-file-location payload identifying the bytes.
    pub location: InputLocation,
    /// Byte offset of the chunk, must be aligned to the caller's part size.
    pub offset: i64,
    /// Requested chunk size in bytes.
    pub limit: i32,
}

/// One chunk returned by `GetFile`. An empty payload signals end of file.
#[derive(Clone, Debug, Default)]
pub struct GetFileChunk {
    /// Raw chunk bytes.
    pub bytes: Bytes,
}

/// Failure from a live sender or the main client.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    /// The remote network asked the caller to wait before retrying.
    #[error("flood wait: {wait:?}")]
    RateLimited {
        /// How long the caller must wait before retrying.
        wait: Duration,
    },
    /// `ExportAuthorization` reported the target DC is the caller's home DC.
    #[error("dc id invalid (target dc is the home dc)")]
    DcIdInvalid,
    /// Any other transport/protocol failure (disconnect, malformed reply).
    #[error("transport error: {0}")]
    Transport(String),
}

/// A live, possibly-unauthenticated encrypted channel bound to one DC.
///
/// Implementations own exactly one underlying socket; [`pool::Connection`]
/// (see [`crate::pool`]) is the unit that tracks reuse and in-flight users.
#[async_trait]
pub trait RemoteSender: Send {
    /// Connects to `dc`, seeding the sender with `auth_key` if one is
    /// already known for this DC (skips the auth-export handshake).
    async fn connect(&mut self, dc: DcAddr, auth_key: Option<AuthKey>) -> Result<(), SenderError>;

    /// Disconnects the underlying socket. Idempotent.
    async fn disconnect(&mut self);

    /// Sends `InvokeWithLayer(LAYER, InitConnection(query=ImportAuthorization(id,
    /// bytes)))` to complete the auth-export handshake on a freshly connected,
    /// unauthenticated sender.
    async fn import_authorization(
        &mut self,
        auth_id: i64,
        auth_bytes: Vec<u8>,
    ) -> Result<(), SenderError>;

    /// Returns the sender's current auth key, if the handshake has
    /// completed (or if it was seeded with one at `connect`).
    fn auth_key(&self) -> Option<AuthKey>;

    /// Sends one `GetFile` request and awaits its reply.
    async fn get_file(&mut self, request: &GetFileRequest) -> Result<GetFileChunk, SenderError>;
}

/// The caller's own authenticated session, used to export its identity to
/// other DCs and to resolve DC addresses.
#[async_trait]
pub trait MainClient: Send + Sync {
    /// Resolves `dc_id` to an `(ip, port)` pair via `help.getConfig`.
    async fn resolve_dc(&self, dc_id: u8) -> Result<DcAddr, SenderError>;

    /// Calls `ExportAuthorization(dc_id)` on the main session.
    ///
    /// Returns [`SenderError::DcIdInvalid`] when `dc_id` is the caller's own
    /// home DC — the caller should fall back to [`Self::home_auth_key`]
    /// directly rather than treat this as fatal (`spec.md` §4.A).
    async fn export_authorization(&self, dc_id: u8) -> Result<(i64, Vec<u8>), SenderError>;

    /// The main session's own auth key, valid for [`Self::home_dc_id`].
    fn home_auth_key(&self) -> AuthKey;

    /// The DC the main session is authenticated against.
    fn home_dc_id(&self) -> u8;

    /// Constructs a fresh, unconnected sender instance.
    fn new_sender(&self) -> Box<dyn RemoteSender>;
}
