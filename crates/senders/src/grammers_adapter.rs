//! Production [`RemoteSender`]/[`MainClient`] implementations wrapping the
//! `grammers` MTProto stack.
//!
//! [`GrammersMainClient`] drives the authenticated session used for
//! `help.getConfig` and `auth.exportAuthorization`; [`GrammersSender`] is one
//! raw, possibly-unauthenticated channel opened directly against a DC with
//! `grammers-mtsender`, mirroring the way `paralleltransfer.py` drives a bare
//! `MTProtoSender` per pool connection instead of going through the
//! higher-level client for every chunk.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use grammers_client::Client;
use grammers_mtproto::transport::Full;
use grammers_mtsender::{self, Sender};
use grammers_tl_types as tl;

use crate::remote::{
    AuthKey, DcAddr, GetFileChunk, GetFileRequest, MainClient, RemoteSender, SenderError,
};

fn location_to_tl(location: &gwcore::file_info::InputLocation) -> tl::enums::InputFileLocation {
    match location {
        gwcore::file_info::InputLocation::Document { id, access_hash, file_reference, thumb_size } => {
            tl::enums::InputFileLocation::InputDocumentFileLocation(
                tl::types::InputDocumentFileLocation {
                    id: *id,
                    access_hash: *access_hash,
                    file_reference: file_reference.clone(),
                    thumb_size: thumb_size.clone(),
                },
            )
        }
        gwcore::file_info::InputLocation::Photo { id, access_hash, file_reference, thumb_size } => {
            tl::enums::InputFileLocation::InputPhotoFileLocation(tl::types::InputPhotoFileLocation {
                id: *id,
                access_hash: *access_hash,
                file_reference: file_reference.clone(),
                thumb_size: thumb_size.clone(),
            })
        }
    }
}

/// Wraps an authenticated `grammers_client::Client` as the [`MainClient`]
/// used to bootstrap every other DC's sender pool.
pub struct GrammersMainClient {
    client: Client,
    home_auth_key: AuthKey,
    home_dc_id: u8,
}

impl GrammersMainClient {
    /// Wraps an already-connected `client`, authenticated against
    /// `home_dc_id` with `home_auth_key`.
    #[must_use]
    pub fn new(client: Client, home_auth_key: AuthKey, home_dc_id: u8) -> Self {
        Self { client, home_auth_key, home_dc_id }
    }
}

#[async_trait]
impl MainClient for GrammersMainClient {
    async fn resolve_dc(&self, dc_id: u8) -> Result<DcAddr, SenderError> {
        let tl::enums::Config::Config(config) = self
            .client
            .invoke(&tl::functions::help::GetConfig {})
            .await
            .map_err(|e| SenderError::Transport(e.to_string()))?;

        config
            .dc_options
            .into_iter()
            .find_map(|opt| {
                let tl::enums::DcOption::Option(opt) = opt;
                if opt.id as u8 != dc_id || opt.ipv6 || opt.media_only {
                    return None;
                }
                opt.ip_address.parse().ok().map(|ip| DcAddr { ip, port: opt.port as u16 })
            })
            .ok_or_else(|| SenderError::Transport(format!("no ipv4 option for dc {dc_id}")))
    }

    async fn export_authorization(&self, dc_id: u8) -> Result<(i64, Vec<u8>), SenderError> {
        match self
            .client
            .invoke(&tl::functions::auth::ExportAuthorization { dc_id: i32::from(dc_id) })
            .await
        {
            Ok(tl::enums::auth::ExportedAuthorization::Authorization(auth)) => {
                Ok((auth.id, auth.bytes))
            }
            Err(err) if err.to_string().contains("DC_ID_INVALID") => Err(SenderError::DcIdInvalid),
            Err(err) => Err(SenderError::Transport(err.to_string())),
        }
    }

    fn home_auth_key(&self) -> AuthKey {
        self.home_auth_key.clone()
    }

    fn home_dc_id(&self) -> u8 {
        self.home_dc_id
    }

    fn new_sender(&self) -> Box<dyn RemoteSender> {
        Box::new(GrammersSender::new())
    }
}

/// One raw MTProto channel, opened directly with `grammers-mtsender` rather
/// than through the higher-level client, so the pool can hold several
/// connections to the same DC concurrently.
pub struct GrammersSender {
    sender: Option<Sender<Full, grammers_mtsender::mtp::Encrypted>>,
    auth_key: Option<AuthKey>,
}

impl GrammersSender {
    fn new() -> Self {
        Self { sender: None, auth_key: None }
    }

    fn connected(&mut self) -> Result<&mut Sender<Full, grammers_mtsender::mtp::Encrypted>, SenderError> {
        self.sender.as_mut().ok_or_else(|| SenderError::Transport("not connected".into()))
    }
}

#[async_trait]
impl RemoteSender for GrammersSender {
    async fn connect(&mut self, dc: DcAddr, auth_key: Option<AuthKey>) -> Result<(), SenderError> {
        let addr = SocketAddr::new(dc.ip, dc.port);
        let (sender, _handle) = grammers_mtsender::connect(
            Full::new(),
            addr,
            auth_key.as_ref().map(|k| grammers_mtproto::authentication::AuthKey::from_bytes(
                k.0.clone().try_into().map_err(|_| SenderError::Transport("bad auth key length".into()))?,
            )),
        )
        .await
        .map_err(|e| SenderError::Transport(e.to_string()))?;
        self.auth_key = auth_key;
        self.sender = Some(sender);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.sender = None;
    }

    async fn import_authorization(
        &mut self,
        auth_id: i64,
        auth_bytes: Vec<u8>,
    ) -> Result<(), SenderError> {
        let layer = grammers_tl_types::LAYER;
        let request = tl::functions::InvokeWithLayer {
            layer,
            query: tl::functions::InitConnection {
                api_id: 0,
                device_model: String::new(),
                system_version: String::new(),
                app_version: String::new(),
                system_lang_code: String::new(),
                lang_pack: String::new(),
                lang_code: String::new(),
                proxy: None,
                params: None,
                query: tl::functions::auth::ImportAuthorization { id: auth_id, bytes: auth_bytes },
            },
        };
        let sender = self.connected()?;
        sender
            .invoke(&request)
            .await
            .map_err(|e| SenderError::Transport(e.to_string()))?;
        self.auth_key = sender.auth_key().map(|k| AuthKey(k.to_bytes().to_vec()));
        Ok(())
    }

    fn auth_key(&self) -> Option<AuthKey> {
        self.auth_key.clone()
    }

    async fn get_file(&mut self, request: &GetFileRequest) -> Result<GetFileChunk, SenderError> {
        let tl_request = tl::functions::upload::GetFile {
            precise: false,
            cdn_supported: false,
            location: location_to_tl(&request.location),
            offset: request.offset,
            limit: request.limit,
        };
        let sender = self.connected()?;
        match sender.invoke(&tl_request).await {
            Ok(tl::enums::upload::File::File(file)) => {
                Ok(GetFileChunk { bytes: Bytes::from(file.bytes) })
            }
            Ok(tl::enums::upload::File::CdnRedirect(_)) => {
                Err(SenderError::Transport("cdn redirect not supported".into()))
            }
            Err(err) if err.to_string().contains("FLOOD_WAIT") => {
                let wait = err
                    .to_string()
                    .rsplit('_')
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                Err(SenderError::RateLimited { wait: std::time::Duration::from_secs(wait) })
            }
            Err(err) => Err(SenderError::Transport(err.to_string())),
        }
    }
}
