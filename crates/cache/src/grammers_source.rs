//! Production [`FileInfoSource`] backed by a live `grammers_client::Client`,
//! grounded on `utils.py`'s `get_fileinfo`/`get_filename`.

use grammers_client::Client;
use grammers_tl_types as tl;
use gwcore::error::GatewayError;
use gwcore::file_info::{FileInfo, InputLocation};

use crate::file_info::FileInfoSource;

/// Looks messages up in one fixed channel (the configured bin channel).
pub struct GrammersFileInfoSource {
    client: Client,
    bin_channel: i64,
}

impl GrammersFileInfoSource {
    /// Builds a source that resolves message ids against `bin_channel`.
    #[must_use]
    pub fn new(client: Client, bin_channel: i64) -> Self {
        Self { client, bin_channel }
    }
}

/// Uses the document's own filename attribute if present; otherwise
/// `"{id}"` with no extension, matching `get_filename`'s fallback.
fn derive_filename(doc: &tl::types::Document) -> String {
    for attr in &doc.attributes {
        if let tl::enums::DocumentAttribute::Filename(f) = attr {
            return f.file_name.clone();
        }
    }
    doc.id.to_string()
}

/// Photos carry no filename attribute at all, so `get_filename` always falls
/// back to `"{id}"` for them.
fn derive_photo_filename(photo: &tl::types::Photo) -> String {
    photo.id.to_string()
}

/// Largest available size in bytes across a photo's size variants, matching
/// `message.file.size` for a `MessageMediaPhoto` (the original takes
/// whichever size Telethon resolves as the "full" one; here that is simply
/// the maximum reported byte count across all variants).
fn largest_photo_size(sizes: &[tl::enums::PhotoSize]) -> u64 {
    sizes
        .iter()
        .map(|size| match size {
            tl::enums::PhotoSize::Empty(_) => 0,
            tl::enums::PhotoSize::Size(s) => s.size as u64,
            tl::enums::PhotoSize::CachedSize(s) => s.bytes.len() as u64,
            tl::enums::PhotoSize::StrippedSize(s) => s.bytes.len() as u64,
            tl::enums::PhotoSize::Progressive(s) => {
                s.sizes.iter().copied().max().unwrap_or(0) as u64
            }
            tl::enums::PhotoSize::PathSize(s) => s.bytes.len() as u64,
        })
        .max()
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl FileInfoSource for GrammersFileInfoSource {
    async fn fetch(
        &self,
        message_id: i64,
        expected_name: &str,
    ) -> Result<Option<FileInfo>, GatewayError> {
        let messages = self
            .client
            .invoke(&tl::functions::channels::GetMessages {
                channel: tl::enums::InputChannel::Channel(tl::types::InputChannel {
                    channel_id: self.bin_channel,
                    access_hash: 0,
                }),
                id: vec![tl::enums::InputMessage::Id(tl::types::InputMessageId {
                    id: message_id as i32,
                })],
            })
            .await
            .map_err(|e| GatewayError::UpstreamTransient(e.to_string()))?;

        let tl::enums::messages::Messages::ChannelMessages(msgs) = messages else {
            return Ok(None);
        };
        let Some(tl::enums::Message::Message(message)) = msgs.messages.into_iter().next() else {
            return Ok(None);
        };
        match message.media {
            Some(tl::enums::MessageMedia::Document(media_doc)) => {
                let Some(tl::enums::Document::Document(doc)) = media_doc.document else {
                    return Ok(None);
                };

                let file_name = derive_filename(&doc);
                if file_name != expected_name {
                    return Ok(None);
                }

                let mime_type = if doc.mime_type.is_empty() {
                    "application/octet-stream".to_string()
                } else {
                    doc.mime_type.clone()
                };

                Ok(Some(FileInfo {
                    file_size: doc.size as u64,
                    mime_type,
                    file_name,
                    id: doc.id,
                    dc_id: doc.dc_id as u8,
                    location: InputLocation::Document {
                        id: doc.id,
                        access_hash: doc.access_hash,
                        file_reference: doc.file_reference.clone(),
                        thumb_size: String::new(),
                    },
                }))
            }
            Some(tl::enums::MessageMedia::Photo(media_photo)) => {
                let Some(tl::enums::Photo::Photo(photo)) = media_photo.photo else {
                    return Ok(None);
                };

                let file_name = derive_photo_filename(&photo);
                if file_name != expected_name {
                    return Ok(None);
                }

                Ok(Some(FileInfo {
                    file_size: largest_photo_size(&photo.sizes),
                    mime_type: "image/jpeg".to_string(),
                    file_name,
                    id: photo.id,
                    dc_id: photo.dc_id as u8,
                    location: InputLocation::Photo {
                        id: photo.id,
                        access_hash: photo.access_hash,
                        file_reference: photo.file_reference.clone(),
                        thumb_size: String::new(),
                    },
                }))
            }
            _ => Ok(None),
        }
    }
}
