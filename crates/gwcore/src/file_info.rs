//! The [`FileInfo`] record resolved from a `(message_id, filename)` pair.

/// Opaque descriptor required by the remote network's `GetFile` RPC to
/// identify the bytes behind a message's media. The remote protocol exposes
/// two shapes — one per document, one per photo — and callers never need to
/// distinguish them beyond passing the right one back into `GetFile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputLocation {
    /// Location of a document's bytes (the common case: arbitrary files).
    Document {
        /// Remote object id.
        id: i64,
        /// Remote access hash authorizing this client to read the object.
        access_hash: i64,
        /// Opaque file reference token, refreshed by the remote network
        /// independently of `id`/`access_hash`.
        file_reference: Vec<u8>,
        /// Requested thumbnail size, empty for the original file.
        thumb_size: String,
    },
    /// Location of a photo's bytes.
    Photo {
        /// Remote object id.
        id: i64,
        /// Remote access hash authorizing this client to read the object.
        access_hash: i64,
        /// Opaque file reference token.
        file_reference: Vec<u8>,
        /// Requested thumbnail size.
        thumb_size: String,
    },
}

/// Immutable metadata describing one streamable file, resolved once per
/// `message_id` and cached. See `spec.md` §3 for the invariants this record
/// must satisfy (in particular: `file_name` is the integrity check that
/// guards against message/cache-id reuse attacks, §4.E).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Size of the file in bytes.
    pub file_size: u64,
    /// MIME type reported to HTTP clients.
    pub mime_type: String,
    /// The name the client asked for; must match the name the message
    /// itself carries (see [`Self::matches_name`]).
    pub file_name: String,
    /// Remote object identifier (opaque 64-bit).
    pub id: i64,
    /// Which of the five DCs physically stores the bytes.
    pub dc_id: u8,
    /// Input-file-location payload required by `GetFile`.
    pub location: InputLocation,
}

impl FileInfo {
    /// Returns whether `candidate` is the exact name this file was resolved
    /// under. The HTTP route's `{name}` segment must match after URL
    /// decoding; a mismatch means "not found", not "found under another
    /// name" (`spec.md` §4.E route shape note).
    #[must_use]
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.file_name == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileInfo {
        FileInfo {
            file_size: 3 * 1024 * 1024,
            mime_type: "application/octet-stream".to_string(),
            file_name: "name.bin".to_string(),
            id: 42,
            dc_id: 2,
            location: InputLocation::Document {
                id: 42,
                access_hash: 7,
                file_reference: vec![1, 2, 3],
                thumb_size: String::new(),
            },
        }
    }

    #[test]
    fn matches_exact_name_only() {
        let info = sample();
        assert!(info.matches_name("name.bin"));
        assert!(!info.matches_name("wrong.bin"));
    }
}
