//! Pure arithmetic translating an HTTP byte range into aligned `GetFile`
//! chunk requests (`spec.md` §4.B).
//!
//! The remote `GetFile` RPC only accepts offsets aligned to `part_size` and
//! returns at most one part per call, so a `[offset, limit]` byte range
//! (both inclusive) is widened to the smallest run of aligned parts that
//! cover it, and the first/last part are trimmed down to the requested
//! bytes before being emitted.

use bytes::Bytes;

/// Chunk-aligned view of one `(offset, limit)` byte-range request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Aligned chunk size in bytes.
    pub part_size: u32,
    /// Index (0-based) of the first part that must be fetched.
    pub first_part: u64,
    /// Byte offset within the first part where the requested range begins.
    pub first_cut: u64,
    /// Index (0-based, inclusive) of the last part that must be fetched.
    pub last_part: u64,
    /// Exclusive byte offset within the last part where the requested
    /// range ends.
    pub last_cut: u64,
    /// Total number of parts in the file, for logging only.
    pub part_count: u64,
}

impl ChunkPlan {
    /// Builds the plan for `[offset, limit]` (both inclusive) against a file
    /// of `file_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `offset > limit` or `limit >= file_size` — callers must
    /// validate the range against `file_size` before building a plan
    /// (`spec.md` §4.E step 5 does this at the HTTP boundary).
    #[must_use]
    pub fn new(offset: u64, limit: u64, file_size: u64, part_size: u32) -> Self {
        assert!(offset <= limit, "offset must not exceed limit");
        assert!(limit < file_size, "limit must be within the file");

        let part_size_u64 = u64::from(part_size);
        Self {
            part_size,
            first_part: offset / part_size_u64,
            first_cut: offset % part_size_u64,
            last_part: limit / part_size_u64,
            last_cut: (limit % part_size_u64) + 1,
            part_count: file_size.div_ceil(part_size_u64),
        }
    }

    /// Byte offset of the first `GetFile` request.
    #[must_use]
    pub fn initial_request_offset(&self) -> i64 {
        (self.first_part * u64::from(self.part_size)) as i64
    }

    /// Whether the whole requested range fits inside a single part.
    #[must_use]
    pub const fn single_part(&self) -> bool {
        self.first_part == self.last_part
    }

    /// Trims a raw chunk returned for part index `part` down to the bytes
    /// actually requested.
    ///
    /// `part` must be in `first_part..=last_part`. Resolves the open
    /// question in `spec.md` §9 in favor of the `[first_cut:last_cut]`
    /// slicing when the range fits in one part; the `[first_part:last_part]`
    /// variant (treating part indices as byte offsets) is not implemented.
    #[must_use]
    pub fn trim(&self, part: u64, chunk: &Bytes) -> Bytes {
        if self.single_part() {
            chunk.slice(self.first_cut as usize..(self.last_cut as usize).min(chunk.len()))
        } else if part == self.first_part {
            chunk.slice((self.first_cut as usize).min(chunk.len())..)
        } else if part == self.last_part {
            chunk.slice(..(self.last_cut as usize).min(chunk.len()))
        } else {
            chunk.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: u32 = 1024 * 1024;
    const PART_U64: u64 = PART as u64;

    #[test]
    fn single_byte_at_start() {
        let plan = ChunkPlan::new(0, 0, 3 * PART_U64, PART);
        assert_eq!(plan.first_part, 0);
        assert_eq!(plan.last_part, 0);
        assert!(plan.single_part());
        assert_eq!(plan.first_cut, 0);
        assert_eq!(plan.last_cut, 1);
    }

    #[test]
    fn last_byte_of_first_part() {
        let plan = ChunkPlan::new(PART_U64 - 1, PART_U64 - 1, 3 * PART_U64, PART);
        assert!(plan.single_part());
        assert_eq!(plan.first_part, 0);
        assert_eq!(plan.first_cut, PART_U64 - 1);
        assert_eq!(plan.last_cut, PART_U64);
    }

    #[test]
    fn first_byte_of_second_part() {
        let plan = ChunkPlan::new(PART_U64, PART_U64, 3 * PART_U64, PART);
        assert_eq!(plan.first_part, 1);
        assert_eq!(plan.last_part, 1);
        assert_eq!(plan.first_cut, 0);
    }

    #[test]
    fn spans_a_part_boundary() {
        let plan = ChunkPlan::new(PART_U64 - 1, PART_U64 + 1, 3 * PART_U64, PART);
        assert_eq!(plan.first_part, 0);
        assert_eq!(plan.last_part, 1);
        assert!(!plan.single_part());
        assert_eq!(plan.first_cut, PART_U64 - 1);
        assert_eq!(plan.last_cut, 2);
    }

    #[test]
    fn whole_file() {
        let size = 3 * PART_U64;
        let plan = ChunkPlan::new(0, size - 1, size, PART);
        assert_eq!(plan.first_part, 0);
        assert_eq!(plan.last_part, 2);
        assert_eq!(plan.part_count, 3);
        assert_eq!(plan.last_cut, PART_U64);
    }

    #[test]
    fn trims_middle_chunk_untouched() {
        let plan = ChunkPlan::new(0, 3 * PART_U64 - 1, 3 * PART_U64, PART);
        let chunk = Bytes::from(vec![7u8; PART as usize]);
        let trimmed = plan.trim(1, &chunk);
        assert_eq!(trimmed.len(), PART as usize);
    }

    #[test]
    fn trims_first_and_last_chunks() {
        let plan = ChunkPlan::new(PART_U64 - 1, PART_U64 + 1, 3 * PART_U64, PART);
        let first_chunk = Bytes::from(vec![1u8; PART as usize]);
        let last_chunk = Bytes::from(vec![2u8; PART as usize]);
        let first = plan.trim(0, &first_chunk);
        let last = plan.trim(1, &last_chunk);
        assert_eq!(first.len(), 1);
        assert_eq!(last.len(), 2);
    }

    /// Mirrors the `bytes=1048575-1048577` end-to-end scenario: exactly
    /// three bytes crossing a part boundary, no more.
    #[test]
    fn boundary_span_yields_exactly_requested_length() {
        let plan = ChunkPlan::new(PART_U64 - 1, PART_U64 + 1, 3 * PART_U64, PART);
        let first_chunk = Bytes::from(vec![1u8; PART as usize]);
        let last_chunk = Bytes::from(vec![2u8; PART as usize]);
        let mut out = Vec::new();
        out.extend_from_slice(&plan.trim(plan.first_part, &first_chunk));
        out.extend_from_slice(&plan.trim(plan.last_part, &last_chunk));
        assert_eq!(out.len(), 3);
    }
}
