//! `Range` header parsing and validation (`spec.md` §4.E steps 4-5).
//!
//! Parses the raw `bytes=start-end` header directly rather than through an
//! intermediate slice abstraction, so `end` is already the inclusive last
//! byte the client asked for and needs no off-by-one adjustment.

/// A validated, inclusive byte range against a known file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte requested (inclusive).
    pub from: u64,
    /// Last byte requested (inclusive).
    pub until: u64,
}

impl ByteRange {
    /// Whether this range covers the whole file, i.e. warrants a 200
    /// rather than a 206.
    #[must_use]
    pub const fn is_whole_file(&self, size: u64) -> bool {
        self.from == 0 && self.until + 1 == size
    }

    /// Number of bytes this range covers.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.until - self.from + 1
    }
}

/// Parses and validates an optional `Range` header against `size`.
///
/// Returns `Err(())` (surfaced as a 416 by the caller) when the header is
/// present but unparsable, or when `until >= size`, `until < from`
/// (`spec.md` §4.E step 5).
pub fn parse(header: Option<&str>, size: u64) -> Result<ByteRange, ()> {
    let (from, until) = match header {
        None => (0, size.saturating_sub(1)),
        Some(raw) => parse_bytes_unit(raw, size).ok_or(())?,
    };

    if until >= size || until < from {
        return Err(());
    }
    Ok(ByteRange { from, until })
}

fn parse_bytes_unit(header: &str, size: u64) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start_str, end_str) = spec.split_once('-')?;

    let start = (!start_str.is_empty()).then(|| start_str.parse::<u64>()).transpose().ok()?;
    let end = (!end_str.is_empty()).then(|| end_str.parse::<u64>()).transpose().ok()?;

    match (start, end) {
        (Some(from), Some(until)) => Some((from, until)),
        (Some(from), None) => Some((from, size.saturating_sub(1))),
        (None, Some(suffix_len)) => Some((size.saturating_sub(suffix_len), size.saturating_sub(1))),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u64 = 3 * 1024 * 1024;

    #[test]
    fn no_header_is_the_whole_file() {
        let range = parse(None, SIZE).unwrap();
        assert_eq!(range, ByteRange { from: 0, until: SIZE - 1 });
        assert!(range.is_whole_file(SIZE));
    }

    #[test]
    fn single_byte_range() {
        let range = parse(Some("bytes=0-0"), SIZE).unwrap();
        assert_eq!(range, ByteRange { from: 0, until: 0 });
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn open_ended_range() {
        let range = parse(Some("bytes=1048575-"), SIZE).unwrap();
        assert_eq!(range.until, SIZE - 1);
    }

    #[test]
    fn range_past_eof_is_rejected() {
        assert!(parse(Some("bytes=3145728-"), SIZE).is_err());
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(parse(Some("nonsense"), SIZE).is_err());
    }

    #[test]
    fn suffix_range_counts_from_the_end() {
        let range = parse(Some("bytes=-500"), SIZE).unwrap();
        assert_eq!(range.until, SIZE - 1);
        assert_eq!(range.len(), 500);
    }
}
