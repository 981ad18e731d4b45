//! HTTP Range request parsing module
//!
//! Parses single-range `Range` headers for media seeking. Only the
//! `bytes=start-[end]` form is accepted; everything else degrades to a full
//! 200 response so that odd clients still get their file.

/// Parsed Range request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRange {
    /// Start byte position
    pub start: u64,
    /// End byte position (inclusive), None means until end of file
    pub end: Option<u64>,
}

impl ByteRange {
    /// Resolve the inclusive end position against the file size
    #[inline]
    pub fn end_position(&self, file_size: u64) -> u64 {
        self.end.unwrap_or_else(|| file_size.saturating_sub(1))
    }

    /// Number of bytes the range covers once resolved
    #[inline]
    pub fn content_length(&self, file_size: u64) -> u64 {
        self.end_position(file_size).saturating_sub(self.start) + 1
    }
}

/// Range header parse result
#[derive(Debug)]
pub enum RangeParseResult {
    /// Valid range request
    Valid(ByteRange),
    /// Start is at or beyond file size - should return 416
    NotSatisfiable,
    /// No Range header, or a form we do not serve (ignore, return full content)
    None,
}

/// Parse an HTTP Range header (single range, bytes unit only)
///
/// Accepted forms:
/// - `bytes=start-end`
/// - `bytes=start-`
///
/// Multi-ranges (`bytes=0-10,20-30`), suffix ranges (`bytes=-500`), and
/// backwards intervals (`bytes=100-50`) all fall back to `None`.
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeParseResult::None; // Not bytes unit, ignore
    };

    // Only a single range is served
    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    // Suffix ranges ("-500") are unsupported; start is required
    if start_str.is_empty() || !start_str.bytes().all(|b| b.is_ascii_digit()) {
        return RangeParseResult::None;
    }
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    // Start beyond file size is not satisfiable
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        None // Open-ended range
    } else {
        if !end_str.bytes().all(|b| b.is_ascii_digit()) {
            return RangeParseResult::None;
        }
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        // Backwards interval: treat the header as unparseable
        if start > e {
            return RangeParseResult::None;
        }
        // Clamp end to file size - 1
        Some(e.min(file_size - 1))
    };

    RangeParseResult::Valid(ByteRange { start, end })
}
