//! `Range: bytes=...` parsing and the response shape it selects.

use log::debug;

const BYTES_UNIT_PREFIX: &str = "bytes=";

/// An inclusive byte interval with `start <= end < file_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this range of a `file_size` byte resource.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Ranges from one header, in header order. Overlaps are kept as separate parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet(Vec<ByteRange>);

impl RangeSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ByteRange> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ByteRange] {
        &self.0
    }
}

impl From<Vec<ByteRange>> for RangeSet {
    fn from(ranges: Vec<ByteRange>) -> Self {
        RangeSet(ranges)
    }
}

/// Parses a `Range` header value against a resource of `file_size` bytes.
///
/// Returns `None` when the header does not use the `bytes=` unit; the caller
/// serves the whole resource. An understood header whose specs all fail to
/// fit yields an empty set, which the caller must answer with 416.
pub fn parse_range_header(header: &str, file_size: u64) -> Option<RangeSet> {
    let specs = header.trim().strip_prefix(BYTES_UNIT_PREFIX)?;

    let ranges = specs
        .split(',')
        .filter_map(|spec| {
            let range = parse_range_spec(spec.trim(), file_size);
            if range.is_none() {
                debug!("Skipping range spec '{spec}' for size {file_size}");
            }
            range
        })
        .collect::<Vec<_>>();

    Some(RangeSet(ranges))
}

fn parse_range_spec(spec: &str, file_size: u64) -> Option<ByteRange> {
    let (start_str, end_str) = spec.split_once('-')?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());
    let last = file_size.checked_sub(1)?;

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return None,
        (true, false) => {
            let suffix_len = parse_position(end_str)?;
            (file_size.saturating_sub(suffix_len), last)
        }
        (false, true) => (parse_position(start_str)?, last),
        (false, false) => (parse_position(start_str)?, parse_position(end_str)?),
    };

    let end = end.min(last);
    if start > end {
        return None;
    }
    Some(ByteRange { start, end })
}

// Digit strings too large for u64 saturate, so an oversized end still clamps.
fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s.parse::<u64>().unwrap_or(u64::MAX))
}

/// How a file response is framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// 200 with the entire file.
    Whole,
    /// 206 with one `Content-Range`.
    SinglePart(ByteRange),
    /// 206 `multipart/byteranges`, parts in header order.
    MultiPart(RangeSet),
    /// 416.
    Unsatisfiable,
}

impl ResponseShape {
    /// Chooses the response shape for an optional `Range` header value.
    pub fn plan(range_header: Option<&str>, file_size: u64) -> Self {
        let Some(header) = range_header else {
            return ResponseShape::Whole;
        };
        match parse_range_header(header, file_size) {
            None => ResponseShape::Whole,
            Some(ranges) => match ranges.as_slice() {
                [] => ResponseShape::Unsatisfiable,
                [single] => ResponseShape::SinglePart(*single),
                _ => ResponseShape::MultiPart(ranges),
            },
        }
    }

    pub fn status(&self) -> (u16, &'static str) {
        match self {
            ResponseShape::Whole => (200, "OK"),
            ResponseShape::SinglePart(_) | ResponseShape::MultiPart(_) => {
                (206, "Partial Content")
            }
            ResponseShape::Unsatisfiable => (416, "Range Not Satisfiable"),
        }
    }
}
