//! `Range: bytes=...` resolution against a known file size.
//!
//! Supported forms (a single range only):
//!
//! ```text
//! bytes=A-B   bytes A through B inclusive   -> [A, B + 1)
//! bytes=A-    from A to the end             -> [A, size)
//! bytes=-N    the final N bytes             -> [size - N, size)
//! ```

use crate::http::error::RangeError;

/// A half-open byte interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The `Content-Range` value for this span (last byte inclusive).
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end.saturating_sub(1), size)
    }
}

/// Resolves an optional `Range` header value to the span to send.
///
/// Without a header the whole file is selected. An empty span is returned
/// as-is so the caller can answer it with a zero-length body; any other
/// span must lie within `[0, size)` or the range is unsatisfiable.
pub fn resolve(range: Option<&str>, size: u64) -> Result<Span, RangeError> {
    let Some(header) = range else {
        return Ok(Span { start: 0, end: size });
    };

    let (first, last) = parse_range(header)?;

    // i128 so that suffix lengths past the start of the file go negative
    // instead of wrapping.
    let size_i = i128::from(size);
    let (start, end) = match (first, last) {
        (Some(a), Some(b)) => (i128::from(a), i128::from(b) + 1),
        (Some(a), None) => (i128::from(a), size_i),
        (None, Some(n)) => (size_i - i128::from(n), size_i),
        (None, None) => (0, size_i),
    };

    if start == end {
        return Ok(Span {
            start: start.clamp(0, size_i) as u64,
            end: end.clamp(0, size_i) as u64,
        });
    }

    if start < 0 || end > size_i || start > end {
        return Err(RangeError::Unsatisfiable {
            range: header.to_string(),
            size,
        });
    }

    Ok(Span {
        start: start as u64,
        end: end as u64,
    })
}

fn parse_range(header: &str) -> Result<(Option<u64>, Option<u64>), RangeError> {
    let syntax = || RangeError::Syntax(header.to_string());

    let set = header.trim().strip_prefix("bytes=").ok_or_else(syntax)?;
    if set.contains(',') {
        return Err(syntax());
    }
    let (first, last) = set.split_once('-').ok_or_else(syntax)?;

    let first = parse_bound(first.trim()).ok_or_else(syntax)?;
    let last = parse_bound(last.trim()).ok_or_else(syntax)?;
    Ok((first, last))
}

// `Some(None)` for an omitted bound, `None` for garbage
fn parse_bound(s: &str) -> Option<Option<u64>> {
    if s.is_empty() {
        return Some(None);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().map(Some)
}
