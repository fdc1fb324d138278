//! Zero-allocation call line parsing utilities.
//!
//! These functions work on raw line bytes and never allocate; the reader
//! reuses one field-bounds buffer for every line of a source.

use memchr::memchr_iter;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty, contains non-digit characters or
/// does not fit in a u64.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Strip a trailing `\n` or `\r\n`.
#[inline(always)]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Check if a line should be skipped (empty or comment).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#'
}

/// Record the `(start, end)` byte range of every tab-separated field.
///
/// `bounds` is cleared first so a single buffer can be reused per line.
#[inline]
pub fn split_tab_fields(line: &[u8], bounds: &mut Vec<(usize, usize)>) {
    bounds.clear();
    let mut start = 0;
    for tab in memchr_iter(b'\t', line) {
        bounds.push((start, tab));
        start = tab + 1;
    }
    bounds.push((start, line.len()));
}
