//! URL content hash - the cross-store identity key for places
//!
//! The hash is the golden-ratio rolling hash used by Firefox's `hash()` SQL
//! function. Two stores that never shared row ids still agree on it, so it is
//! the only safe way to decide that two places are the same URL.
//!
//! Layout of the 64-bit value:
//! - bits 32..48: low 16 bits of the hash of the scheme (text before the first `:`)
//! - bits 0..32: hash of the whole URL

use crate::{Error, Result};

/// Golden-ratio multiplier applied at every step.
pub const GOLDEN_RATIO: u32 = 0x9E37_79B9;

#[inline]
fn add_to_hash(acc: u32, byte: u8) -> u32 {
    GOLDEN_RATIO.wrapping_mul(acc.rotate_left(5) ^ u32::from(byte))
}

/// 32-bit rolling hash over the UTF-8 bytes of `s`.
pub fn hash_simple(s: &str) -> u32 {
    s.bytes().fold(0, add_to_hash)
}

/// Compute the content hash of an absolute URL.
///
/// A URL without a `:` has no scheme and is rejected as malformed.
pub fn url_hash(url: &str) -> Result<u64> {
    let (scheme, _) = url
        .split_once(':')
        .ok_or_else(|| Error::MalformedInput(format!("URL has no scheme separator: {:?}", url)))?;

    let prefix = u64::from(hash_simple(scheme) & 0x0000_FFFF);
    Ok((prefix << 32) | u64::from(hash_simple(url)))
}

/// Content hash as stored in SQLite (`INTEGER` is signed 64-bit; the value
/// never exceeds 48 bits so the conversion is lossless).
pub fn url_hash_i64(url: &str) -> Result<i64> {
    url_hash(url).map(|h| h as i64)
}
