//! Request path construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in object keys: everything except the RFC 3986
/// unreserved set and `/`, which separates key segments.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// `/{bucket}`. An empty bucket yields `/`, the service root.
#[must_use]
pub fn bucket_path(bucket: &str) -> String {
    format!("/{bucket}")
}

/// `/{bucket}/{key}` with the key percent-encoded.
#[must_use]
pub fn object_path(bucket: &str, key: &str) -> String {
    format!("/{bucket}/{}", utf8_percent_encode(key, KEY_ENCODE_SET))
}
