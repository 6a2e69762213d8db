/// Percent-encodes `value` per RFC 3986.
///
/// Only the unreserved set `A-Z a-z 0-9 - _ . ~` passes through; a space
/// becomes `%20`, never `+`.
#[must_use]
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
