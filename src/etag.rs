//! Content-derived version tokens.

/// Compute the version token for a document's canonical byte form.
///
/// The token is a fingerprint of the exact bytes: identical input always
/// yields the same token, any change to the input yields a different one.
/// Tokens are compared with plain string equality everywhere.
pub fn compute(document: &[u8]) -> String {
    sha256::digest(document)
}
