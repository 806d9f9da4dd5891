use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// Structured error handling for the crypto module so callers never need
/// to `.unwrap()` a hash/hex conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid hexadecimal string format.
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Hash has invalid length.
    #[error("Invalid hash length: {len} bytes, expected: {expected} bytes")]
    InvalidHashLength { len: usize, expected: usize },
}
