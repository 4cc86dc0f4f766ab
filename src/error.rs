//! Crate-level error taxonomy.
//!
//! Failures never mutate caller state: an operation either returns the new
//! value or an error describing why the input was rejected.

use thiserror::Error;

use crate::ciphersuite::errors::CryptoError;

/// The error type returned by all fallible library operations.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum Error {
    /// Caller misuse: wrong index, blank leaf, mismatched key material.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// Peer misbehavior or malformed protocol input: path and resolution
    /// sizes that disagree, hash mismatches, unknown proposal references.
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    /// A primitive rejected its input (AEAD open, HPKE decrypt, signature
    /// verification).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Malformed wire encoding.
    #[error(transparent)]
    Codec(#[from] tls_codec::Error),
    /// A handshake message for an epoch other than the current one.
    #[error("message addresses an epoch that is not current")]
    StaleEpoch,
    /// An application message outside the receiver's out-of-order window.
    /// This is the only error expected during normal operation.
    #[error("message generation is outside the receiver window")]
    StaleGeneration,
}
