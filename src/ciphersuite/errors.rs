//! Errors thrown by the cryptographic primitives.

use thiserror::Error;

/// Crypto error
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum CryptoError {
    /// Unrecoverable error in the crypto library.
    #[error("Unrecoverable error in the crypto library.")]
    CryptoLibraryError,
    /// Error while decrypting an AEAD ciphertext.
    #[error("Error while decrypting an AEAD ciphertext.")]
    AeadDecryptionError,
    /// Error while decrypting an HPKE ciphertext.
    #[error("Error while decrypting an HPKE ciphertext.")]
    HpkeDecryptionError,
    /// The ciphersuite is not supported by the backend.
    #[error("The ciphersuite is not supported by the backend.")]
    UnsupportedCiphersuite,
    /// This SignatureScheme is not supported.
    #[error("This SignatureScheme is not supported.")]
    UnsupportedSignatureScheme,
    /// The requested Kdf label length is too large.
    #[error("The requested Kdf label length is too large.")]
    KdfLabelTooLarge,
    /// Serialization of the Kdf label failed.
    #[error("Serialization of the Kdf label failed.")]
    KdfSerializationError,
    /// The requested HKDF output length is invalid.
    #[error("The requested HKDF output length is invalid.")]
    HkdfOutputLengthInvalid,
    /// The signature could not be verified.
    #[error("The signature could not be verified.")]
    InvalidSignature,
    /// Key material has the wrong length for the algorithm.
    #[error("Key material has the wrong length for the algorithm.")]
    InvalidLength,
}
