//! Single-import surface for applications.

pub use crate::ciphersuite::{CipherSuite, Secret, SignatureKeypair, SignatureScheme};
pub use crate::credentials::{Credential, CredentialBundle};
pub use crate::error::Error;
pub use crate::framing::{MlsCiphertext, MlsPlaintext};
pub use crate::group::{GroupEpoch, GroupId, State};
pub use crate::key_packages::{KeyPackage, KeyPackageBundle};
pub use crate::messages::Welcome;
pub use crate::tree::index::LeafIndex;
pub use crate::tree::sender_ratchet::SenderRatchetConfiguration;
