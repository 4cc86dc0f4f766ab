//! # cgka
//!
//! Continuous group key agreement over a TreeKEM ratchet tree.
//!
//! A dynamic set of members derives a shared epoch secret, evolves it as
//! members join, leave and rotate keys, and encrypts application payloads
//! under per-sender ratchets keyed from it. Each commit gives the group
//! forward secrecy and post-compromise security with respect to the
//! members it removes or rotates.
//!
//! The crate is single-threaded and synchronous; a [`group::State`] is
//! owned by exactly one logical task and every operation either returns
//! the new state or an error without visible partial mutation.
//!
//! ```no_run
//! use cgka::prelude::*;
//!
//! let suite = CipherSuite::X25519_SHA256_AES128GCM;
//! let alice = CredentialBundle::new(b"alice", suite.signature_scheme())?;
//! let (credential, identity_priv) = alice.into_parts();
//! let init_secret = Secret::random(suite);
//! let bundle = KeyPackageBundle::from_leaf_secret(
//!     suite,
//!     init_secret.clone(),
//!     credential,
//!     &identity_priv,
//! )?;
//! let group = State::new(
//!     GroupId::from_slice(b"book club"),
//!     suite,
//!     init_secret,
//!     identity_priv,
//!     bundle.key_package().clone(),
//! )?;
//! # Ok::<(), cgka::error::Error>(())
//! ```

// Logging of key material is compiled out unless the crypto-debug
// feature is on.
macro_rules! log_crypto {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "crypto-debug")]
        log::$level!($($arg)*);
    }};
}

pub mod ciphersuite;
pub mod credentials;
pub mod error;
pub mod framing;
pub mod group;
pub mod key_packages;
pub mod messages;
pub(crate) mod schedule;
pub mod tree;

pub mod prelude;
