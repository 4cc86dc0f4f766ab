//! The epoch key schedule.
//!
//! Each commit folds the committer's fresh commit secret into the running
//! init secret and expands the result, bound to the new epoch's
//! [`GroupContext`](crate::group::GroupContext), into the epoch's working
//! secrets:
//!
//! ```text
//! joiner_secret = HKDF-Extract(init_secret_[n-1], commit_secret)
//! member_secret = HKDF-Extract(joiner_secret, psk_or_zero)
//! epoch_secret  = HKDF-Expand-Label(member_secret, "epoch", GroupContext_[n], Nh)
//! ```
//!
//! Every derived secret is its own type so the schedule cannot be run
//! out of order or a secret confused with another.

use crate::ciphersuite::{CipherSuite, Mac, Secret};
use crate::error::Error;

pub(crate) mod message_secrets;

/// The root path secret of the committer's fresh path.
#[derive(Debug, Clone)]
pub(crate) struct CommitSecret {
    secret: Secret,
}

impl CommitSecret {
    pub(crate) fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// An all-zero commit secret, used at group creation.
    pub(crate) fn zero(suite: CipherSuite) -> Self {
        Self {
            secret: Secret::zero(suite),
        }
    }
}

/// Connects one epoch to the next. Consumed exactly once per epoch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InitSecret {
    secret: Secret,
}

impl InitSecret {
    /// An all-zero init secret, the starting point of epoch 0.
    pub(crate) fn zero(suite: CipherSuite) -> Self {
        Self {
            secret: Secret::zero(suite),
        }
    }
}

/// The secret handed to new joiners in a Welcome.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JoinerSecret {
    secret: Secret,
}

impl JoinerSecret {
    /// Fold a commit secret into the previous epoch's init secret.
    pub(crate) fn new(init_secret: &InitSecret, commit_secret: &CommitSecret) -> Result<Self, Error> {
        let secret = init_secret.secret.hkdf_extract(&commit_secret.secret)?;
        log_crypto!(trace, "Joiner secret: {:x?}", secret.as_slice());
        Ok(JoinerSecret { secret })
    }

    pub(crate) fn from_secret(secret: Secret) -> Self {
        Self { secret }
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Key and nonce for the AEAD protecting a Welcome's GroupInfo.
    pub(crate) fn group_info_key_nonce(
        &self,
    ) -> Result<(crate::ciphersuite::AeadKey, crate::ciphersuite::AeadNonce), Error> {
        let suite = self.secret.suite();
        let group_info_secret =
            self.secret
                .kdf_expand_label("group info", &[], suite.hash_length())?;
        let key = group_info_secret.kdf_expand_label("key", &[], suite.aead_key_length())?;
        let nonce = group_info_secret.kdf_expand_label("nonce", &[], suite.aead_nonce_length())?;
        Ok((
            crate::ciphersuite::AeadKey::from_secret(&key),
            crate::ciphersuite::AeadNonce::from_secret(&nonce),
        ))
    }
}

/// Joiner secret with the (zero) PSK folded in; parent of the epoch
/// secret.
#[derive(Debug, Clone)]
pub(crate) struct MemberSecret {
    secret: Secret,
}

impl MemberSecret {
    /// The PSK input is fixed to the zero vector at this protocol
    /// version.
    pub(crate) fn new(joiner_secret: &JoinerSecret) -> Result<Self, Error> {
        let suite = joiner_secret.secret.suite();
        let secret = joiner_secret.secret.hkdf_extract(&Secret::zero(suite))?;
        Ok(MemberSecret { secret })
    }
}

/// The working secrets of one epoch. Some are derived only to keep the
/// schedule complete and are not consumed by the core itself.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub(crate) struct EpochSecrets {
    pub(crate) sender_data_secret: Secret,
    pub(crate) encryption_secret: Secret,
    pub(crate) exporter_secret: Secret,
    pub(crate) authentication_secret: Secret,
    pub(crate) external_secret: Secret,
    pub(crate) confirmation_key: Secret,
    pub(crate) membership_key: Secret,
    pub(crate) resumption_secret: Secret,
    pub(crate) init_secret: InitSecret,
}

impl EpochSecrets {
    /// Expand the member secret under the serialized group context and
    /// derive every working secret of the epoch.
    pub(crate) fn new(
        member_secret: &MemberSecret,
        serialized_group_context: &[u8],
    ) -> Result<Self, Error> {
        let suite = member_secret.secret.suite();
        let epoch_secret = member_secret.secret.kdf_expand_label(
            "epoch",
            serialized_group_context,
            suite.hash_length(),
        )?;
        log_crypto!(trace, "Epoch secret: {:x?}", epoch_secret.as_slice());

        Ok(Self {
            sender_data_secret: epoch_secret.derive_secret("sender data")?,
            encryption_secret: epoch_secret.derive_secret("encryption")?,
            exporter_secret: epoch_secret.derive_secret("exporter")?,
            authentication_secret: epoch_secret.derive_secret("authentication")?,
            external_secret: epoch_secret.derive_secret("external")?,
            confirmation_key: epoch_secret.derive_secret("confirm")?,
            membership_key: epoch_secret.derive_secret("membership")?,
            resumption_secret: epoch_secret.derive_secret("resumption")?,
            init_secret: InitSecret {
                secret: epoch_secret.derive_secret("init")?,
            },
        })
    }

    /// The confirmation MAC over a confirmed transcript hash.
    pub(crate) fn confirmation(&self, confirmed_transcript_hash: &[u8]) -> Result<Mac, Error> {
        Ok(Mac::new(&self.confirmation_key, confirmed_transcript_hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: CipherSuite = CipherSuite::P256_AES128GCM_SHA256_P256;

    #[test]
    fn schedule_is_deterministic() {
        let init = InitSecret::zero(SUITE);
        let commit = CommitSecret::new(Secret::from_slice(SUITE, &[1u8; 32]));
        let joiner_a = JoinerSecret::new(&init, &commit).unwrap();
        let joiner_b = JoinerSecret::new(&init, &commit).unwrap();
        assert_eq!(joiner_a, joiner_b);

        let secrets_a =
            EpochSecrets::new(&MemberSecret::new(&joiner_a).unwrap(), b"context").unwrap();
        let secrets_b =
            EpochSecrets::new(&MemberSecret::new(&joiner_b).unwrap(), b"context").unwrap();
        assert_eq!(
            secrets_a.authentication_secret,
            secrets_b.authentication_secret
        );
        assert_eq!(secrets_a.init_secret, secrets_b.init_secret);
    }

    #[test]
    fn schedule_separates_on_context_and_commit() {
        let init = InitSecret::zero(SUITE);
        let commit = CommitSecret::new(Secret::from_slice(SUITE, &[1u8; 32]));
        let joiner = JoinerSecret::new(&init, &commit).unwrap();
        let member = MemberSecret::new(&joiner).unwrap();

        let a = EpochSecrets::new(&member, b"context a").unwrap();
        let b = EpochSecrets::new(&member, b"context b").unwrap();
        assert_ne!(a.encryption_secret, b.encryption_secret);

        let other_commit = CommitSecret::new(Secret::from_slice(SUITE, &[2u8; 32]));
        let other_joiner = JoinerSecret::new(&init, &other_commit).unwrap();
        assert_ne!(joiner, other_joiner);
    }

    #[test]
    fn derived_secrets_are_pairwise_distinct() {
        let init = InitSecret::zero(SUITE);
        let commit = CommitSecret::new(Secret::from_slice(SUITE, &[7u8; 32]));
        let joiner = JoinerSecret::new(&init, &commit).unwrap();
        let secrets =
            EpochSecrets::new(&MemberSecret::new(&joiner).unwrap(), b"gc").unwrap();

        let all = [
            &secrets.sender_data_secret,
            &secrets.encryption_secret,
            &secrets.exporter_secret,
            &secrets.authentication_secret,
            &secrets.external_secret,
            &secrets.confirmation_key,
            &secrets.membership_key,
            &secrets.resumption_secret,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
