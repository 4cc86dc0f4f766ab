//! Handshake payloads: Commit, GroupInfo and the Welcome that bootstraps
//! new members.

use std::convert::TryFrom;

use tls_codec::{
    Serialize as TlsSerializeTrait, TlsByteVecU32, TlsByteVecU8, TlsDeserialize, TlsSerialize,
    TlsSize, TlsVecU16, TlsVecU32,
};

pub(crate) mod proposals;

pub use proposals::{
    AddProposal, Proposal, ProposalReference, ProposalType, RemoveProposal, UpdateProposal,
};

use crate::ciphersuite::{CipherSuite, HpkeCiphertext, HpkePrivateKey, Secret, Signature, SignaturePrivateKey};
use crate::error::Error;
use crate::group::{GroupEpoch, GroupId};
use crate::key_packages::KeyPackage;
use crate::schedule::JoinerSecret;
use crate::tree::index::LeafIndex;
use crate::tree::{DirectPath, TreeKEMPublicKey};

/// The protocol version constant.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u8)]
pub enum ProtocolVersion {
    Mls10 = 1,
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = tls_codec::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolVersion::Mls10),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid protocol version",
                value
            ))),
        }
    }
}

/// A Commit: the proposal references to apply, in category order, and the
/// committer's fresh [`DirectPath`].
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct Commit {
    pub(crate) updates: TlsVecU16<ProposalReference>,
    pub(crate) removes: TlsVecU16<ProposalReference>,
    pub(crate) adds: TlsVecU16<ProposalReference>,
    pub(crate) path: DirectPath,
}

/// GroupInfo: the public group state a Welcome carries, signed by the
/// committer's leaf credential.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct GroupInfo {
    pub(crate) group_id: GroupId,
    pub(crate) epoch: GroupEpoch,
    pub(crate) tree: TreeKEMPublicKey,
    pub(crate) confirmed_transcript_hash: TlsByteVecU8,
    pub(crate) interim_transcript_hash: TlsByteVecU8,
    pub(crate) confirmation: TlsByteVecU8,
    pub(crate) signer_index: LeafIndex,
    pub(crate) signature: Signature,
}

/// The signed portion of a [`GroupInfo`].
#[derive(TlsSerialize, TlsSize)]
struct GroupInfoTbs<'a> {
    group_id: &'a GroupId,
    epoch: GroupEpoch,
    tree: &'a TreeKEMPublicKey,
    confirmed_transcript_hash: &'a TlsByteVecU8,
    interim_transcript_hash: &'a TlsByteVecU8,
    confirmation: &'a TlsByteVecU8,
    signer_index: LeafIndex,
}

impl GroupInfo {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        group_id: GroupId,
        epoch: GroupEpoch,
        tree: TreeKEMPublicKey,
        confirmed_transcript_hash: Vec<u8>,
        interim_transcript_hash: Vec<u8>,
        confirmation: Vec<u8>,
        signer_index: LeafIndex,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        // The signer must hold the leaf it claims.
        if tree.key_package(signer_index).is_none() {
            return Err(Error::InvalidParameter("cannot sign from a blank leaf"));
        }

        let confirmed_transcript_hash: TlsByteVecU8 = confirmed_transcript_hash.into();
        let interim_transcript_hash: TlsByteVecU8 = interim_transcript_hash.into();
        let confirmation: TlsByteVecU8 = confirmation.into();
        let payload = GroupInfoTbs {
            group_id: &group_id,
            epoch,
            tree: &tree,
            confirmed_transcript_hash: &confirmed_transcript_hash,
            interim_transcript_hash: &interim_transcript_hash,
            confirmation: &confirmation,
            signer_index,
        }
        .tls_serialize_detached()?;
        let signature = identity_priv.sign(&payload)?;

        Ok(GroupInfo {
            group_id,
            epoch,
            tree,
            confirmed_transcript_hash,
            interim_transcript_hash,
            confirmation,
            signer_index,
            signature,
        })
    }

    fn to_be_signed(&self) -> Result<Vec<u8>, tls_codec::Error> {
        GroupInfoTbs {
            group_id: &self.group_id,
            epoch: self.epoch,
            tree: &self.tree,
            confirmed_transcript_hash: &self.confirmed_transcript_hash,
            interim_transcript_hash: &self.interim_transcript_hash,
            confirmation: &self.confirmation,
            signer_index: self.signer_index,
        }
        .tls_serialize_detached()
    }

    /// Verify the signature under the signer leaf's credential.
    pub(crate) fn verify(&self) -> Result<(), Error> {
        let key_package = self
            .tree
            .key_package(self.signer_index)
            .ok_or(Error::Protocol("group info signed from a blank leaf"))?;
        key_package
            .credential()
            .verify(&self.to_be_signed()?, &self.signature)
            .map_err(Error::from)
    }
}

/// A path secret delivered inside a Welcome.
///
/// ```text
/// struct {
///     opaque path_secret<1..255>;
/// } PathSecret;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub(crate) struct PathSecret {
    pub(crate) path_secret: TlsByteVecU8,
}

/// The secrets a joiner needs to enter the group.
#[derive(Debug, TlsSerialize, TlsDeserialize, TlsSize)]
pub(crate) struct GroupSecrets {
    pub(crate) joiner_secret: TlsByteVecU8,
    pub(crate) path_secret: Option<PathSecret>,
}

/// Group secrets encrypted to one new member's init key, correlated by
/// the hash of their key package.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct EncryptedGroupSecrets {
    pub(crate) key_package_hash: TlsByteVecU8,
    pub(crate) encrypted_group_secrets: HpkeCiphertext,
}

/// The bootstrap message for new members: per-addee encrypted
/// [`GroupSecrets`] plus the [`GroupInfo`] sealed under a key derived
/// from the joiner secret.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct Welcome {
    pub(crate) version: ProtocolVersion,
    pub(crate) cipher_suite: CipherSuite,
    pub(crate) secrets: TlsVecU32<EncryptedGroupSecrets>,
    pub(crate) encrypted_group_info: TlsByteVecU32,
}

impl Welcome {
    /// Build a Welcome for `recipients`, each given the joiner secret and
    /// optionally the path secret it shares with the committer.
    pub(crate) fn new(
        suite: CipherSuite,
        joiner_secret: &JoinerSecret,
        group_info: &GroupInfo,
        recipients: &[(KeyPackage, Option<Secret>)],
    ) -> Result<Self, Error> {
        let (key, nonce) = joiner_secret.group_info_key_nonce()?;
        let group_info_data = group_info.tls_serialize_detached()?;
        let encrypted_group_info = key.aead_seal(&group_info_data, &[], &nonce)?;

        let mut secrets = Vec::with_capacity(recipients.len());
        for (key_package, path_secret) in recipients {
            let group_secrets = GroupSecrets {
                joiner_secret: joiner_secret.secret().as_slice().into(),
                path_secret: path_secret.as_ref().map(|secret| PathSecret {
                    path_secret: secret.as_slice().into(),
                }),
            };
            let group_secrets_data = group_secrets.tls_serialize_detached()?;
            let encrypted_group_secrets = suite.hpke_seal(
                key_package.hpke_init_key(),
                &[],
                &[],
                &group_secrets_data,
            )?;
            secrets.push(EncryptedGroupSecrets {
                key_package_hash: key_package.hash()?.into(),
                encrypted_group_secrets,
            });
        }

        Ok(Welcome {
            version: ProtocolVersion::Mls10,
            cipher_suite: suite,
            secrets: secrets.into(),
            encrypted_group_info: encrypted_group_info.into(),
        })
    }

    /// Locate the encrypted secrets addressed to `key_package`.
    pub(crate) fn find(&self, key_package: &KeyPackage) -> Result<&EncryptedGroupSecrets, Error> {
        let hash = key_package.hash()?;
        self.secrets
            .iter()
            .find(|egs| egs.key_package_hash.as_slice() == hash.as_slice())
            .ok_or(Error::InvalidParameter(
                "welcome does not address this key package",
            ))
    }

    /// Decrypt the [`GroupSecrets`] addressed to us.
    pub(crate) fn decrypt_group_secrets(
        &self,
        encrypted: &EncryptedGroupSecrets,
        init_priv: &HpkePrivateKey,
    ) -> Result<GroupSecrets, Error> {
        let plaintext = self.cipher_suite.hpke_open(
            &encrypted.encrypted_group_secrets,
            init_priv,
            &[],
            &[],
        )?;
        use tls_codec::Deserialize as TlsDeserializeTrait;
        GroupSecrets::tls_deserialize(&mut plaintext.as_slice()).map_err(Error::from)
    }

    /// Decrypt and parse the [`GroupInfo`] with keys from the joiner
    /// secret.
    pub(crate) fn decrypt_group_info(
        &self,
        joiner_secret: &JoinerSecret,
    ) -> Result<GroupInfo, Error> {
        let (key, nonce) = joiner_secret.group_info_key_nonce()?;
        let group_info_data = key.aead_open(self.encrypted_group_info.as_slice(), &[], &nonce)?;
        use tls_codec::Deserialize as TlsDeserializeTrait;
        GroupInfo::tls_deserialize(&mut group_info_data.as_slice()).map_err(Error::from)
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }
}
