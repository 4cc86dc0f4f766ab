//! Message framing.
//!
//! [`MlsPlaintext`] carries proposals, commits and application data,
//! signed under the sender's leaf credential and the current group
//! context. [`MlsCiphertext`] is the encrypted form used for application
//! data: the content is sealed under the sender's ratchet key and the
//! sender-data header under a key derived from the epoch's sender-data
//! secret.

use std::convert::TryFrom;

use tls_codec::{
    Serialize as TlsSerializeTrait, TlsByteVecU32, TlsByteVecU8, TlsDeserialize, TlsSerialize,
    TlsSize,
};

mod codec;

use crate::ciphersuite::{Signature, SignaturePrivateKey, SignaturePublicKey};
use crate::error::Error;
use crate::group::{GroupContext, GroupEpoch, GroupId};
use crate::messages::proposals::Proposal;
use crate::messages::Commit;
use crate::schedule::message_secrets::{MessageSecrets, SecretType};
use crate::tree::index::LeafIndex;
use crate::tree::sender_ratchet::SenderRatchetConfiguration;

/// Content type. Dispatches the plaintext content union on the wire.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u8)]
pub enum ContentType {
    Application = 1,
    Proposal = 2,
    Commit = 3,
}

impl TryFrom<u8> for ContentType {
    type Error = tls_codec::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ContentType::Application),
            2 => Ok(ContentType::Proposal),
            3 => Ok(ContentType::Commit),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid content type",
                value
            ))),
        }
    }
}

impl ContentType {
    pub(crate) fn is_handshake_message(&self) -> bool {
        self == &ContentType::Proposal || self == &ContentType::Commit
    }
}

impl From<&MlsPlaintextContent> for ContentType {
    fn from(content: &MlsPlaintextContent) -> Self {
        match content {
            MlsPlaintextContent::Application(_) => ContentType::Application,
            MlsPlaintextContent::Proposal(_) => ContentType::Proposal,
            MlsPlaintextContent::Commit(_) => ContentType::Commit,
        }
    }
}

impl From<ContentType> for SecretType {
    fn from(content_type: ContentType) -> SecretType {
        match content_type {
            ContentType::Application => SecretType::Application,
            ContentType::Proposal | ContentType::Commit => SecretType::Handshake,
        }
    }
}

/// A Commit plus the confirmation MAC over the new confirmed transcript
/// hash.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct CommitData {
    pub(crate) commit: Commit,
    pub(crate) confirmation: TlsByteVecU8,
}

/// Payload of an [`MlsPlaintext`]. Closed sum dispatched by
/// [`ContentType`].
#[allow(clippy::large_enum_variant)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum MlsPlaintextContent {
    Application(TlsByteVecU32),
    Proposal(Proposal),
    Commit(CommitData),
}

/// A framed, signed handshake or application message.
///
/// ```text
/// struct {
///     opaque group_id<0..255>;
///     uint64 epoch;
///     uint32 sender;
///     opaque authenticated_data<0..2^32-1>;
///     ContentType content_type;
///     select (MLSPlaintext.content_type) { ... };
///     opaque signature<0..2^16-1>;
/// } MLSPlaintext;
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MlsPlaintext {
    pub(crate) group_id: GroupId,
    pub(crate) epoch: GroupEpoch,
    pub(crate) sender: LeafIndex,
    pub(crate) authenticated_data: TlsByteVecU32,
    pub(crate) content: MlsPlaintextContent,
    pub(crate) signature: Signature,
}

impl MlsPlaintext {
    fn new(
        group_id: GroupId,
        epoch: GroupEpoch,
        sender: LeafIndex,
        authenticated_data: &[u8],
        content: MlsPlaintextContent,
        context: &GroupContext,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        let authenticated_data: TlsByteVecU32 = authenticated_data.into();
        let tbs = codec::serialize_plaintext_tbs(
            context,
            &group_id,
            epoch,
            sender,
            &authenticated_data,
            &content,
        )?;
        let signature = identity_priv.sign(&tbs)?;
        Ok(MlsPlaintext {
            group_id,
            epoch,
            sender,
            authenticated_data,
            content,
            signature,
        })
    }

    /// Frame and sign a proposal.
    pub(crate) fn new_proposal(
        group_id: GroupId,
        epoch: GroupEpoch,
        sender: LeafIndex,
        proposal: Proposal,
        context: &GroupContext,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        Self::new(
            group_id,
            epoch,
            sender,
            &[],
            MlsPlaintextContent::Proposal(proposal),
            context,
            identity_priv,
        )
    }

    /// Frame and sign a commit with its confirmation MAC.
    pub(crate) fn new_commit(
        group_id: GroupId,
        epoch: GroupEpoch,
        sender: LeafIndex,
        commit_data: CommitData,
        context: &GroupContext,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        Self::new(
            group_id,
            epoch,
            sender,
            &[],
            MlsPlaintextContent::Commit(commit_data),
            context,
            identity_priv,
        )
    }

    /// Frame and sign application data.
    pub(crate) fn new_application(
        group_id: GroupId,
        epoch: GroupEpoch,
        sender: LeafIndex,
        authenticated_data: &[u8],
        application_data: &[u8],
        context: &GroupContext,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        Self::new(
            group_id,
            epoch,
            sender,
            authenticated_data,
            MlsPlaintextContent::Application(application_data.into()),
            context,
            identity_priv,
        )
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn epoch(&self) -> GroupEpoch {
        self.epoch
    }

    pub fn sender(&self) -> LeafIndex {
        self.sender
    }

    pub fn content(&self) -> &MlsPlaintextContent {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::from(&self.content)
    }

    /// Returns `true` for proposals and commits.
    pub fn is_handshake_message(&self) -> bool {
        self.content_type().is_handshake_message()
    }

    fn to_be_signed(&self, context: &GroupContext) -> Result<Vec<u8>, Error> {
        codec::serialize_plaintext_tbs(
            context,
            &self.group_id,
            self.epoch,
            self.sender,
            &self.authenticated_data,
            &self.content,
        )
    }

    /// Verify the signature under the sender's signature public key and
    /// the verifier's own view of the group context.
    pub(crate) fn verify(
        &self,
        context: &GroupContext,
        public_key: &SignaturePublicKey,
    ) -> Result<(), Error> {
        let tbs = self.to_be_signed(context)?;
        public_key
            .verify(&self.signature, &tbs)
            .map_err(Error::from)
    }
}

/// An encrypted application (or, in principle, handshake) message.
///
/// ```text
/// struct {
///     opaque group_id<0..255>;
///     uint64 epoch;
///     ContentType content_type;
///     opaque authenticated_data<0..2^32-1>;
///     opaque encrypted_sender_data<0..255>;
///     opaque ciphertext<0..2^32-1>;
/// } MLSCiphertext;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct MlsCiphertext {
    pub(crate) group_id: GroupId,
    pub(crate) epoch: GroupEpoch,
    pub(crate) content_type: ContentType,
    pub(crate) authenticated_data: TlsByteVecU32,
    pub(crate) encrypted_sender_data: TlsByteVecU8,
    pub(crate) ciphertext: TlsByteVecU32,
}

/// The encrypted header naming the sender and its ratchet generation.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub(crate) struct MlsSenderData {
    pub(crate) sender: LeafIndex,
    pub(crate) generation: u32,
}

/// AAD binding the sender-data header to its message.
#[derive(TlsSerialize, TlsSize)]
struct MlsSenderDataAad<'a> {
    group_id: &'a GroupId,
    epoch: GroupEpoch,
    content_type: ContentType,
}

/// AAD binding the content ciphertext to its header.
#[derive(TlsSerialize, TlsSize)]
struct MlsCiphertextContentAad<'a> {
    group_id: &'a GroupId,
    epoch: GroupEpoch,
    content_type: ContentType,
    authenticated_data: &'a TlsByteVecU32,
}

impl MlsCiphertext {
    /// Encrypt a signed plaintext, hiding its length up to `padding_size`.
    pub(crate) fn try_from_plaintext(
        plaintext: &MlsPlaintext,
        message_secrets: &mut MessageSecrets,
        padding_size: usize,
    ) -> Result<Self, Error> {
        log::debug!("MlsCiphertext::try_from_plaintext");
        let content_type = plaintext.content_type();

        // Serialize the content AAD
        let content_aad = MlsCiphertextContentAad {
            group_id: &plaintext.group_id,
            epoch: plaintext.epoch,
            content_type,
            authenticated_data: &plaintext.authenticated_data,
        }
        .tls_serialize_detached()?;

        // Extract generation and key material for encryption
        let (generation, (ratchet_key, ratchet_nonce)) = message_secrets
            .secret_for_encryption(plaintext.sender, SecretType::from(content_type))?;

        // Encrypt the padded content
        let content =
            codec::encode_padded_content(plaintext, padding_size, message_secrets.mac_length())?;
        let ciphertext = ratchet_key.aead_seal(&content, &content_aad, &ratchet_nonce)?;

        // Encrypt the sender data under keys bound to the ciphertext
        let sender_data = MlsSenderData {
            sender: plaintext.sender,
            generation,
        };
        let (sender_data_key, sender_data_nonce) =
            message_secrets.sender_data_key_nonce(&ciphertext)?;
        let sender_data_aad = MlsSenderDataAad {
            group_id: &plaintext.group_id,
            epoch: plaintext.epoch,
            content_type,
        }
        .tls_serialize_detached()?;
        let encrypted_sender_data = sender_data_key.aead_seal(
            &sender_data.tls_serialize_detached()?,
            &sender_data_aad,
            &sender_data_nonce,
        )?;

        Ok(MlsCiphertext {
            group_id: plaintext.group_id.clone(),
            epoch: plaintext.epoch,
            content_type,
            authenticated_data: plaintext.authenticated_data.clone(),
            encrypted_sender_data: encrypted_sender_data.into(),
            ciphertext: ciphertext.into(),
        })
    }

    /// Decrypt the sender-data header.
    pub(crate) fn sender_data(
        &self,
        message_secrets: &MessageSecrets,
    ) -> Result<MlsSenderData, Error> {
        let (sender_data_key, sender_data_nonce) =
            message_secrets.sender_data_key_nonce(self.ciphertext.as_slice())?;
        let sender_data_aad = MlsSenderDataAad {
            group_id: &self.group_id,
            epoch: self.epoch,
            content_type: self.content_type,
        }
        .tls_serialize_detached()?;
        let sender_data_bytes = sender_data_key.aead_open(
            self.encrypted_sender_data.as_slice(),
            &sender_data_aad,
            &sender_data_nonce,
        )?;
        use tls_codec::Deserialize as TlsDeserializeTrait;
        MlsSenderData::tls_deserialize(&mut sender_data_bytes.as_slice()).map_err(Error::from)
    }

    /// Decrypt the content with the sender's ratchet at the referenced
    /// generation. Returns the inner (still unverified) plaintext.
    pub(crate) fn to_plaintext(
        &self,
        message_secrets: &mut MessageSecrets,
        configuration: &SenderRatchetConfiguration,
        sender_data: &MlsSenderData,
    ) -> Result<MlsPlaintext, Error> {
        let (ratchet_key, ratchet_nonce) = message_secrets.secret_for_decryption(
            sender_data.sender,
            SecretType::from(self.content_type),
            sender_data.generation,
            configuration,
        )?;

        let content_aad = MlsCiphertextContentAad {
            group_id: &self.group_id,
            epoch: self.epoch,
            content_type: self.content_type,
            authenticated_data: &self.authenticated_data,
        }
        .tls_serialize_detached()?;
        let content_bytes =
            ratchet_key.aead_open(self.ciphertext.as_slice(), &content_aad, &ratchet_nonce)?;

        let (content, signature) =
            codec::decode_padded_content(&content_bytes, self.content_type)?;
        Ok(MlsPlaintext {
            group_id: self.group_id.clone(),
            epoch: self.epoch,
            sender: sender_data.sender,
            authenticated_data: self.authenticated_data.clone(),
            content,
            signature,
        })
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn epoch(&self) -> GroupEpoch {
        self.epoch
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// The part of a commit plaintext bound into the confirmed transcript
/// hash.
#[derive(TlsSerialize, TlsSize)]
pub(crate) struct MlsPlaintextCommitContent<'a> {
    pub(crate) group_id: &'a GroupId,
    pub(crate) epoch: GroupEpoch,
    pub(crate) sender: LeafIndex,
    pub(crate) commit: &'a Commit,
}

impl MlsPlaintext {
    /// Serialized commit content for the confirmed transcript hash.
    pub(crate) fn commit_content(&self) -> Result<Vec<u8>, Error> {
        match &self.content {
            MlsPlaintextContent::Commit(commit_data) => Ok(MlsPlaintextCommitContent {
                group_id: &self.group_id,
                epoch: self.epoch,
                sender: self.sender,
                commit: &commit_data.commit,
            }
            .tls_serialize_detached()?),
            _ => Err(Error::InvalidParameter("message does not carry a commit")),
        }
    }

    /// Serialized confirmation and signature for the interim transcript
    /// hash.
    pub(crate) fn commit_auth_data(&self) -> Result<Vec<u8>, Error> {
        match &self.content {
            MlsPlaintextContent::Commit(commit_data) => {
                let mut out = Vec::new();
                commit_data.confirmation.tls_serialize(&mut out)?;
                self.signature.tls_serialize(&mut out)?;
                Ok(out)
            }
            _ => Err(Error::InvalidParameter("message does not carry a commit")),
        }
    }
}

