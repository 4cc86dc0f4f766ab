//! Hand-written codecs for the framing unions.
//!
//! The content union is tagged by [`ContentType`] on the wire, except
//! inside an encrypted payload where the tag rides in the ciphertext
//! header instead.

use std::io::{Read, Write};

use tls_codec::{
    Deserialize as TlsDeserializeTrait, Serialize as TlsSerializeTrait, Size, TlsByteVecU16,
    TlsByteVecU32,
};

use super::{CommitData, ContentType, MlsPlaintext, MlsPlaintextContent};
use crate::ciphersuite::Signature;
use crate::error::Error;
use crate::group::{GroupContext, GroupEpoch, GroupId};
use crate::messages::proposals::Proposal;
use crate::tree::index::LeafIndex;

impl MlsPlaintextContent {
    /// Serialize the variant body without the leading type tag.
    fn serialize_without_type<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        match self {
            MlsPlaintextContent::Application(data) => data.tls_serialize(writer),
            MlsPlaintextContent::Proposal(proposal) => proposal.tls_serialize(writer),
            MlsPlaintextContent::Commit(commit_data) => commit_data.tls_serialize(writer),
        }
    }

    fn serialized_len_without_type(&self) -> usize {
        match self {
            MlsPlaintextContent::Application(data) => data.tls_serialized_len(),
            MlsPlaintextContent::Proposal(proposal) => proposal.tls_serialized_len(),
            MlsPlaintextContent::Commit(commit_data) => commit_data.tls_serialized_len(),
        }
    }

    fn deserialize_without_type<R: Read>(
        bytes: &mut R,
        content_type: ContentType,
    ) -> Result<Self, tls_codec::Error> {
        Ok(match content_type {
            ContentType::Application => {
                MlsPlaintextContent::Application(TlsByteVecU32::tls_deserialize(bytes)?)
            }
            ContentType::Proposal => {
                MlsPlaintextContent::Proposal(Proposal::tls_deserialize(bytes)?)
            }
            ContentType::Commit => {
                MlsPlaintextContent::Commit(CommitData::tls_deserialize(bytes)?)
            }
        })
    }
}

impl Size for MlsPlaintext {
    fn tls_serialized_len(&self) -> usize {
        self.group_id.tls_serialized_len()
            + self.epoch.tls_serialized_len()
            + self.sender.tls_serialized_len()
            + self.authenticated_data.tls_serialized_len()
            + self.content_type().tls_serialized_len()
            + self.content.serialized_len_without_type()
            + self.signature.tls_serialized_len()
    }
}

impl TlsSerializeTrait for MlsPlaintext {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = self.group_id.tls_serialize(writer)?;
        written += self.epoch.tls_serialize(writer)?;
        written += self.sender.tls_serialize(writer)?;
        written += self.authenticated_data.tls_serialize(writer)?;
        written += self.content_type().tls_serialize(writer)?;
        written += self.content.serialize_without_type(writer)?;
        written += self.signature.tls_serialize(writer)?;
        Ok(written)
    }
}

impl TlsDeserializeTrait for MlsPlaintext {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        let group_id = GroupId::tls_deserialize(bytes)?;
        let epoch = GroupEpoch::tls_deserialize(bytes)?;
        let sender = LeafIndex::tls_deserialize(bytes)?;
        let authenticated_data = TlsByteVecU32::tls_deserialize(bytes)?;
        let content_type = ContentType::tls_deserialize(bytes)?;
        let content = MlsPlaintextContent::deserialize_without_type(bytes, content_type)?;
        let signature = Signature::tls_deserialize(bytes)?;
        Ok(MlsPlaintext {
            group_id,
            epoch,
            sender,
            authenticated_data,
            content,
            signature,
        })
    }
}

/// Everything a plaintext signature covers: the group context followed by
/// the message header and tagged content.
pub(super) fn serialize_plaintext_tbs(
    context: &GroupContext,
    group_id: &GroupId,
    epoch: GroupEpoch,
    sender: LeafIndex,
    authenticated_data: &TlsByteVecU32,
    content: &MlsPlaintextContent,
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    context.tls_serialize(&mut out)?;
    group_id.tls_serialize(&mut out)?;
    epoch.tls_serialize(&mut out)?;
    sender.tls_serialize(&mut out)?;
    authenticated_data.tls_serialize(&mut out)?;
    ContentType::from(content).tls_serialize(&mut out)?;
    content.serialize_without_type(&mut out)?;
    Ok(out)
}

/// The encrypted payload of an [`MlsCiphertext`](super::MlsCiphertext):
/// the untagged content body, the signature, and all-zero padding.
///
/// ```text
/// struct {
///     select (MLSCiphertext.content_type) { ... };
///     opaque signature<0..2^16-1>;
///     opaque padding<0..2^16-1>;
/// } MLSCiphertextContent;
/// ```
pub(super) fn encode_padded_content(
    plaintext: &MlsPlaintext,
    padding_size: usize,
    mac_len: usize,
) -> Result<Vec<u8>, Error> {
    let content_length = plaintext.content.serialized_len_without_type()
        + plaintext.signature.tls_serialized_len();

    // Pad the ciphertext (content plus AEAD tag) up to the next multiple
    // of the caller's block size.
    let padding_length = if padding_size > 0 {
        let padding_offset = content_length + mac_len;
        (padding_size - (padding_offset % padding_size)) % padding_size
    } else {
        0
    };

    let mut out = Vec::with_capacity(content_length + padding_length + 2);
    plaintext.content.serialize_without_type(&mut out)?;
    plaintext.signature.tls_serialize(&mut out)?;
    let padding: TlsByteVecU16 = vec![0u8; padding_length].into();
    padding.tls_serialize(&mut out)?;
    Ok(out)
}

pub(super) fn decode_padded_content(
    bytes: &[u8],
    content_type: ContentType,
) -> Result<(MlsPlaintextContent, Signature), Error> {
    let mut reader = bytes;
    let content = MlsPlaintextContent::deserialize_without_type(&mut reader, content_type)?;
    let signature = Signature::tls_deserialize(&mut reader)?;
    let _padding = TlsByteVecU16::tls_deserialize(&mut reader)?;
    Ok((content, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::proposals::{Proposal, RemoveProposal};

    #[test]
    fn plaintext_roundtrip() {
        let plaintext = MlsPlaintext {
            group_id: GroupId::from_slice(&[0, 1, 2, 3]),
            epoch: GroupEpoch(7),
            sender: LeafIndex::from(2u32),
            authenticated_data: (&b"aad"[..]).into(),
            content: MlsPlaintextContent::Proposal(Proposal::Remove(RemoveProposal {
                removed: LeafIndex::from(1u32),
            })),
            signature: Signature::tls_deserialize(&mut &[0u8, 4, 1, 2, 3, 4][..]).unwrap(),
        };
        let encoded = plaintext.tls_serialize_detached().unwrap();
        assert_eq!(encoded.len(), plaintext.tls_serialized_len());
        let decoded = MlsPlaintext::tls_deserialize(&mut encoded.as_slice()).unwrap();
        assert_eq!(plaintext, decoded);
    }

    #[test]
    fn padded_content_roundtrip() {
        let plaintext = MlsPlaintext {
            group_id: GroupId::from_slice(&[9]),
            epoch: GroupEpoch(1),
            sender: LeafIndex::from(0u32),
            authenticated_data: (&[][..]).into(),
            content: MlsPlaintextContent::Application((&b"hello"[..]).into()),
            signature: Signature::tls_deserialize(&mut &[0u8, 2, 0xaa, 0xbb][..]).unwrap(),
        };
        for padding_size in [0usize, 16, 64] {
            let encoded = encode_padded_content(&plaintext, padding_size, 16).unwrap();
            let (content, signature) =
                decode_padded_content(&encoded, ContentType::Application).unwrap();
            assert_eq!(content, plaintext.content);
            assert_eq!(signature, plaintext.signature);
        }
    }
}
