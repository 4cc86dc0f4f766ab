//! Proposals: the membership changes a Commit can apply.

use std::convert::TryFrom;
use std::io::{Read, Write};

use tls_codec::{
    Deserialize as TlsDeserializeTrait, Serialize as TlsSerializeTrait, Size, TlsByteVecU8,
    TlsDeserialize, TlsSerialize, TlsSize,
};

use crate::ciphersuite::CipherSuite;
use crate::error::Error;
use crate::framing::MlsPlaintext;
use crate::key_packages::KeyPackage;
use crate::tree::index::LeafIndex;

/// Proposal variant tag.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u8)]
pub enum ProposalType {
    Add = 1,
    Update = 2,
    Remove = 3,
}

impl TryFrom<u8> for ProposalType {
    type Error = tls_codec::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProposalType::Add),
            2 => Ok(ProposalType::Update),
            3 => Ok(ProposalType::Remove),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid proposal type",
                value
            ))),
        }
    }
}

/// Propose adding a new member holding `key_package`.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct AddProposal {
    pub(crate) key_package: KeyPackage,
}

/// Propose rotating the sender's own leaf to a fresh `key_package`.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct UpdateProposal {
    pub(crate) key_package: KeyPackage,
}

/// Propose evicting the member at leaf `removed`.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct RemoveProposal {
    pub(crate) removed: LeafIndex,
}

/// A membership change. Closed sum dispatched by [`ProposalType`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Proposal {
    Add(AddProposal),
    Update(UpdateProposal),
    Remove(RemoveProposal),
}

impl Proposal {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Proposal::Add(_) => ProposalType::Add,
            Proposal::Update(_) => ProposalType::Update,
            Proposal::Remove(_) => ProposalType::Remove,
        }
    }
}

impl Size for Proposal {
    fn tls_serialized_len(&self) -> usize {
        self.proposal_type().tls_serialized_len()
            + match self {
                Proposal::Add(p) => p.tls_serialized_len(),
                Proposal::Update(p) => p.tls_serialized_len(),
                Proposal::Remove(p) => p.tls_serialized_len(),
            }
    }
}

impl TlsSerializeTrait for Proposal {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = self.proposal_type().tls_serialize(writer)?;
        written += match self {
            Proposal::Add(p) => p.tls_serialize(writer)?,
            Proposal::Update(p) => p.tls_serialize(writer)?,
            Proposal::Remove(p) => p.tls_serialize(writer)?,
        };
        Ok(written)
    }
}

impl TlsDeserializeTrait for Proposal {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        match ProposalType::tls_deserialize(bytes)? {
            ProposalType::Add => Ok(Proposal::Add(AddProposal::tls_deserialize(bytes)?)),
            ProposalType::Update => Ok(Proposal::Update(UpdateProposal::tls_deserialize(bytes)?)),
            ProposalType::Remove => Ok(Proposal::Remove(RemoveProposal::tls_deserialize(bytes)?)),
        }
    }
}

/// A reference to a proposal a Commit applies: the digest of the
/// MLSPlaintext that carried it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct ProposalReference {
    pub(crate) value: TlsByteVecU8,
}

impl ProposalReference {
    pub(crate) fn from_plaintext(
        suite: CipherSuite,
        plaintext: &MlsPlaintext,
    ) -> Result<Self, Error> {
        let encoded = plaintext.tls_serialize_detached()?;
        Ok(Self {
            value: suite.hash(&encoded).into(),
        })
    }
}
