//! Group state: identifiers, the group context bound into every
//! signature, and the epoch state machine in [`state`].

use tls_codec::{TlsByteVecU8, TlsDeserialize, TlsSerialize, TlsSize, TlsVecU32};

mod state;

pub use state::State;

use crate::key_packages::Extension;

/// An opaque, application-chosen group identifier.
#[derive(Debug, PartialEq, Eq, Clone, Hash, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct GroupId {
    value: TlsByteVecU8,
}

impl GroupId {
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            value: bytes.into(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.value.as_slice()
    }
}

/// A group epoch number, incremented by every Commit.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Default, TlsSerialize,
    TlsDeserialize, TlsSize,
)]
pub struct GroupEpoch(pub u64);

impl GroupEpoch {
    pub(crate) fn increment(&mut self) {
        self.0 += 1;
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The group context of one epoch.
///
/// ```text
/// struct {
///     opaque group_id<0..255>;
///     uint64 epoch;
///     opaque tree_hash<0..255>;
///     opaque confirmed_transcript_hash<0..255>;
///     Extension extensions<0..2^32-1>;
/// } GroupContext;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct GroupContext {
    pub(crate) group_id: GroupId,
    pub(crate) epoch: GroupEpoch,
    pub(crate) tree_hash: TlsByteVecU8,
    pub(crate) confirmed_transcript_hash: TlsByteVecU8,
    pub(crate) extensions: TlsVecU32<Extension>,
}

impl GroupContext {
    pub(crate) fn new(
        group_id: GroupId,
        epoch: GroupEpoch,
        tree_hash: Vec<u8>,
        confirmed_transcript_hash: Vec<u8>,
        extensions: &[Extension],
    ) -> Self {
        Self {
            group_id,
            epoch,
            tree_hash: tree_hash.into(),
            confirmed_transcript_hash: confirmed_transcript_hash.into(),
            extensions: extensions.into(),
        }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn epoch(&self) -> GroupEpoch {
        self.epoch
    }
}
