//! Tree hash inputs.
//!
//! ```text
//! struct {
//!     uint32 node_index;
//!     optional<KeyPackage> key_package;
//! } LeafNodeHashInput;
//!
//! struct {
//!     uint32 node_index;
//!     optional<ParentNode> parent_node;
//!     opaque left_hash<0..255>;
//!     opaque right_hash<0..255>;
//! } ParentNodeHashInput;
//! ```

use tls_codec::{Serialize as TlsSerializeTrait, TlsByteVecU8, TlsSerialize, TlsSize};

use super::node::ParentNode;
use crate::ciphersuite::CipherSuite;
use crate::key_packages::KeyPackage;

#[derive(TlsSerialize, TlsSize)]
pub(crate) struct LeafNodeHashInput<'a> {
    pub(crate) node_index: u32,
    pub(crate) key_package: &'a Option<KeyPackage>,
}

impl<'a> LeafNodeHashInput<'a> {
    pub(crate) fn hash(&self, suite: CipherSuite) -> Result<Vec<u8>, tls_codec::Error> {
        let payload = self.tls_serialize_detached()?;
        Ok(suite.hash(&payload))
    }
}

#[derive(TlsSerialize, TlsSize)]
pub(crate) struct ParentNodeHashInput<'a> {
    pub(crate) node_index: u32,
    pub(crate) parent_node: &'a Option<ParentNode>,
    pub(crate) left_hash: TlsByteVecU8,
    pub(crate) right_hash: TlsByteVecU8,
}

impl<'a> ParentNodeHashInput<'a> {
    pub(crate) fn hash(&self, suite: CipherSuite) -> Result<Vec<u8>, tls_codec::Error> {
        let payload = self.tls_serialize_detached()?;
        Ok(suite.hash(&payload))
    }
}
