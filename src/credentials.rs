//! Credentials bind an application-level identity to a signature public
//! key. Only the basic variant exists at this protocol version; the enum
//! is the wire-level dispatch point for future kinds.

use std::convert::TryFrom;
use std::io::{Read, Write};

use tls_codec::{
    Deserialize as TlsDeserializeTrait, Serialize as TlsSerializeTrait, Size, TlsByteVecU16,
    TlsDeserialize, TlsSerialize, TlsSize,
};

use crate::ciphersuite::errors::CryptoError;
use crate::ciphersuite::{Signature, SignaturePublicKey, SignatureScheme};

/// Credential variant tag.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u16)]
pub enum CredentialType {
    Basic = 1,
}

impl TryFrom<u16> for CredentialType {
    type Error = tls_codec::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CredentialType::Basic),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid credential type",
                value
            ))),
        }
    }
}

/// A bare identity bound to a signature key.
///
/// ```text
/// struct {
///     opaque identity<0..2^16-1>;
///     SignatureScheme scheme;
///     opaque signature_key<0..2^16-1>;
/// } BasicCredential;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct BasicCredential {
    identity: TlsByteVecU16,
    public_key: SignaturePublicKey,
}

impl BasicCredential {
    pub fn identity(&self) -> &[u8] {
        self.identity.as_slice()
    }
}

/// A member credential. Closed sum dispatched by [`CredentialType`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Credential {
    Basic(BasicCredential),
}

impl Credential {
    /// Create a basic credential from an identity and a signature public
    /// key.
    pub fn basic(identity: &[u8], public_key: SignaturePublicKey) -> Self {
        Credential::Basic(BasicCredential {
            identity: identity.into(),
            public_key,
        })
    }

    pub fn credential_type(&self) -> CredentialType {
        match self {
            Credential::Basic(_) => CredentialType::Basic,
        }
    }

    pub fn identity(&self) -> &[u8] {
        match self {
            Credential::Basic(basic) => basic.identity(),
        }
    }

    /// The signature public key this credential vouches for.
    pub fn public_key(&self) -> &SignaturePublicKey {
        match self {
            Credential::Basic(basic) => &basic.public_key,
        }
    }

    /// Verify `signature` over `payload` under this credential's key.
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        self.public_key().verify(signature, payload)
    }
}

impl Size for Credential {
    fn tls_serialized_len(&self) -> usize {
        self.credential_type().tls_serialized_len()
            + match self {
                Credential::Basic(basic) => basic.tls_serialized_len(),
            }
    }
}

impl TlsSerializeTrait for Credential {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = self.credential_type().tls_serialize(writer)?;
        written += match self {
            Credential::Basic(basic) => basic.tls_serialize(writer)?,
        };
        Ok(written)
    }
}

impl TlsDeserializeTrait for Credential {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        match CredentialType::tls_deserialize(bytes)? {
            CredentialType::Basic => Ok(Credential::Basic(BasicCredential::tls_deserialize(bytes)?)),
        }
    }
}

impl Size for &Credential {
    fn tls_serialized_len(&self) -> usize {
        Size::tls_serialized_len(*self)
    }
}

impl TlsSerializeTrait for &Credential {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        TlsSerializeTrait::tls_serialize(*self, writer)
    }
}

/// A credential together with the private half of its signature key.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    credential: Credential,
    keypair: crate::ciphersuite::SignatureKeypair,
}

impl CredentialBundle {
    /// Generate a fresh signature key pair and wrap it in a basic
    /// credential for `identity`.
    pub fn new(identity: &[u8], scheme: SignatureScheme) -> Result<Self, CryptoError> {
        let keypair = crate::ciphersuite::SignatureKeypair::new(scheme)?;
        let credential = Credential::basic(identity, keypair.public_key().clone());
        Ok(Self {
            credential,
            keypair,
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Split into the credential and the signing key.
    pub fn into_parts(self) -> (Credential, crate::ciphersuite::SignaturePrivateKey) {
        (self.credential, self.keypair.into_tuple().0)
    }
}
