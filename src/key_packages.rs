//! Key packages are pre-published leaf descriptors: a ciphersuite, an HPKE
//! init key others can encrypt to, and the owner's credential, all signed
//! by the owner's identity key. Two key packages are equal exactly when
//! their serialized forms are equal.

use tls_codec::{
    Serialize as TlsSerializeTrait, TlsByteVecU32, TlsDeserialize, TlsSerialize, TlsSize,
    TlsVecU32,
};

use crate::ciphersuite::errors::CryptoError;
use crate::ciphersuite::{
    CipherSuite, HpkePublicKey, Secret, Signature, SignaturePrivateKey,
};
use crate::credentials::Credential;
use crate::error::Error;

/// An uninterpreted extension record.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct Extension {
    pub(crate) extension_type: u16,
    pub(crate) extension_data: TlsByteVecU32,
}

/// A signed leaf descriptor.
///
/// ```text
/// struct {
///     CipherSuite cipher_suite;
///     HPKEPublicKey init_key;
///     Credential credential;
///     Extension extensions<0..2^32-1>;
///     opaque signature<0..2^16-1>;
/// } KeyPackage;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct KeyPackage {
    pub(crate) cipher_suite: CipherSuite,
    pub(crate) init_key: HpkePublicKey,
    pub(crate) credential: Credential,
    pub(crate) extensions: TlsVecU32<Extension>,
    pub(crate) signature: Signature,
}

/// The signed portion of a [`KeyPackage`].
#[derive(TlsSerialize, TlsSize)]
struct KeyPackageTbs<'a> {
    cipher_suite: CipherSuite,
    init_key: &'a HpkePublicKey,
    credential: &'a Credential,
    extensions: &'a TlsVecU32<Extension>,
}

impl KeyPackage {
    /// Create and sign a key package for `init_key`.
    pub fn new(
        cipher_suite: CipherSuite,
        init_key: HpkePublicKey,
        credential: Credential,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        let extensions: TlsVecU32<Extension> = Vec::new().into();
        let payload = KeyPackageTbs {
            cipher_suite,
            init_key: &init_key,
            credential: &credential,
            extensions: &extensions,
        }
        .tls_serialize_detached()?;
        let signature = identity_priv.sign(&payload)?;
        Ok(KeyPackage {
            cipher_suite,
            init_key,
            credential,
            extensions,
            signature,
        })
    }

    fn unsigned_payload(&self) -> Result<Vec<u8>, tls_codec::Error> {
        KeyPackageTbs {
            cipher_suite: self.cipher_suite,
            init_key: &self.init_key,
            credential: &self.credential,
            extensions: &self.extensions,
        }
        .tls_serialize_detached()
    }

    fn sign(&mut self, identity_priv: &SignaturePrivateKey) -> Result<(), Error> {
        let payload = self.unsigned_payload()?;
        self.signature = identity_priv.sign(&payload)?;
        Ok(())
    }

    /// Verify the self-signature against the contained credential.
    pub fn verify(&self) -> Result<(), CryptoError> {
        let payload = self
            .unsigned_payload()
            .map_err(|_| CryptoError::CryptoLibraryError)?;
        self.credential.verify(&payload, &self.signature)
    }

    /// Digest of the serialized key package.
    pub fn hash(&self) -> Result<Vec<u8>, Error> {
        let serialized = self.tls_serialize_detached()?;
        Ok(self.cipher_suite.hash(&serialized))
    }

    /// Replace the init key and re-sign. Used when a leaf rotates its key
    /// material on update or commit.
    pub(crate) fn update_init_key(
        &mut self,
        init_key: HpkePublicKey,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<(), Error> {
        self.init_key = init_key;
        self.sign(identity_priv)
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    pub fn hpke_init_key(&self) -> &HpkePublicKey {
        &self.init_key
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// A [`KeyPackage`] together with the secret its init key was derived
/// from. What a member stores between publishing a key package and being
/// added to a group.
#[derive(Debug, Clone)]
pub struct KeyPackageBundle {
    pub(crate) key_package: KeyPackage,
    pub(crate) leaf_secret: Secret,
}

impl KeyPackageBundle {
    /// Derive the init key pair from `leaf_secret` and sign a key package
    /// over it.
    pub fn from_leaf_secret(
        cipher_suite: CipherSuite,
        leaf_secret: Secret,
        credential: Credential,
        identity_priv: &SignaturePrivateKey,
    ) -> Result<Self, Error> {
        let keypair = cipher_suite.derive_hpke_keypair(leaf_secret.as_slice())?;
        let key_package = KeyPackage::new(
            cipher_suite,
            keypair.public_key().clone(),
            credential,
            identity_priv,
        )?;
        Ok(Self {
            key_package,
            leaf_secret,
        })
    }

    pub fn key_package(&self) -> &KeyPackage {
        &self.key_package
    }

    /// The secret the init key was derived from; needed again when
    /// joining from a Welcome.
    pub fn leaf_secret(&self) -> &Secret {
        &self.leaf_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialBundle;
    use tls_codec::Deserialize as TlsDeserializeTrait;

    #[test]
    fn key_package_sign_verify_and_roundtrip() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM;
        let bundle = CredentialBundle::new(b"alice", suite.signature_scheme()).unwrap();
        let (credential, identity_priv) = bundle.into_parts();
        let leaf_secret = Secret::from_slice(suite, &[1u8; 32]);
        let kp = KeyPackageBundle::from_leaf_secret(suite, leaf_secret, credential, &identity_priv)
            .unwrap()
            .key_package()
            .clone();
        kp.verify().unwrap();

        let encoded = kp.tls_serialize_detached().unwrap();
        let decoded = KeyPackage::tls_deserialize(&mut encoded.as_slice()).unwrap();
        assert_eq!(kp, decoded);
        assert_eq!(kp.hash().unwrap(), decoded.hash().unwrap());
        decoded.verify().unwrap();
    }

    #[test]
    fn tampered_key_package_fails_verification() {
        let suite = CipherSuite::P256_AES128GCM_SHA256_P256;
        let bundle = CredentialBundle::new(b"bob", suite.signature_scheme()).unwrap();
        let (credential, identity_priv) = bundle.into_parts();
        let leaf_secret = Secret::from_slice(suite, &[2u8; 32]);
        let mut kp =
            KeyPackageBundle::from_leaf_secret(suite, leaf_secret, credential, &identity_priv)
                .unwrap()
                .key_package()
                .clone();
        let other = suite
            .derive_hpke_keypair(&[3u8; 32])
            .unwrap()
            .public_key()
            .clone();
        kp.init_key = other;
        assert!(kp.verify().is_err());
    }
}
