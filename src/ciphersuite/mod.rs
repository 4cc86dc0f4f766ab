//! Ciphersuites and the primitive operations they index.
//!
//! Every cryptographic operation in the library goes through a
//! [`CipherSuite`] value; the backend functions themselves live in
//! `crypto.rs`.

use std::convert::TryFrom;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tls_codec::{
    Serialize as TlsSerializeTrait, Size, TlsByteVecU16, TlsByteVecU32, TlsByteVecU8,
    TlsDeserialize, TlsSerialize, TlsSize,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

mod crypto;
pub mod errors;

use crypto as backend;
use errors::CryptoError;

pub(crate) const NONCE_BYTES: usize = 12;

/// The ciphersuites understood on the wire. The X448 and P521 suites are
/// enumerated for interoperability but the backend rejects operations on
/// them.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u16)]
pub enum CipherSuite {
    X25519_SHA256_AES128GCM = 0x0001,
    P256_AES128GCM_SHA256_P256 = 0x0002,
    X25519_SHA256_CHACHA20POLY1305 = 0x0003,
    X448_SHA512_AES256GCM = 0x0004,
    P521_AES256GCM_SHA512_P521 = 0x0005,
    X448_SHA512_CHACHA20POLY1305 = 0x0006,
}

impl TryFrom<u16> for CipherSuite {
    type Error = tls_codec::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(CipherSuite::X25519_SHA256_AES128GCM),
            0x0002 => Ok(CipherSuite::P256_AES128GCM_SHA256_P256),
            0x0003 => Ok(CipherSuite::X25519_SHA256_CHACHA20POLY1305),
            0x0004 => Ok(CipherSuite::X448_SHA512_AES256GCM),
            0x0005 => Ok(CipherSuite::P521_AES256GCM_SHA512_P521),
            0x0006 => Ok(CipherSuite::X448_SHA512_CHACHA20POLY1305),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid cipher suite value",
                value
            ))),
        }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Signature schemes, by IANA TLS value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u16)]
pub enum SignatureScheme {
    EcdsaSecp256r1Sha256 = 0x0403,
    EcdsaSecp521r1Sha512 = 0x0603,
    Ed25519 = 0x0807,
    Ed448 = 0x0808,
}

impl TryFrom<u16> for SignatureScheme {
    type Error = tls_codec::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0403 => Ok(SignatureScheme::EcdsaSecp256r1Sha256),
            0x0603 => Ok(SignatureScheme::EcdsaSecp521r1Sha512),
            0x0807 => Ok(SignatureScheme::Ed25519),
            0x0808 => Ok(SignatureScheme::Ed448),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid signature scheme",
                value
            ))),
        }
    }
}

impl From<CipherSuite> for SignatureScheme {
    fn from(suite: CipherSuite) -> Self {
        match suite {
            CipherSuite::X25519_SHA256_AES128GCM
            | CipherSuite::X25519_SHA256_CHACHA20POLY1305 => SignatureScheme::Ed25519,
            CipherSuite::P256_AES128GCM_SHA256_P256 => SignatureScheme::EcdsaSecp256r1Sha256,
            CipherSuite::X448_SHA512_AES256GCM | CipherSuite::X448_SHA512_CHACHA20POLY1305 => {
                SignatureScheme::Ed448
            }
            CipherSuite::P521_AES256GCM_SHA512_P521 => SignatureScheme::EcdsaSecp521r1Sha512,
        }
    }
}

/// AEAD algorithms in use by the suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AeadType {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl AeadType {
    pub(crate) const fn key_size(&self) -> usize {
        match self {
            AeadType::Aes128Gcm => 16,
            AeadType::Aes256Gcm => 32,
            AeadType::ChaCha20Poly1305 => 32,
        }
    }

    pub(crate) const fn tag_size(&self) -> usize {
        16
    }
}

/// Hash algorithms in use by the suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashType {
    Sha2_256,
    Sha2_512,
}

impl HashType {
    pub(crate) const fn size(&self) -> usize {
        match self {
            HashType::Sha2_256 => 32,
            HashType::Sha2_512 => 64,
        }
    }
}

impl CipherSuite {
    /// Returns an error if the backend cannot run this suite.
    pub fn supported(&self) -> Result<(), CryptoError> {
        backend::hpke_from_suite(*self).map(|_| ())?;
        backend::supports(self.signature_scheme())
    }

    /// The signature scheme fixed by this suite.
    pub fn signature_scheme(&self) -> SignatureScheme {
        SignatureScheme::from(*self)
    }

    pub(crate) fn hash_type(&self) -> HashType {
        match self {
            CipherSuite::X25519_SHA256_AES128GCM
            | CipherSuite::P256_AES128GCM_SHA256_P256
            | CipherSuite::X25519_SHA256_CHACHA20POLY1305 => HashType::Sha2_256,
            CipherSuite::X448_SHA512_AES256GCM
            | CipherSuite::P521_AES256GCM_SHA512_P521
            | CipherSuite::X448_SHA512_CHACHA20POLY1305 => HashType::Sha2_512,
        }
    }

    pub(crate) fn aead_type(&self) -> AeadType {
        match self {
            CipherSuite::X25519_SHA256_AES128GCM | CipherSuite::P256_AES128GCM_SHA256_P256 => {
                AeadType::Aes128Gcm
            }
            CipherSuite::X25519_SHA256_CHACHA20POLY1305
            | CipherSuite::X448_SHA512_CHACHA20POLY1305 => AeadType::ChaCha20Poly1305,
            CipherSuite::X448_SHA512_AES256GCM | CipherSuite::P521_AES256GCM_SHA512_P521 => {
                AeadType::Aes256Gcm
            }
        }
    }

    /// `Nh`: output size of the suite's digest.
    pub fn hash_length(&self) -> usize {
        self.hash_type().size()
    }

    /// `Nk`: key size of the suite's AEAD.
    pub fn aead_key_length(&self) -> usize {
        self.aead_type().key_size()
    }

    /// `Nn`: nonce size of the suite's AEAD.
    pub const fn aead_nonce_length(&self) -> usize {
        NONCE_BYTES
    }

    pub(crate) fn mac_length(&self) -> usize {
        self.aead_type().tag_size()
    }

    /// Hash `payload` with the suite's digest.
    pub(crate) fn hash(&self, payload: &[u8]) -> Vec<u8> {
        backend::hash(self.hash_type(), payload)
    }

    /// HPKE single-shot encryption of `ptxt` to `pk_r`, using `info` and
    /// `aad`.
    pub(crate) fn hpke_seal(
        &self,
        pk_r: &HpkePublicKey,
        info: &[u8],
        aad: &[u8],
        ptxt: &[u8],
    ) -> Result<HpkeCiphertext, CryptoError> {
        let mut hpke = backend::hpke_from_suite(*self)?;
        let (kem_output, ciphertext) = hpke
            .seal(&pk_r.as_slice().into(), info, aad, ptxt, None, None, None)
            .map_err(|_| CryptoError::CryptoLibraryError)?;
        Ok(HpkeCiphertext {
            kem_output: kem_output.into(),
            ciphertext: ciphertext.into(),
        })
    }

    /// HPKE single-shot decryption of `input` with `sk_r`, using `info` and
    /// `aad`.
    pub(crate) fn hpke_open(
        &self,
        input: &HpkeCiphertext,
        sk_r: &HpkePrivateKey,
        info: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut hpke = backend::hpke_from_suite(*self)?;
        hpke.open(
            input.kem_output.as_slice(),
            &sk_r.as_slice().into(),
            info,
            aad,
            input.ciphertext.as_slice(),
            None,
            None,
            None,
        )
        .map_err(|_| CryptoError::HpkeDecryptionError)
    }

    /// Derive an HPKE key pair deterministically from `ikm`.
    pub(crate) fn derive_hpke_keypair(&self, ikm: &[u8]) -> Result<HpkeKeypair, CryptoError> {
        let mut hpke = backend::hpke_from_suite(*self)?;
        let (private, public) = hpke
            .derive_key_pair(ikm)
            .map_err(|_| CryptoError::CryptoLibraryError)?
            .into_keys();
        Ok(HpkeKeypair {
            private_key: HpkePrivateKey::from(private.as_slice().to_vec()),
            public_key: HpkePublicKey::from(public.as_slice().to_vec()),
        })
    }
}

/// 7.7. Update Paths
///
/// ```text
/// struct {
///     opaque kem_output<0..2^16-1>;
///     opaque ciphertext<0..2^16-1>;
/// } HPKECiphertext;
/// ```
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct HpkeCiphertext {
    pub(crate) kem_output: TlsByteVecU16,
    pub(crate) ciphertext: TlsByteVecU16,
}

/// An HPKE public key as raw KEM output bytes.
#[derive(Debug, PartialEq, Eq, Clone, Hash, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct HpkePublicKey {
    value: TlsByteVecU16,
}

impl HpkePublicKey {
    pub fn as_slice(&self) -> &[u8] {
        self.value.as_slice()
    }
}

impl From<Vec<u8>> for HpkePublicKey {
    fn from(value: Vec<u8>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// An HPKE private key. Never serialized; zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HpkePrivateKey {
    value: Vec<u8>,
}

impl HpkePrivateKey {
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.value
    }
}

impl From<Vec<u8>> for HpkePrivateKey {
    fn from(value: Vec<u8>) -> Self {
        Self { value }
    }
}

impl std::fmt::Debug for HpkePrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HpkePrivateKey { *** }")
    }
}

/// An HPKE key pair.
#[derive(Debug, Clone)]
pub struct HpkeKeypair {
    pub(crate) private_key: HpkePrivateKey,
    pub(crate) public_key: HpkePublicKey,
}

impl HpkeKeypair {
    /// Derive a key pair from a secret the way tree nodes do.
    pub fn derive(suite: CipherSuite, ikm: &Secret) -> Result<Self, CryptoError> {
        suite.derive_hpke_keypair(ikm.as_slice())
    }

    pub fn public_key(&self) -> &HpkePublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &HpkePrivateKey {
        &self.private_key
    }
}

/// `KdfLabel` is serialized and used in the `info` field of
/// `kdf_expand_label`.
#[derive(TlsSerialize, TlsSize)]
struct KdfLabel {
    length: u16,
    label: TlsByteVecU8,
    context: TlsByteVecU32,
}

impl KdfLabel {
    fn serialized_label(context: &[u8], label: String, length: usize) -> Result<Vec<u8>, CryptoError> {
        if length > u16::MAX.into() {
            return Err(CryptoError::KdfLabelTooLarge);
        }
        let kdf_label = KdfLabel {
            length: length as u16,
            label: label.as_bytes().into(),
            context: context.into(),
        };
        kdf_label
            .tls_serialize_detached()
            .map_err(|_| CryptoError::KdfSerializationError)
    }
}

/// Compare two byte slices without short-circuiting on the first
/// difference.
#[inline(always)]
fn equal_ct(a: &[u8], b: &[u8]) -> bool {
    let mut diff = 0u8;
    for (l, r) in a.iter().zip(b.iter()) {
        diff |= l ^ r;
    }
    diff == 0
}

/// A suite-bound secret. Wraps raw key material to keep derivations typed
/// and to guarantee zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    #[zeroize(skip)]
    suite: CipherSuite,
    value: Vec<u8>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret {{ suite: {}, len: {} }}", self.suite, self.value.len())
    }
}

impl PartialEq for Secret {
    // Constant time comparison.
    fn eq(&self, other: &Secret) -> bool {
        if self.suite != other.suite || self.value.len() != other.value.len() {
            return false;
        }
        equal_ct(&self.value, &other.value)
    }
}

impl Secret {
    /// Randomly sample a fresh `Secret` of the suite's hash length.
    pub fn random(suite: CipherSuite) -> Self {
        use rand::RngCore;
        let mut value = vec![0u8; suite.hash_length()];
        ChaCha20Rng::from_entropy().fill_bytes(&mut value);
        Secret { suite, value }
    }

    /// An all-zero secret of the suite's hash length.
    pub(crate) fn zero(suite: CipherSuite) -> Self {
        Secret {
            suite,
            value: vec![0u8; suite.hash_length()],
        }
    }

    pub fn from_slice(suite: CipherSuite, bytes: &[u8]) -> Self {
        Secret {
            suite,
            value: bytes.to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.value
    }

    pub(crate) fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// HKDF extract where `self` is the salt.
    pub(crate) fn hkdf_extract(&self, ikm: &Secret) -> Result<Self, CryptoError> {
        log_crypto!(trace, "HKDF extract with salt {:x?} ikm {:x?}", self.value, ikm.value);
        debug_assert_eq!(self.suite, ikm.suite);
        Ok(Secret {
            suite: self.suite,
            value: backend::hkdf_extract(self.suite.hash_type(), &self.value, &ikm.value)?,
        })
    }

    /// HKDF expand where `self` is the PRK.
    pub(crate) fn hkdf_expand(&self, info: &[u8], okm_len: usize) -> Result<Self, CryptoError> {
        let value = backend::hkdf_expand(self.suite.hash_type(), &self.value, info, okm_len)?;
        if value.is_empty() {
            return Err(CryptoError::HkdfOutputLengthInvalid);
        }
        Ok(Secret {
            suite: self.suite,
            value,
        })
    }

    /// Expand this secret to `length` bytes under `label` and `context`.
    /// The label text is prefixed with the protocol version string.
    pub(crate) fn kdf_expand_label(
        &self,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> Result<Secret, CryptoError> {
        let full_label = format!("mls10 {}", label);
        log::trace!(
            "KDF expand with label \"{}\" and context {:x?}",
            &full_label,
            context
        );
        let info = KdfLabel::serialized_label(context, full_label, length)?;
        self.hkdf_expand(&info, length)
    }

    /// Expand under `label` with an empty context, at hash length.
    pub(crate) fn derive_secret(&self, label: &str) -> Result<Secret, CryptoError> {
        self.kdf_expand_label(label, &[], self.suite.hash_length())
    }
}

/// 9.2 Message framing
///
/// ```text
/// struct {
///     opaque mac_value<0..255>;
/// } MAC;
/// ```
#[derive(Debug, Clone, Eq, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct Mac {
    pub(crate) mac_value: TlsByteVecU8,
}

impl PartialEq for Mac {
    // Constant time comparison.
    fn eq(&self, other: &Mac) -> bool {
        equal_ct(self.mac_value.as_slice(), other.mac_value.as_slice())
    }
}

impl Mac {
    /// HMAC-Hash(salt, ikm). For all supported ciphersuites this is the same
    /// HMAC that is used in HKDF.
    pub(crate) fn new(salt: &Secret, ikm: &[u8]) -> Result<Self, CryptoError> {
        Ok(Mac {
            mac_value: salt
                .hkdf_extract(&Secret::from_slice(salt.suite(), ikm))?
                .value
                .clone()
                .into(),
        })
    }
}

/// A key for the suite's AEAD.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct AeadKey {
    aead_mode: AeadType,
    value: Vec<u8>,
}

impl AeadKey {
    pub(crate) fn from_secret(secret: &Secret) -> Self {
        AeadKey {
            aead_mode: secret.suite().aead_type(),
            value: secret.as_slice().to_vec(),
        }
    }

    /// Encrypt `msg` under this key and `nonce`.
    pub(crate) fn aead_seal(
        &self,
        msg: &[u8],
        aad: &[u8],
        nonce: &AeadNonce,
    ) -> Result<Vec<u8>, CryptoError> {
        backend::aead_encrypt(self.aead_mode, &self.value, msg, &nonce.value, aad)
    }

    /// Decrypt `ciphertext` with this key, `aad` and `nonce`.
    pub(crate) fn aead_open(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        nonce: &AeadNonce,
    ) -> Result<Vec<u8>, CryptoError> {
        backend::aead_decrypt(self.aead_mode, &self.value, ciphertext, &nonce.value, aad)
    }
}

impl Drop for AeadKey {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// A nonce for the suite's AEAD.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct AeadNonce {
    value: [u8; NONCE_BYTES],
}

impl AeadNonce {
    pub(crate) fn from_secret(secret: &Secret) -> Self {
        let mut value = [0u8; NONCE_BYTES];
        value.clone_from_slice(secret.as_slice());
        AeadNonce { value }
    }
}

/// A detached signature.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct Signature {
    value: TlsByteVecU16,
}

/// A signature public key, bound to its scheme.
#[derive(Debug, PartialEq, Eq, Clone, Hash, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct SignaturePublicKey {
    signature_scheme: SignatureScheme,
    value: TlsByteVecU16,
}

impl SignaturePublicKey {
    /// Wrap raw public key bytes. Fails if the scheme is not supported by
    /// the backend.
    pub fn new(signature_scheme: SignatureScheme, bytes: Vec<u8>) -> Result<Self, CryptoError> {
        backend::supports(signature_scheme)?;
        Ok(Self {
            signature_scheme,
            value: bytes.into(),
        })
    }

    /// Verify `signature` over the `payload` byte slice.
    pub fn verify(&self, signature: &Signature, payload: &[u8]) -> Result<(), CryptoError> {
        backend::verify_signature(
            self.signature_scheme,
            payload,
            self.value.as_slice(),
            signature.value.as_slice(),
        )
    }
}

/// A signature private key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SignaturePrivateKey {
    #[zeroize(skip)]
    signature_scheme: SignatureScheme,
    value: Vec<u8>,
}

impl std::fmt::Debug for SignaturePrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignaturePrivateKey { *** }")
    }
}

impl SignaturePrivateKey {
    /// Sign the `payload` byte slice.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature, CryptoError> {
        let value = backend::sign(self.signature_scheme, payload, &self.value)?;
        Ok(Signature {
            value: value.into(),
        })
    }
}

/// A fresh signature key pair.
#[derive(Debug, Clone)]
pub struct SignatureKeypair {
    signature_scheme: SignatureScheme,
    private_key: SignaturePrivateKey,
    public_key: SignaturePublicKey,
}

impl SignatureKeypair {
    /// Sample a new key pair for `signature_scheme`.
    pub fn new(signature_scheme: SignatureScheme) -> Result<SignatureKeypair, CryptoError> {
        let mut rng = ChaCha20Rng::from_entropy();
        let (sk, pk) = backend::signature_key_gen(signature_scheme, &mut rng)?;
        Ok(SignatureKeypair {
            signature_scheme,
            private_key: SignaturePrivateKey {
                signature_scheme,
                value: sk,
            },
            public_key: SignaturePublicKey {
                signature_scheme,
                value: pk.into(),
            },
        })
    }

    pub fn public_key(&self) -> &SignaturePublicKey {
        &self.public_key
    }

    /// Split into the private and public halves.
    pub fn into_tuple(self) -> (SignaturePrivateKey, SignaturePublicKey) {
        (self.private_key, self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported_suites() -> Vec<CipherSuite> {
        vec![
            CipherSuite::X25519_SHA256_AES128GCM,
            CipherSuite::P256_AES128GCM_SHA256_P256,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305,
        ]
    }

    #[test]
    fn kdf_expand_label_is_deterministic() {
        for suite in supported_suites() {
            let secret = Secret::from_slice(suite, &[7u8; 32]);
            let a = secret.kdf_expand_label("path", &[], suite.hash_length()).unwrap();
            let b = secret.kdf_expand_label("path", &[], suite.hash_length()).unwrap();
            assert_eq!(a, b);
            let c = secret.kdf_expand_label("node", &[], suite.hash_length()).unwrap();
            assert_ne!(a, c);
        }
    }

    #[test]
    fn aead_seal_open_roundtrip() {
        for suite in supported_suites() {
            let key_secret = Secret::from_slice(suite, &vec![3u8; suite.aead_key_length()]);
            let nonce_secret = Secret::from_slice(suite, &vec![9u8; suite.aead_nonce_length()]);
            let key = AeadKey::from_secret(&key_secret);
            let nonce = AeadNonce::from_secret(&nonce_secret);
            let ct = key.aead_seal(b"treekem", b"aad", &nonce).unwrap();
            assert_eq!(key.aead_open(&ct, b"aad", &nonce).unwrap(), b"treekem");
            assert_eq!(
                key.aead_open(&ct, b"wrong aad", &nonce).unwrap_err(),
                CryptoError::AeadDecryptionError
            );
        }
    }

    #[test]
    fn hpke_seal_open_roundtrip() {
        for suite in supported_suites() {
            let ikm = Secret::from_slice(suite, &[42u8; 32]);
            let keypair = HpkeKeypair::derive(suite, &ikm).unwrap();
            let ct = suite
                .hpke_seal(keypair.public_key(), b"info", b"aad", b"path secret")
                .unwrap();
            let pt = suite
                .hpke_open(&ct, keypair.private_key(), b"info", b"aad")
                .unwrap();
            assert_eq!(pt, b"path secret");
        }
    }

    #[test]
    fn hpke_keypair_derivation_is_deterministic() {
        for suite in supported_suites() {
            let ikm = Secret::from_slice(suite, &[11u8; 32]);
            let a = HpkeKeypair::derive(suite, &ikm).unwrap();
            let b = HpkeKeypair::derive(suite, &ikm).unwrap();
            assert_eq!(a.public_key(), b.public_key());
        }
    }

    #[test]
    fn sign_verify_roundtrip() {
        for suite in supported_suites() {
            let keypair = SignatureKeypair::new(suite.signature_scheme()).unwrap();
            let signature = keypair.private_key.sign(b"payload").unwrap();
            assert!(keypair.public_key().verify(&signature, b"payload").is_ok());
            assert_eq!(
                keypair.public_key().verify(&signature, b"other").unwrap_err(),
                CryptoError::InvalidSignature
            );
        }
    }

    #[test]
    fn unsupported_suites_are_rejected() {
        for suite in [
            CipherSuite::X448_SHA512_AES256GCM,
            CipherSuite::P521_AES256GCM_SHA512_P521,
            CipherSuite::X448_SHA512_CHACHA20POLY1305,
        ] {
            assert!(suite.supported().is_err());
        }
    }
}
