//! Native Rust crypto backend.
//!
//! All primitive operations are routed through this module so that the rest
//! of the library only ever sees suite-indexed functions.

use aes_gcm::{
    aead::{Aead, Payload},
    Aes128Gcm, Aes256Gcm, KeyInit,
};
use chacha20poly1305::ChaCha20Poly1305;
use ed25519_dalek::Signer as DalekSigner;
use hkdf::Hkdf;
use hpke::Hpke;
use hpke_rs_crypto::types as hpke_types;
use hpke_rs_rust_crypto::HpkeRustCrypto;
use p256::{
    ecdsa::{signature::Verifier, Signature as EcdsaSignature, SigningKey, VerifyingKey},
    EncodedPoint,
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};

use super::errors::CryptoError;
use super::{AeadType, CipherSuite, HashType, SignatureScheme};

pub(crate) fn supports(signature_scheme: SignatureScheme) -> Result<(), CryptoError> {
    match signature_scheme {
        SignatureScheme::EcdsaSecp256r1Sha256 => Ok(()),
        SignatureScheme::Ed25519 => Ok(()),
        _ => Err(CryptoError::UnsupportedSignatureScheme),
    }
}

pub(crate) fn hkdf_extract(
    hash_type: HashType,
    salt: &[u8],
    ikm: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match hash_type {
        HashType::Sha2_256 => Ok(Hkdf::<Sha256>::extract(Some(salt), ikm).0.as_slice().into()),
        HashType::Sha2_512 => Ok(Hkdf::<Sha512>::extract(Some(salt), ikm).0.as_slice().into()),
    }
}

pub(crate) fn hkdf_expand(
    hash_type: HashType,
    prk: &[u8],
    info: &[u8],
    okm_len: usize,
) -> Result<Vec<u8>, CryptoError> {
    match hash_type {
        HashType::Sha2_256 => {
            let hkdf =
                Hkdf::<Sha256>::from_prk(prk).map_err(|_| CryptoError::HkdfOutputLengthInvalid)?;
            let mut okm = vec![0u8; okm_len];
            hkdf.expand(info, &mut okm)
                .map_err(|_| CryptoError::HkdfOutputLengthInvalid)?;
            Ok(okm)
        }
        HashType::Sha2_512 => {
            let hkdf =
                Hkdf::<Sha512>::from_prk(prk).map_err(|_| CryptoError::HkdfOutputLengthInvalid)?;
            let mut okm = vec![0u8; okm_len];
            hkdf.expand(info, &mut okm)
                .map_err(|_| CryptoError::HkdfOutputLengthInvalid)?;
            Ok(okm)
        }
    }
}

pub(crate) fn hash(hash_type: HashType, data: &[u8]) -> Vec<u8> {
    match hash_type {
        HashType::Sha2_256 => Sha256::digest(data).as_slice().into(),
        HashType::Sha2_512 => Sha512::digest(data).as_slice().into(),
    }
}

pub(crate) fn aead_encrypt(
    alg: AeadType,
    key: &[u8],
    msg: &[u8],
    nonce: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match alg {
        AeadType::Aes128Gcm => {
            let aes = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            aes.encrypt(nonce.into(), Payload { msg, aad })
                .map(|ct| ct.as_slice().into())
                .map_err(|_| CryptoError::CryptoLibraryError)
        }
        AeadType::Aes256Gcm => {
            let aes = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            aes.encrypt(nonce.into(), Payload { msg, aad })
                .map(|ct| ct.as_slice().into())
                .map_err(|_| CryptoError::CryptoLibraryError)
        }
        AeadType::ChaCha20Poly1305 => {
            let chacha_poly =
                ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            chacha_poly
                .encrypt(nonce.into(), Payload { msg, aad })
                .map(|ct| ct.as_slice().into())
                .map_err(|_| CryptoError::CryptoLibraryError)
        }
    }
}

pub(crate) fn aead_decrypt(
    alg: AeadType,
    key: &[u8],
    ct_tag: &[u8],
    nonce: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match alg {
        AeadType::Aes128Gcm => {
            let aes = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            aes.decrypt(nonce.into(), Payload { msg: ct_tag, aad })
                .map(|pt| pt.as_slice().into())
                .map_err(|_| CryptoError::AeadDecryptionError)
        }
        AeadType::Aes256Gcm => {
            let aes = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            aes.decrypt(nonce.into(), Payload { msg: ct_tag, aad })
                .map(|pt| pt.as_slice().into())
                .map_err(|_| CryptoError::AeadDecryptionError)
        }
        AeadType::ChaCha20Poly1305 => {
            let chacha_poly =
                ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidLength)?;
            chacha_poly
                .decrypt(nonce.into(), Payload { msg: ct_tag, aad })
                .map(|pt| pt.as_slice().into())
                .map_err(|_| CryptoError::AeadDecryptionError)
        }
    }
}

/// Returns `(sk, pk)` serialized.
pub(crate) fn signature_key_gen(
    alg: SignatureScheme,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    match alg {
        SignatureScheme::EcdsaSecp256r1Sha256 => {
            let k = SigningKey::random(rng);
            let pk = k.verifying_key().to_encoded_point(false).as_bytes().into();
            Ok((k.to_bytes().as_slice().into(), pk))
        }
        SignatureScheme::Ed25519 => {
            let sk = ed25519_dalek::SigningKey::generate(rng);
            let pk = sk.verifying_key().to_bytes().into();
            Ok((sk.to_bytes().into(), pk))
        }
        _ => Err(CryptoError::UnsupportedSignatureScheme),
    }
}

pub(crate) fn sign(alg: SignatureScheme, data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match alg {
        SignatureScheme::EcdsaSecp256r1Sha256 => {
            let k = SigningKey::from_bytes(key.into()).map_err(|_| CryptoError::InvalidLength)?;
            let signature: EcdsaSignature = k.sign(data);
            Ok(signature.to_der().to_bytes().into())
        }
        SignatureScheme::Ed25519 => {
            let k = ed25519_dalek::SigningKey::try_from(key)
                .map_err(|_| CryptoError::InvalidLength)?;
            let signature = k.sign(data);
            Ok(signature.to_bytes().into())
        }
        _ => Err(CryptoError::UnsupportedSignatureScheme),
    }
}

pub(crate) fn verify_signature(
    alg: SignatureScheme,
    data: &[u8],
    pk: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    match alg {
        SignatureScheme::EcdsaSecp256r1Sha256 => {
            let k = VerifyingKey::from_encoded_point(
                &EncodedPoint::from_bytes(pk).map_err(|_| CryptoError::CryptoLibraryError)?,
            )
            .map_err(|_| CryptoError::CryptoLibraryError)?;
            k.verify(
                data,
                &EcdsaSignature::from_der(signature).map_err(|_| CryptoError::InvalidSignature)?,
            )
            .map_err(|_| CryptoError::InvalidSignature)
        }
        SignatureScheme::Ed25519 => {
            let k = ed25519_dalek::VerifyingKey::try_from(pk)
                .map_err(|_| CryptoError::CryptoLibraryError)?;
            if signature.len() != ed25519_dalek::SIGNATURE_LENGTH {
                return Err(CryptoError::InvalidSignature);
            }
            let mut sig = [0u8; ed25519_dalek::SIGNATURE_LENGTH];
            sig.clone_from_slice(signature);
            k.verify_strict(data, &ed25519_dalek::Signature::from(sig))
                .map_err(|_| CryptoError::InvalidSignature)
        }
        _ => Err(CryptoError::UnsupportedSignatureScheme),
    }
}

#[inline(always)]
fn kem_from_suite(suite: CipherSuite) -> Result<hpke_types::KemAlgorithm, CryptoError> {
    match suite {
        CipherSuite::X25519_SHA256_AES128GCM | CipherSuite::X25519_SHA256_CHACHA20POLY1305 => {
            Ok(hpke_types::KemAlgorithm::DhKem25519)
        }
        CipherSuite::P256_AES128GCM_SHA256_P256 => Ok(hpke_types::KemAlgorithm::DhKemP256),
        _ => Err(CryptoError::UnsupportedCiphersuite),
    }
}

#[inline(always)]
fn hpke_kdf_from_suite(suite: CipherSuite) -> hpke_types::KdfAlgorithm {
    match suite.hash_type() {
        HashType::Sha2_256 => hpke_types::KdfAlgorithm::HkdfSha256,
        HashType::Sha2_512 => hpke_types::KdfAlgorithm::HkdfSha512,
    }
}

#[inline(always)]
fn hpke_aead_from_suite(suite: CipherSuite) -> hpke_types::AeadAlgorithm {
    match suite.aead_type() {
        AeadType::Aes128Gcm => hpke_types::AeadAlgorithm::Aes128Gcm,
        AeadType::Aes256Gcm => hpke_types::AeadAlgorithm::Aes256Gcm,
        AeadType::ChaCha20Poly1305 => hpke_types::AeadAlgorithm::ChaCha20Poly1305,
    }
}

pub(crate) fn hpke_from_suite(suite: CipherSuite) -> Result<Hpke<HpkeRustCrypto>, CryptoError> {
    Ok(Hpke::<HpkeRustCrypto>::new(
        hpke::Mode::Base,
        kem_from_suite(suite)?,
        hpke_kdf_from_suite(suite),
        hpke_aead_from_suite(suite),
    ))
}
