//! Per-epoch message encryption state: the sender-data secret plus one
//! pair of sender ratchets per leaf, initialized lazily from the epoch's
//! encryption secret.

use crate::ciphersuite::{AeadKey, AeadNonce, Secret};
use crate::error::Error;
use crate::tree::index::{LeafCount, LeafIndex, NodeIndex};
use crate::tree::sender_ratchet::{RatchetSecrets, SenderRatchet, SenderRatchetConfiguration};

/// Which of a leaf's two chains a message is keyed from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SecretType {
    Handshake,
    Application,
}

/// The encryption-side state of one epoch.
#[derive(Debug, Clone)]
pub(crate) struct MessageSecrets {
    sender_data_secret: Secret,
    encryption_secret: Secret,
    handshake_ratchets: Vec<Option<SenderRatchet>>,
    application_ratchets: Vec<Option<SenderRatchet>>,
}

impl MessageSecrets {
    pub(crate) fn new(
        encryption_secret: Secret,
        sender_data_secret: Secret,
        size: LeafCount,
    ) -> Self {
        Self {
            sender_data_secret,
            encryption_secret,
            handshake_ratchets: vec![None; size.as_usize()],
            application_ratchets: vec![None; size.as_usize()],
        }
    }

    fn size(&self) -> usize {
        self.handshake_ratchets.len()
    }

    /// Tag length of the epoch's AEAD, needed for padding calculations.
    pub(crate) fn mac_length(&self) -> usize {
        self.encryption_secret.suite().mac_length()
    }

    /// Derive the two chain ratchets of a leaf. The ratchet secret is
    /// bound to the sender's node index:
    ///
    /// ```text
    /// ratchet_secret = Expand-Label(encryption_secret, "tree", node, Nh)
    /// chain_key      = Expand-Label(ratchet_secret, "handshake"|"application", {}, Nh)
    /// ```
    fn initialize_ratchets(&mut self, index: LeafIndex) -> Result<(), Error> {
        if self.handshake_ratchets[index.as_usize()].is_some() {
            return Ok(());
        }
        log::trace!("Initializing sender ratchets for {:?}", index);

        let suite = self.encryption_secret.suite();
        let node = NodeIndex::from(index).as_u32();
        let ratchet_secret = self.encryption_secret.kdf_expand_label(
            "tree",
            &node.to_be_bytes(),
            suite.hash_length(),
        )?;
        let handshake_chain =
            ratchet_secret.kdf_expand_label("handshake", &[], suite.hash_length())?;
        let application_chain =
            ratchet_secret.kdf_expand_label("application", &[], suite.hash_length())?;

        self.handshake_ratchets[index.as_usize()] = Some(SenderRatchet::new(handshake_chain));
        self.application_ratchets[index.as_usize()] = Some(SenderRatchet::new(application_chain));
        Ok(())
    }

    fn ratchet_mut(
        &mut self,
        index: LeafIndex,
        secret_type: SecretType,
    ) -> Result<&mut SenderRatchet, Error> {
        if index.as_usize() >= self.size() {
            return Err(Error::InvalidParameter("leaf index outside the tree"));
        }
        self.initialize_ratchets(index)?;
        let ratchets = match secret_type {
            SecretType::Handshake => &mut self.handshake_ratchets,
            SecretType::Application => &mut self.application_ratchets,
        };
        Ok(ratchets[index.as_usize()]
            .as_mut()
            .expect("ratchet initialized above"))
    }

    /// Key material for the next message we send from `index`.
    pub(crate) fn secret_for_encryption(
        &mut self,
        index: LeafIndex,
        secret_type: SecretType,
    ) -> Result<(u32, RatchetSecrets), Error> {
        self.ratchet_mut(index, secret_type)?.secret_for_encryption()
    }

    /// Key material for a message received from `index` at `generation`.
    pub(crate) fn secret_for_decryption(
        &mut self,
        index: LeafIndex,
        secret_type: SecretType,
        generation: u32,
        configuration: &SenderRatchetConfiguration,
    ) -> Result<RatchetSecrets, Error> {
        self.ratchet_mut(index, secret_type)?
            .secret_for_decryption(generation, configuration)
    }

    /// Key and nonce protecting a message's sender-data header, bound to
    /// a sample of the content ciphertext.
    pub(crate) fn sender_data_key_nonce(
        &self,
        ciphertext: &[u8],
    ) -> Result<(AeadKey, AeadNonce), Error> {
        let suite = self.sender_data_secret.suite();
        let sample_len = std::cmp::min(ciphertext.len(), suite.hash_length());
        let sample = &ciphertext[..sample_len];
        let key = self
            .sender_data_secret
            .kdf_expand_label("key", sample, suite.aead_key_length())?;
        let nonce = self
            .sender_data_secret
            .kdf_expand_label("nonce", sample, suite.aead_nonce_length())?;
        Ok((AeadKey::from_secret(&key), AeadNonce::from_secret(&nonce)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ciphersuite::CipherSuite;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM;

    fn secrets() -> MessageSecrets {
        MessageSecrets::new(
            Secret::from_slice(SUITE, &[3u8; 32]),
            Secret::from_slice(SUITE, &[4u8; 32]),
            LeafCount::from(3u32),
        )
    }

    #[test]
    fn chains_are_separated_by_leaf_and_type() {
        let mut a = secrets();
        let (_, (key_handshake, _)) = a
            .secret_for_encryption(LeafIndex::from(0u32), SecretType::Handshake)
            .unwrap();
        let (_, (key_application, _)) = a
            .secret_for_encryption(LeafIndex::from(0u32), SecretType::Application)
            .unwrap();
        let (_, (key_other_leaf, _)) = a
            .secret_for_encryption(LeafIndex::from(1u32), SecretType::Application)
            .unwrap();
        assert_ne!(key_handshake, key_application);
        assert_ne!(key_application, key_other_leaf);
    }

    #[test]
    fn sender_and_receiver_sides_agree() {
        let mut sender = secrets();
        let mut receiver = secrets();
        let configuration = SenderRatchetConfiguration::default();
        for _ in 0..4 {
            let (generation, (key, nonce)) = sender
                .secret_for_encryption(LeafIndex::from(2u32), SecretType::Application)
                .unwrap();
            let (rx_key, rx_nonce) = receiver
                .secret_for_decryption(
                    LeafIndex::from(2u32),
                    SecretType::Application,
                    generation,
                    &configuration,
                )
                .unwrap();
            assert_eq!(key, rx_key);
            assert_eq!(nonce, rx_nonce);
        }
    }

    #[test]
    fn out_of_range_leaf_is_rejected() {
        let mut a = secrets();
        assert_eq!(
            a.secret_for_encryption(LeafIndex::from(7u32), SecretType::Application)
                .unwrap_err(),
            Error::InvalidParameter("leaf index outside the tree")
        );
    }
}
