//! Per-sender symmetric ratchets.
//!
//! Within one epoch, every leaf owns two chains (handshake and
//! application) keyed off the epoch's encryption secret. Each generation
//! yields one AEAD key/nonce pair; the chain key is consumed as it is
//! ratcheted forward.

use crate::ciphersuite::{AeadKey, AeadNonce, Secret};
use crate::error::Error;

/// Key material for one generation of a ratchet.
pub(crate) type RatchetSecrets = (AeadKey, AeadNonce);

/// Receiver-side window configuration for out-of-order application
/// messages.
///
/// `out_of_order_tolerance` controls how many generations behind the
/// latest delivery may still be decrypted; keeping old secrets weakens
/// forward secrecy within the epoch, so the window is small by default.
/// `maximum_forward_distance` bounds how far ahead of the current
/// generation a message may skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderRatchetConfiguration {
    out_of_order_tolerance: u32,
    maximum_forward_distance: u32,
}

impl SenderRatchetConfiguration {
    pub fn new(out_of_order_tolerance: u32, maximum_forward_distance: u32) -> Self {
        Self {
            out_of_order_tolerance,
            maximum_forward_distance,
        }
    }

    pub fn out_of_order_tolerance(&self) -> u32 {
        self.out_of_order_tolerance
    }

    pub fn maximum_forward_distance(&self) -> u32 {
        self.maximum_forward_distance
    }
}

impl Default for SenderRatchetConfiguration {
    fn default() -> Self {
        Self::new(5, 1000)
    }
}

/// One chain of the per-sender ratchet.
#[derive(Debug, Clone)]
pub(crate) struct SenderRatchet {
    generation: u32,
    // Chain keys for generations `generation - past_secrets.len() + 1 ..=
    // generation`, oldest first. Senders keep exactly one entry.
    past_secrets: Vec<Secret>,
}

impl SenderRatchet {
    /// A ratchet at generation zero, seeded with its chain key.
    pub(crate) fn new(chain_key: Secret) -> Self {
        Self {
            generation: 0,
            past_secrets: vec![chain_key],
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Key material for the current generation; ratchets forward and
    /// discards the consumed chain key.
    pub(crate) fn secret_for_encryption(&mut self) -> Result<(u32, RatchetSecrets), Error> {
        let chain_key = self
            .past_secrets
            .last()
            .expect("sender ratchets are never depleted")
            .clone();
        let generation = self.generation;
        let key_material = Self::derive_key_nonce(&chain_key)?;
        // Senders never decrypt their own traffic, so nothing old is kept.
        self.past_secrets = vec![Self::ratchet_forward(&chain_key)?];
        self.generation += 1;
        Ok((generation, key_material))
    }

    /// Key material for `generation`, advancing the chain as needed and
    /// keeping at most `out_of_order_tolerance` old chain keys.
    pub(crate) fn secret_for_decryption(
        &mut self,
        generation: u32,
        configuration: &SenderRatchetConfiguration,
    ) -> Result<RatchetSecrets, Error> {
        // Too far ahead of the latest delivery
        if generation > self.generation
            && generation - self.generation > configuration.maximum_forward_distance()
        {
            return Err(Error::StaleGeneration);
        }

        if generation <= self.generation {
            // Within (or before) the retention window of past chain keys
            let distance = self.generation - generation;
            if distance as usize >= self.past_secrets.len() {
                return Err(Error::StaleGeneration);
            }
            let index = self.past_secrets.len() - 1 - distance as usize;
            let chain_key = self.past_secrets[index].clone();
            Self::derive_key_nonce(&chain_key)
        } else {
            // Ratchet forward, retaining a bounded window
            for _ in 0..(generation - self.generation) {
                if self.past_secrets.len() == configuration.out_of_order_tolerance() as usize {
                    self.past_secrets.remove(0);
                }
                let last = self
                    .past_secrets
                    .last()
                    .expect("sender ratchets are never depleted");
                let next = Self::ratchet_forward(last)?;
                self.past_secrets.push(next);
                self.generation += 1;
            }
            let chain_key = self
                .past_secrets
                .last()
                .expect("sender ratchets are never depleted")
                .clone();
            Self::derive_key_nonce(&chain_key)
        }
    }

    fn ratchet_forward(chain_key: &Secret) -> Result<Secret, Error> {
        let suite = chain_key.suite();
        Ok(chain_key.kdf_expand_label("chain", &[], suite.hash_length())?)
    }

    fn derive_key_nonce(chain_key: &Secret) -> Result<RatchetSecrets, Error> {
        let suite = chain_key.suite();
        let key = chain_key.kdf_expand_label("key", &[], suite.aead_key_length())?;
        let nonce = chain_key.kdf_expand_label("nonce", &[], suite.aead_nonce_length())?;
        Ok((AeadKey::from_secret(&key), AeadNonce::from_secret(&nonce)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ciphersuite::CipherSuite;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM;

    fn chain_key() -> Secret {
        Secret::from_slice(SUITE, &[13u8; 32])
    }

    #[test]
    fn sender_and_receiver_agree() {
        let mut sender = SenderRatchet::new(chain_key());
        let mut receiver = SenderRatchet::new(chain_key());
        let configuration = SenderRatchetConfiguration::default();

        for expected_generation in 0..8u32 {
            let (generation, (key, nonce)) = sender.secret_for_encryption().unwrap();
            assert_eq!(generation, expected_generation);
            let (rx_key, rx_nonce) = receiver
                .secret_for_decryption(generation, &configuration)
                .unwrap();
            assert_eq!(key, rx_key);
            assert_eq!(nonce, rx_nonce);
        }
    }

    #[test]
    fn out_of_order_within_window() {
        let mut sender = SenderRatchet::new(chain_key());
        let mut receiver = SenderRatchet::new(chain_key());
        let configuration = SenderRatchetConfiguration::new(3, 1000);

        let mut sent = vec![];
        for _ in 0..3 {
            sent.push(sender.secret_for_encryption().unwrap());
        }

        // Deliver in order (2, 0, 1)
        for &index in &[2usize, 0, 1] {
            let (generation, (key, _)) = &sent[index];
            let (rx_key, _) = receiver
                .secret_for_decryption(*generation, &configuration)
                .unwrap();
            assert_eq!(key, &rx_key);
        }
    }

    #[test]
    fn out_of_window_generations_are_stale() {
        let mut receiver = SenderRatchet::new(chain_key());
        let configuration = SenderRatchetConfiguration::new(2, 1000);

        // Jump ahead to generation 3; with tolerance 2 only generation 2
        // remains reachable behind it.
        receiver.secret_for_decryption(3, &configuration).unwrap();
        receiver.secret_for_decryption(2, &configuration).unwrap();
        assert_eq!(
            receiver.secret_for_decryption(0, &configuration).unwrap_err(),
            Error::StaleGeneration
        );
    }

    #[test]
    fn far_future_generations_are_stale() {
        let mut receiver = SenderRatchet::new(chain_key());
        let configuration = SenderRatchetConfiguration::new(5, 10);
        assert_eq!(
            receiver.secret_for_decryption(11, &configuration).unwrap_err(),
            Error::StaleGeneration
        );
    }
}
