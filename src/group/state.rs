//! The epoch state machine.
//!
//! A [`State`] is one member's view of the group at one epoch. It is
//! created by [`State::new`] (group creator) or [`State::join`] (from a
//! Welcome), collects proposals via [`State::handle`], and transitions to
//! the next epoch either by committing ([`State::commit`]) or by handling
//! another member's commit. Transitions are atomic: they produce a new
//! `State` and leave the current one untouched on failure.

use std::collections::HashMap;

use tls_codec::Serialize as TlsSerializeTrait;

use super::{GroupContext, GroupEpoch, GroupId};
use crate::ciphersuite::{CipherSuite, Secret, SignaturePrivateKey};
use crate::error::Error;
use crate::framing::{
    CommitData, ContentType, MlsCiphertext, MlsPlaintext, MlsPlaintextCommitContent,
    MlsPlaintextContent,
};
use crate::key_packages::{Extension, KeyPackage};
use crate::messages::proposals::{
    AddProposal, Proposal, ProposalReference, RemoveProposal, UpdateProposal,
};
use crate::messages::{Commit, GroupInfo, Welcome};
use crate::schedule::message_secrets::MessageSecrets;
use crate::schedule::{CommitSecret, EpochSecrets, InitSecret, JoinerSecret, MemberSecret};
use crate::tree::index::{LeafIndex, NodeCount, NodeIndex};
use crate::tree::sender_ratchet::SenderRatchetConfiguration;
use crate::tree::{treemath, TreeKEMPrivateKey, TreeKEMPublicKey};

/// One member's group state at one epoch.
#[derive(Debug, Clone)]
pub struct State {
    suite: CipherSuite,
    group_id: GroupId,
    epoch: GroupEpoch,
    tree: TreeKEMPublicKey,
    tree_priv: TreeKEMPrivateKey,
    identity_priv: SignaturePrivateKey,
    confirmed_transcript_hash: Vec<u8>,
    interim_transcript_hash: Vec<u8>,
    extensions: Vec<Extension>,
    epoch_secrets: EpochSecrets,
    message_secrets: MessageSecrets,
    ratchet_configuration: SenderRatchetConfiguration,
    pending_proposals: Vec<MlsPlaintext>,
    // Fresh leaf secrets for Updates we have proposed, keyed by the hash
    // of the new KeyPackage; consumed when a commit applies the Update.
    update_secrets: HashMap<Vec<u8>, Secret>,
}

impl PartialEq for State {
    // Two states are "the same group state" when the public group view
    // and the epoch authenticator agree; the secret comparison is
    // constant time.
    fn eq(&self, other: &Self) -> bool {
        self.suite == other.suite
            && self.group_id == other.group_id
            && self.epoch == other.epoch
            && self.tree == other.tree
            && self.confirmed_transcript_hash == other.confirmed_transcript_hash
            && self.interim_transcript_hash == other.interim_transcript_hash
            && self.epoch_secrets.authentication_secret == other.epoch_secrets.authentication_secret
    }
}

impl State {
    /// Create a one-member group. The creator's leaf keys are derived
    /// from `init_secret`, matching the init key in `key_package`.
    pub fn new(
        group_id: GroupId,
        suite: CipherSuite,
        init_secret: Secret,
        identity_priv: SignaturePrivateKey,
        key_package: KeyPackage,
    ) -> Result<Self, Error> {
        suite.supported()?;
        if key_package.cipher_suite() != suite {
            return Err(Error::InvalidParameter("key package suite mismatch"));
        }
        key_package.verify()?;

        let mut tree = TreeKEMPublicKey::new(suite);
        let own_index = tree.add_leaf(key_package)?;
        tree.set_hash_all()?;
        let tree_priv = TreeKEMPrivateKey::create(suite, tree.size(), own_index, &init_secret);

        // Epoch 0 never has to agree with anyone; it is keyed from a zero
        // init secret and the creator's own root path secret.
        let commit_secret = CommitSecret::new(
            tree_priv
                .update_secret()
                .expect("create always implants a root secret")
                .clone(),
        );
        let joiner_secret = JoinerSecret::new(&InitSecret::zero(suite), &commit_secret)?;
        let member_secret = MemberSecret::new(&joiner_secret)?;
        let group_context = GroupContext::new(
            group_id.clone(),
            GroupEpoch(0),
            tree.root_hash()?,
            vec![],
            &[],
        );
        let epoch_secrets =
            EpochSecrets::new(&member_secret, &group_context.tls_serialize_detached()?)?;
        let message_secrets = MessageSecrets::new(
            epoch_secrets.encryption_secret.clone(),
            epoch_secrets.sender_data_secret.clone(),
            tree.size(),
        );

        Ok(State {
            suite,
            group_id,
            epoch: GroupEpoch(0),
            tree,
            tree_priv,
            identity_priv,
            confirmed_transcript_hash: vec![],
            interim_transcript_hash: vec![],
            extensions: vec![],
            epoch_secrets,
            message_secrets,
            ratchet_configuration: SenderRatchetConfiguration::default(),
            pending_proposals: vec![],
            update_secrets: HashMap::new(),
        })
    }

    /// Join a group from a Welcome. `init_secret` is the secret the
    /// published `key_package`'s init key was derived from.
    pub fn join(
        init_secret: Secret,
        identity_priv: SignaturePrivateKey,
        key_package: KeyPackage,
        welcome: &Welcome,
    ) -> Result<Self, Error> {
        let suite = welcome.cipher_suite();
        suite.supported()?;
        if key_package.cipher_suite() != suite {
            return Err(Error::InvalidParameter("key package suite mismatch"));
        }

        // Decrypt the group secrets addressed to us
        let encrypted_group_secrets = welcome.find(&key_package)?;
        let init_keypair = suite.derive_hpke_keypair(init_secret.as_slice())?;
        if init_keypair.public_key() != key_package.hpke_init_key() {
            return Err(Error::InvalidParameter(
                "init secret does not match the key package",
            ));
        }
        let group_secrets =
            welcome.decrypt_group_secrets(encrypted_group_secrets, init_keypair.private_key())?;
        let joiner_secret = JoinerSecret::from_secret(Secret::from_slice(
            suite,
            group_secrets.joiner_secret.as_slice(),
        ));

        // Decrypt and authenticate the group info
        let group_info = welcome.decrypt_group_info(&joiner_secret)?;
        group_info.verify()?;

        let mut tree = group_info.tree.clone();
        tree.set_hash_all()?;

        let own_index = tree
            .find(&key_package)
            .ok_or(Error::Protocol("joiner's leaf is missing from the tree"))?;

        // Implant the path secret we share with the committer
        let intersect = treemath::ancestor(own_index, group_info.signer_index);
        let path_secret = group_secrets
            .path_secret
            .as_ref()
            .map(|ps| Secret::from_slice(suite, ps.path_secret.as_slice()));
        let tree_priv = TreeKEMPrivateKey::joiner(
            suite,
            tree.size(),
            own_index,
            &init_secret,
            intersect,
            path_secret,
        );
        if !tree_priv.consistent(&tree) {
            return Err(Error::Protocol(
                "welcome secrets do not match the public tree",
            ));
        }

        // Run the key schedule and check the confirmation
        let confirmed_transcript_hash = group_info.confirmed_transcript_hash.as_slice().to_vec();
        let interim_transcript_hash = group_info.interim_transcript_hash.as_slice().to_vec();
        let group_context = GroupContext::new(
            group_info.group_id.clone(),
            group_info.epoch,
            tree.root_hash()?,
            confirmed_transcript_hash.clone(),
            &[],
        );
        let member_secret = MemberSecret::new(&joiner_secret)?;
        let epoch_secrets =
            EpochSecrets::new(&member_secret, &group_context.tls_serialize_detached()?)?;
        let confirmation = epoch_secrets.confirmation(&confirmed_transcript_hash)?;
        if confirmation.mac_value.as_slice() != group_info.confirmation.as_slice() {
            return Err(Error::Protocol("confirmation verification failed"));
        }

        let message_secrets = MessageSecrets::new(
            epoch_secrets.encryption_secret.clone(),
            epoch_secrets.sender_data_secret.clone(),
            tree.size(),
        );

        Ok(State {
            suite,
            group_id: group_info.group_id.clone(),
            epoch: group_info.epoch,
            tree,
            tree_priv,
            identity_priv,
            confirmed_transcript_hash,
            interim_transcript_hash,
            extensions: vec![],
            epoch_secrets,
            message_secrets,
            ratchet_configuration: SenderRatchetConfiguration::default(),
            pending_proposals: vec![],
            update_secrets: HashMap::new(),
        })
    }

    // === Accessors ===

    pub fn cipher_suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn epoch(&self) -> GroupEpoch {
        self.epoch
    }

    /// Our own leaf index.
    pub fn index(&self) -> LeafIndex {
        self.tree_priv.own_index()
    }

    pub fn tree(&self) -> &TreeKEMPublicKey {
        &self.tree
    }

    /// The epoch authenticator: equal across members exactly when their
    /// states agree.
    pub fn authentication_secret(&self) -> Vec<u8> {
        self.epoch_secrets.authentication_secret.as_slice().to_vec()
    }

    /// Derive an application export from the epoch's exporter secret.
    pub fn export_secret(
        &self,
        label: &str,
        context: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, Error> {
        Ok(self
            .epoch_secrets
            .exporter_secret
            .kdf_expand_label(label, context, length)?
            .as_slice()
            .to_vec())
    }

    /// Configure the receiver window for out-of-order application
    /// messages.
    pub fn set_ratchet_configuration(&mut self, configuration: SenderRatchetConfiguration) {
        self.ratchet_configuration = configuration;
    }

    fn group_context(&self) -> Result<GroupContext, Error> {
        Ok(GroupContext::new(
            self.group_id.clone(),
            self.epoch,
            self.tree.root_hash()?,
            self.confirmed_transcript_hash.clone(),
            &self.extensions,
        ))
    }

    // === Proposal factories ===

    /// Propose adding a member.
    pub fn add(&self, key_package: &KeyPackage) -> Result<MlsPlaintext, Error> {
        if key_package.cipher_suite() != self.suite {
            return Err(Error::InvalidParameter("key package suite mismatch"));
        }
        key_package.verify()?;
        MlsPlaintext::new_proposal(
            self.group_id.clone(),
            self.epoch,
            self.index(),
            Proposal::Add(AddProposal {
                key_package: key_package.clone(),
            }),
            &self.group_context()?,
            &self.identity_priv,
        )
    }

    /// Propose rotating our own leaf to keys derived from `leaf_secret`.
    pub fn update(&mut self, leaf_secret: Secret) -> Result<MlsPlaintext, Error> {
        let mut key_package = self
            .tree
            .key_package(self.index())
            .ok_or(Error::InvalidParameter("own leaf is blank"))?
            .clone();
        let keypair = self.suite.derive_hpke_keypair(leaf_secret.as_slice())?;
        key_package.update_init_key(keypair.public_key().clone(), &self.identity_priv)?;

        // Remember the secret so the Update can be applied once a commit
        // references it, whether ours or another member's.
        self.update_secrets
            .insert(key_package.hash()?, leaf_secret);

        MlsPlaintext::new_proposal(
            self.group_id.clone(),
            self.epoch,
            self.index(),
            Proposal::Update(UpdateProposal { key_package }),
            &self.group_context()?,
            &self.identity_priv,
        )
    }

    /// Propose removing the member at `removed`.
    pub fn remove(&self, removed: LeafIndex) -> Result<MlsPlaintext, Error> {
        if removed.as_usize() >= self.tree.size().as_usize()
            || self.tree.key_package(removed).is_none()
        {
            return Err(Error::InvalidParameter("no member at this leaf"));
        }
        MlsPlaintext::new_proposal(
            self.group_id.clone(),
            self.epoch,
            self.index(),
            Proposal::Remove(RemoveProposal { removed }),
            &self.group_context()?,
            &self.identity_priv,
        )
    }

    // === The state machine ===

    /// Feed a handshake message into the state machine. Proposals are
    /// collected and return `None`; a commit produces the next state.
    pub fn handle(&mut self, plaintext: &MlsPlaintext) -> Result<Option<State>, Error> {
        if plaintext.group_id() != &self.group_id {
            return Err(Error::InvalidParameter("message for another group"));
        }
        if plaintext.epoch() != self.epoch {
            return Err(Error::StaleEpoch);
        }
        self.verify_membership(plaintext)?;

        match plaintext.content() {
            MlsPlaintextContent::Proposal(_) => {
                self.pending_proposals.push(plaintext.clone());
                Ok(None)
            }
            MlsPlaintextContent::Commit(_) => {
                if plaintext.sender() == self.index() {
                    return Err(Error::InvalidParameter(
                        "own commits yield their next state at creation",
                    ));
                }
                Ok(Some(self.apply_commit(plaintext)?))
            }
            MlsPlaintextContent::Application(_) => Err(Error::InvalidParameter(
                "application messages are decrypted with unprotect",
            )),
        }
    }

    /// Commit all pending proposals, producing the commit message to
    /// broadcast, a Welcome when members were added, and our next state.
    pub fn commit(
        &self,
        leaf_secret: &Secret,
    ) -> Result<(MlsPlaintext, Option<Welcome>, State), Error> {
        // Reference the pending proposals in category order
        let mut updates = Vec::new();
        let mut removes = Vec::new();
        let mut adds = Vec::new();
        for plaintext in &self.pending_proposals {
            let reference = ProposalReference::from_plaintext(self.suite, plaintext)?;
            match plaintext.content() {
                MlsPlaintextContent::Proposal(Proposal::Update(_)) => updates.push(reference),
                MlsPlaintextContent::Proposal(Proposal::Remove(_)) => removes.push(reference),
                MlsPlaintextContent::Proposal(Proposal::Add(_)) => adds.push(reference),
                _ => return Err(Error::Protocol("pending entry is not a proposal")),
            }
        }

        let mut next = self.clone();
        let joiners = next.apply_proposals(&updates, &removes, &adds)?;
        next.epoch.increment();

        // Encrypt the fresh path under the provisional context: epoch
        // already advanced, proposals applied, path not yet merged.
        next.tree.set_hash_all()?;
        let provisional_context = GroupContext::new(
            next.group_id.clone(),
            next.epoch,
            next.tree.root_hash()?,
            self.confirmed_transcript_hash.clone(),
            &next.extensions,
        )
        .tls_serialize_detached()?;
        let own_index = self.index();
        let (tree_priv, path) = next.tree.encap(
            own_index,
            &provisional_context,
            leaf_secret,
            &self.identity_priv,
        )?;
        next.tree_priv = tree_priv;

        let commit = Commit {
            updates: updates.into(),
            removes: removes.into(),
            adds: adds.into(),
            path,
        };

        // Advance the transcript and the key schedule
        let commit_content = MlsPlaintextCommitContent {
            group_id: &self.group_id,
            epoch: self.epoch,
            sender: own_index,
            commit: &commit,
        }
        .tls_serialize_detached()?;
        next.confirmed_transcript_hash =
            chained_hash(self.suite, &self.interim_transcript_hash, &commit_content);
        next.advance_epoch_secrets(&self.epoch_secrets.init_secret)?;

        let confirmation = next
            .epoch_secrets
            .confirmation(&next.confirmed_transcript_hash)?;
        let commit_plaintext = MlsPlaintext::new_commit(
            self.group_id.clone(),
            self.epoch,
            own_index,
            CommitData {
                commit,
                confirmation: confirmation.mac_value.as_slice().into(),
            },
            &self.group_context()?,
            &self.identity_priv,
        )?;
        next.interim_transcript_hash = chained_hash(
            self.suite,
            &next.confirmed_transcript_hash,
            &commit_plaintext.commit_auth_data()?,
        );

        // Welcome the joiners
        let welcome = if joiners.is_empty() {
            None
        } else {
            let group_info = GroupInfo::new(
                next.group_id.clone(),
                next.epoch,
                next.tree.clone(),
                next.confirmed_transcript_hash.clone(),
                next.interim_transcript_hash.clone(),
                confirmation.mac_value.as_slice().to_vec(),
                own_index,
                &self.identity_priv,
            )?;
            let joiner_secret = next.joiner_secret(&self.epoch_secrets.init_secret)?;
            let recipients = joiners
                .into_iter()
                .map(|(leaf, key_package)| {
                    let (_, path_secret) = next.tree_priv.shared_path_secret(leaf);
                    (key_package, path_secret.cloned())
                })
                .collect::<Vec<_>>();
            Some(Welcome::new(
                self.suite,
                &joiner_secret,
                &group_info,
                &recipients,
            )?)
        };

        next.pending_proposals.clear();
        next.update_secrets.clear();
        Ok((commit_plaintext, welcome, next))
    }

    /// Apply another member's commit, producing our next state.
    fn apply_commit(&self, plaintext: &MlsPlaintext) -> Result<State, Error> {
        let commit_data = match plaintext.content() {
            MlsPlaintextContent::Commit(commit_data) => commit_data,
            _ => return Err(Error::InvalidParameter("message does not carry a commit")),
        };
        let commit = &commit_data.commit;
        let from = plaintext.sender();

        let mut next = self.clone();
        next.apply_proposals(
            commit.updates.as_slice(),
            commit.removes.as_slice(),
            commit.adds.as_slice(),
        )?;
        next.epoch.increment();

        // Decrypt the path under the same provisional context the
        // committer used, then merge it.
        next.tree.set_hash_all()?;
        let provisional_context = GroupContext::new(
            next.group_id.clone(),
            next.epoch,
            next.tree.root_hash()?,
            self.confirmed_transcript_hash.clone(),
            &next.extensions,
        )
        .tls_serialize_detached()?;
        next.tree_priv
            .decap(from, &next.tree, &provisional_context, &commit.path)?;
        next.tree.merge(from, &commit.path)?;
        if !next.tree_priv.consistent(&next.tree) {
            return Err(Error::Protocol("path secrets do not match the tree"));
        }

        // Advance the transcript and the key schedule
        next.confirmed_transcript_hash = chained_hash(
            self.suite,
            &self.interim_transcript_hash,
            &plaintext.commit_content()?,
        );
        next.advance_epoch_secrets(&self.epoch_secrets.init_secret)?;

        let confirmation = next
            .epoch_secrets
            .confirmation(&next.confirmed_transcript_hash)?;
        if confirmation.mac_value.as_slice() != commit_data.confirmation.as_slice() {
            return Err(Error::Protocol("confirmation verification failed"));
        }
        next.interim_transcript_hash = chained_hash(
            self.suite,
            &next.confirmed_transcript_hash,
            &plaintext.commit_auth_data()?,
        );

        next.pending_proposals.clear();
        next.update_secrets.clear();
        Ok(next)
    }

    /// Apply referenced proposals in the fixed order Updates, Removes,
    /// Adds. Returns the leaf positions and key packages of added
    /// members.
    fn apply_proposals(
        &mut self,
        updates: &[ProposalReference],
        removes: &[ProposalReference],
        adds: &[ProposalReference],
    ) -> Result<Vec<(LeafIndex, KeyPackage)>, Error> {
        for reference in updates {
            let (sender, proposal) = self.find_pending(reference)?;
            let update = match proposal {
                Proposal::Update(update) => update,
                _ => return Err(Error::Protocol("update reference names another kind")),
            };
            update.key_package.verify()?;
            self.forget_path_secrets(sender)?;
            self.tree.update_leaf(sender, update.key_package.clone())?;
            if sender == self.index() {
                let leaf_secret = self
                    .update_secrets
                    .get(&update.key_package.hash()?)
                    .ok_or(Error::Protocol("own update without a cached leaf secret"))?
                    .clone();
                self.tree_priv.set_leaf_secret(&leaf_secret);
            }
        }

        for reference in removes {
            let (_, proposal) = self.find_pending(reference)?;
            let remove = match proposal {
                Proposal::Remove(remove) => remove,
                _ => return Err(Error::Protocol("remove reference names another kind")),
            };
            if remove.removed.as_usize() >= self.tree.size().as_usize() {
                return Err(Error::Protocol("remove of a leaf outside the tree"));
            }
            self.forget_path_secrets(remove.removed)?;
            self.tree.blank_path(remove.removed)?;
        }
        if !removes.is_empty() {
            self.tree.truncate();
            if self.tree.size().as_u32() > 0 {
                self.tree_priv.truncate(self.tree.size());
            }
        }

        let mut joiners = Vec::new();
        for reference in adds {
            let (_, proposal) = self.find_pending(reference)?;
            let add = match proposal {
                Proposal::Add(add) => add,
                _ => return Err(Error::Protocol("add reference names another kind")),
            };
            add.key_package.verify()?;
            let index = self.tree.add_leaf(add.key_package.clone())?;
            joiners.push((index, add.key_package));
        }

        Ok(joiners)
    }

    /// Look up a referenced proposal among the pending ones.
    fn find_pending(
        &self,
        reference: &ProposalReference,
    ) -> Result<(LeafIndex, Proposal), Error> {
        for plaintext in &self.pending_proposals {
            if &ProposalReference::from_plaintext(self.suite, plaintext)? == reference {
                if let MlsPlaintextContent::Proposal(proposal) = plaintext.content() {
                    return Ok((plaintext.sender(), proposal.clone()));
                }
            }
        }
        Err(Error::Protocol("commit references an unknown proposal"))
    }

    /// Drop private path secrets for nodes about to be blanked.
    fn forget_path_secrets(&mut self, leaf: LeafIndex) -> Result<(), Error> {
        let ni = NodeIndex::from(leaf);
        self.tree_priv.erase(ni);
        for n in treemath::dirpath(ni, NodeCount::from(self.tree.nodes.len()))? {
            self.tree_priv.erase(n);
        }
        Ok(())
    }

    fn joiner_secret(&self, prev_init_secret: &InitSecret) -> Result<JoinerSecret, Error> {
        let commit_secret = CommitSecret::new(
            self.tree_priv
                .update_secret()
                .ok_or(Error::Protocol("no commit secret available"))?
                .clone(),
        );
        JoinerSecret::new(prev_init_secret, &commit_secret)
    }

    /// Derive this (already advanced) state's epoch secrets from the
    /// previous epoch's init secret and our fresh commit secret.
    fn advance_epoch_secrets(&mut self, prev_init_secret: &InitSecret) -> Result<(), Error> {
        let joiner_secret = self.joiner_secret(prev_init_secret)?;
        let member_secret = MemberSecret::new(&joiner_secret)?;
        let group_context = GroupContext::new(
            self.group_id.clone(),
            self.epoch,
            self.tree.root_hash()?,
            self.confirmed_transcript_hash.clone(),
            &self.extensions,
        );
        self.epoch_secrets =
            EpochSecrets::new(&member_secret, &group_context.tls_serialize_detached()?)?;
        self.message_secrets = MessageSecrets::new(
            self.epoch_secrets.encryption_secret.clone(),
            self.epoch_secrets.sender_data_secret.clone(),
            self.tree.size(),
        );
        Ok(())
    }

    /// Verify a handshake message's signature under the sender's leaf
    /// credential.
    fn verify_membership(&self, plaintext: &MlsPlaintext) -> Result<(), Error> {
        let sender = plaintext.sender();
        if sender.as_usize() >= self.tree.size().as_usize() {
            return Err(Error::InvalidParameter("sender outside the tree"));
        }
        let credential = self
            .tree
            .key_package(sender)
            .ok_or(Error::InvalidParameter("sender leaf is blank"))?
            .credential();
        plaintext.verify(&self.group_context()?, credential.public_key())
    }

    // === Message protection ===

    /// Encrypt application data to the group, hiding its length up to
    /// `padding_size`.
    pub fn protect(
        &mut self,
        application_data: &[u8],
        padding_size: usize,
    ) -> Result<MlsCiphertext, Error> {
        log::debug!(
            "protect in group {:?} epoch {}",
            self.group_id.as_slice(),
            self.epoch.as_u64()
        );
        let plaintext = MlsPlaintext::new_application(
            self.group_id.clone(),
            self.epoch,
            self.index(),
            &[],
            application_data,
            &self.group_context()?,
            &self.identity_priv,
        )?;
        MlsCiphertext::try_from_plaintext(&plaintext, &mut self.message_secrets, padding_size)
    }

    /// Decrypt an application message from another member and verify its
    /// signature.
    pub fn unprotect(&mut self, ciphertext: &MlsCiphertext) -> Result<Vec<u8>, Error> {
        if ciphertext.group_id() != &self.group_id {
            return Err(Error::InvalidParameter("message for another group"));
        }
        if ciphertext.epoch() != self.epoch {
            return Err(Error::StaleEpoch);
        }
        if ciphertext.content_type() != ContentType::Application {
            return Err(Error::InvalidParameter(
                "handshake messages are fed to handle",
            ));
        }

        let sender_data = ciphertext.sender_data(&self.message_secrets)?;
        if sender_data.sender.as_usize() >= self.tree.size().as_usize() {
            return Err(Error::Protocol("sender outside the tree"));
        }
        let plaintext = ciphertext.to_plaintext(
            &mut self.message_secrets,
            &self.ratchet_configuration,
            &sender_data,
        )?;
        self.verify_membership(&plaintext)?;

        match plaintext.content() {
            MlsPlaintextContent::Application(data) => Ok(data.as_slice().to_vec()),
            _ => Err(Error::Protocol("content type mismatch")),
        }
    }
}

fn chained_hash(suite: CipherSuite, previous: &[u8], content: &[u8]) -> Vec<u8> {
    let mut input = previous.to_vec();
    input.extend_from_slice(content);
    suite.hash(&input)
}
