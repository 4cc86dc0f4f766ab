//! End-to-end group lifecycle scenarios: creation, joins, updates,
//! removes and message protection, checked for bit-exact agreement
//! between members.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tls_codec::{Deserialize, Serialize};

use cgka::prelude::*;

const GROUP_ID: &[u8] = &[0, 1, 2, 3];

struct TestMember {
    init_secret: Secret,
    identity_priv: cgka::ciphersuite::SignaturePrivateKey,
    key_package: KeyPackage,
}

/// Deterministic member setup: init secrets drawn from a PRG seeded with
/// 0x01, one credential per member.
fn members(suite: CipherSuite, count: usize) -> Vec<TestMember> {
    let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
    (0..count)
        .map(|i| {
            let mut seed = vec![0u8; suite.hash_length()];
            rng.fill_bytes(&mut seed);
            let init_secret = Secret::from_slice(suite, &seed);
            let bundle =
                CredentialBundle::new(format!("user{i}").as_bytes(), suite.signature_scheme())
                    .unwrap();
            let (credential, identity_priv) = bundle.into_parts();
            let key_package = KeyPackageBundle::from_leaf_secret(
                suite,
                init_secret.clone(),
                credential,
                &identity_priv,
            )
            .unwrap()
            .key_package()
            .clone();
            TestMember {
                init_secret,
                identity_priv,
                key_package,
            }
        })
        .collect()
}

fn fresh_secret(suite: CipherSuite, filler: u8) -> Secret {
    Secret::from_slice(suite, &vec![filler; suite.hash_length()])
}

fn supported_suites() -> Vec<CipherSuite> {
    vec![
        CipherSuite::X25519_SHA256_AES128GCM,
        CipherSuite::P256_AES128GCM_SHA256_P256,
        CipherSuite::X25519_SHA256_CHACHA20POLY1305,
    ]
}

/// Creator state plus the states of `count - 1` members added in a single
/// commit.
fn group_of(suite: CipherSuite, count: usize) -> (Vec<TestMember>, Vec<State>) {
    let test_members = members(suite, count);
    let mut creator = State::new(
        GroupId::from_slice(GROUP_ID),
        suite,
        test_members[0].init_secret.clone(),
        test_members[0].identity_priv.clone(),
        test_members[0].key_package.clone(),
    )
    .unwrap();

    for member in test_members.iter().skip(1) {
        let add = creator.add(&member.key_package).unwrap();
        creator.handle(&add).unwrap();
    }
    let (_, welcome, creator_next) = creator.commit(&fresh_secret(suite, 0x42)).unwrap();
    let welcome = welcome.expect("adds must produce a welcome");

    let mut states = vec![creator_next];
    for member in test_members.iter().skip(1) {
        states.push(
            State::join(
                member.init_secret.clone(),
                member.identity_priv.clone(),
                member.key_package.clone(),
                &welcome,
            )
            .unwrap(),
        );
    }
    (test_members, states)
}

fn assert_all_equal(states: &[State]) {
    for state in states.iter().skip(1) {
        assert_eq!(state, &states[0]);
    }
}

/// Every member can send to every other member.
fn assert_full_mesh(states: &mut [State]) {
    let message = hex::decode("01020304").unwrap();
    for sender in 0..states.len() {
        let encrypted = states[sender].protect(&message, 0).unwrap();
        for (receiver, state) in states.iter_mut().enumerate() {
            if receiver == sender {
                continue;
            }
            assert_eq!(state.unprotect(&encrypted).unwrap(), message);
        }
    }
}

#[test]
fn two_person() {
    let suite = CipherSuite::P256_AES128GCM_SHA256_P256;
    let test_members = members(suite, 2);

    // Initialize the creator's state
    let mut first = State::new(
        GroupId::from_slice(GROUP_ID),
        suite,
        test_members[0].init_secret.clone(),
        test_members[0].identity_priv.clone(),
        test_members[0].key_package.clone(),
    )
    .unwrap();
    assert_eq!(first.epoch().as_u64(), 0);

    // Create and handle an Add proposal for the new participant
    let add = first.add(&test_members[1].key_package).unwrap();
    first.handle(&add).unwrap();

    let (_commit, welcome, mut first_next) =
        first.commit(&fresh_secret(suite, 0x42)).unwrap();
    assert_eq!(first_next.epoch().as_u64(), 1);

    // Initialize the second participant from the Welcome
    let mut second = State::join(
        test_members[1].init_secret.clone(),
        test_members[1].identity_priv.clone(),
        test_members[1].key_package.clone(),
        &welcome.unwrap(),
    )
    .unwrap();
    assert_eq!(first_next, second);

    // Verify that they can exchange protected messages
    let message = hex::decode("01020304").unwrap();
    let encrypted = first_next.protect(&message, 0).unwrap();
    assert_eq!(second.unprotect(&encrypted).unwrap(), message);
}

#[test]
fn single_commit_add_all() {
    for suite in supported_suites() {
        let (_, mut states) = group_of(suite, 5);
        assert_all_equal(&states);
        assert_full_mesh(&mut states);

        // Exported secrets agree across members and separate by label.
        let exported = states[0].export_secret("session id", b"ctx", 32).unwrap();
        for state in &states[1..] {
            assert_eq!(state.export_secret("session id", b"ctx", 32).unwrap(), exported);
        }
        assert_ne!(
            states[0].export_secret("other label", b"ctx", 32).unwrap(),
            exported
        );
    }
}

#[test]
fn sequential_joins() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let test_members = members(suite, 5);
    let mut states = vec![State::new(
        GroupId::from_slice(GROUP_ID),
        suite,
        test_members[0].init_secret.clone(),
        test_members[0].identity_priv.clone(),
        test_members[0].key_package.clone(),
    )
    .unwrap()];

    // Each participant invites the next
    for i in 1..test_members.len() {
        let sender = i - 1;
        let add = states[sender].add(&test_members[i].key_package).unwrap();
        states[sender].handle(&add).unwrap();
        let (commit, welcome, new_state) =
            states[sender].commit(&fresh_secret(suite, i as u8)).unwrap();

        for (j, state) in states.iter_mut().enumerate() {
            if j != sender {
                state.handle(&add).unwrap();
                *state = state.handle(&commit).unwrap().expect("commit yields a state");
            }
        }
        states[sender] = new_state;
        states.push(
            State::join(
                test_members[i].init_secret.clone(),
                test_members[i].identity_priv.clone(),
                test_members[i].key_package.clone(),
                &welcome.unwrap(),
            )
            .unwrap(),
        );

        assert_all_equal(&states);
        assert_full_mesh(&mut states);
    }
}

#[test]
fn update_rotates_leaf_keys() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let (_, mut states) = group_of(suite, 5);

    for i in 0..states.len() {
        let old_init_key = states[i]
            .tree()
            .key_package(LeafIndex::from(i as u32))
            .unwrap()
            .hpke_init_key()
            .clone();

        let new_leaf = fresh_secret(suite, 0x80 + i as u8);
        let update = states[i].update(new_leaf.clone()).unwrap();
        states[i].handle(&update).unwrap();
        let (commit, _, new_state) = states[i].commit(&new_leaf).unwrap();

        for (j, state) in states.iter_mut().enumerate() {
            if j != i {
                state.handle(&update).unwrap();
                *state = state.handle(&commit).unwrap().expect("commit yields a state");
            }
        }
        states[i] = new_state;

        assert_all_equal(&states);
        // The rotated leaf no longer exposes its old HPKE key.
        let current = states[0]
            .tree()
            .key_package(LeafIndex::from(i as u32))
            .unwrap()
            .hpke_init_key()
            .clone();
        assert_ne!(current, old_init_key);
    }
}

#[test]
fn remove_shrinks_the_tree() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let (_, mut states) = group_of(suite, 5);

    // Member 3 removes member 4, then member 2 removes member 3, and so
    // on down to a two-member group.
    for i in (1..=3usize).rev() {
        let remove = states[i].remove(LeafIndex::from((i + 1) as u32)).unwrap();
        states[i].handle(&remove).unwrap();
        let (commit, _, new_state) = states[i].commit(&fresh_secret(suite, i as u8)).unwrap();

        states.pop();
        for (j, state) in states.iter_mut().enumerate() {
            if j != i {
                state.handle(&remove).unwrap();
                *state = state.handle(&commit).unwrap().expect("commit yields a state");
            }
        }
        states[i] = new_state;

        assert_all_equal(&states);
        // The tree is truncated so that its last leaf is non-blank.
        let last = LeafIndex::from((states[0].tree().size().as_u32()) - 1);
        assert_eq!(states[0].tree().size().as_usize(), i + 1);
        assert!(states[0].tree().key_package(last).is_some());
        assert_full_mesh(&mut states);
    }
}

#[test]
fn removed_member_cannot_follow_the_group() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let (_, mut states) = group_of(suite, 5);
    let old_auth_secret = states[0].authentication_secret();

    let remove = states[0].remove(LeafIndex::from(4u32)).unwrap();
    states[0].handle(&remove).unwrap();
    let (commit, _, new_state) = states[0].commit(&fresh_secret(suite, 0x77)).unwrap();

    // The evicted member cannot derive the new epoch.
    let mut evicted = states.pop().unwrap();
    evicted.handle(&remove).unwrap();
    assert!(evicted.handle(&commit).is_err());

    states[0] = new_state;
    for state in states.iter_mut().skip(1) {
        state.handle(&remove).unwrap();
        *state = state.handle(&commit).unwrap().unwrap();
    }
    assert_all_equal(&states);

    // The new epoch secret is fresh with respect to the evicted member's
    // view.
    assert_ne!(states[0].authentication_secret(), old_auth_secret);
    assert_eq!(evicted.authentication_secret(), old_auth_secret);

    // Messages of the new epoch are stale for the evicted member.
    let encrypted = states[0].protect(b"post-remove", 0).unwrap();
    assert_eq!(evicted.unprotect(&encrypted).unwrap_err(), Error::StaleEpoch);
}

#[test]
fn out_of_order_application_messages() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let (_, mut states) = group_of(suite, 3);

    let message = hex::decode("01020304").unwrap();
    let encrypted: Vec<_> = (0..3)
        .map(|_| states[0].protect(&message, 0).unwrap())
        .collect();

    // A window of three generations tolerates delivery order (2, 0, 1).
    let mut wide = states[1].clone();
    wide.set_ratchet_configuration(SenderRatchetConfiguration::new(3, 1000));
    for index in [2usize, 0, 1] {
        assert_eq!(wide.unprotect(&encrypted[index]).unwrap(), message);
    }

    // A narrower window rejects the oldest message but still decrypts
    // later in-order ones.
    let mut narrow = states[2].clone();
    narrow.set_ratchet_configuration(SenderRatchetConfiguration::new(2, 1000));
    assert_eq!(narrow.unprotect(&encrypted[2]).unwrap(), message);
    assert_eq!(
        narrow.unprotect(&encrypted[0]).unwrap_err(),
        Error::StaleGeneration
    );
    assert_eq!(narrow.unprotect(&encrypted[1]).unwrap(), message);
}

#[test]
fn padded_messages_round_trip_and_hide_length() {
    let suite = CipherSuite::X25519_SHA256_CHACHA20POLY1305;
    let (_, mut states) = group_of(suite, 2);

    let short = states[0].protect(b"hi", 64).unwrap();
    let long = states[0].protect(b"a somewhat longer payload", 64).unwrap();
    let short_encoded = short.tls_serialize_detached().unwrap();
    let long_encoded = long.tls_serialize_detached().unwrap();
    assert_eq!(short_encoded.len(), long_encoded.len());

    assert_eq!(states[1].unprotect(&short).unwrap(), b"hi");
    assert_eq!(
        states[1].unprotect(&long).unwrap(),
        b"a somewhat longer payload"
    );
}

#[test]
fn handshake_and_welcome_encodings_round_trip() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let test_members = members(suite, 3);
    let mut creator = State::new(
        GroupId::from_slice(GROUP_ID),
        suite,
        test_members[0].init_secret.clone(),
        test_members[0].identity_priv.clone(),
        test_members[0].key_package.clone(),
    )
    .unwrap();

    let add = creator.add(&test_members[1].key_package).unwrap();
    let add_encoded = add.tls_serialize_detached().unwrap();
    let add_decoded = MlsPlaintext::tls_deserialize(&mut add_encoded.as_slice()).unwrap();
    assert_eq!(add, add_decoded);
    creator.handle(&add_decoded).unwrap();

    let (commit, welcome, _) = creator.commit(&fresh_secret(suite, 5)).unwrap();
    let commit_encoded = commit.tls_serialize_detached().unwrap();
    let commit_decoded =
        MlsPlaintext::tls_deserialize(&mut commit_encoded.as_slice()).unwrap();
    assert_eq!(commit, commit_decoded);

    let welcome = welcome.unwrap();
    let welcome_encoded = welcome.tls_serialize_detached().unwrap();
    let welcome_decoded = Welcome::tls_deserialize(&mut welcome_encoded.as_slice()).unwrap();
    assert_eq!(welcome, welcome_decoded);

    // A joiner can enter through the re-decoded welcome.
    State::join(
        test_members[1].init_secret.clone(),
        test_members[1].identity_priv.clone(),
        test_members[1].key_package.clone(),
        &welcome_decoded,
    )
    .unwrap();
}

#[test]
fn stale_and_foreign_messages_are_rejected() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM;
    let (test_members, mut states) = group_of(suite, 3);

    // A proposal from the previous epoch
    let add_old_epoch = {
        let mut detached = State::new(
            GroupId::from_slice(GROUP_ID),
            suite,
            test_members[0].init_secret.clone(),
            test_members[0].identity_priv.clone(),
            test_members[0].key_package.clone(),
        )
        .unwrap();
        detached.add(&test_members[1].key_package).unwrap()
    };
    assert_eq!(
        states[0].handle(&add_old_epoch).unwrap_err(),
        Error::StaleEpoch
    );

    // A tampered signature: flip the last byte of the encoded proposal,
    // which lands inside the signature.
    let update = states[1].update(fresh_secret(suite, 0x21)).unwrap();
    let mut encoded = update.tls_serialize_detached().unwrap();
    let last = encoded.len() - 1;
    encoded[last] ^= 0xff;
    let tampered = MlsPlaintext::tls_deserialize(&mut encoded.as_slice()).unwrap();
    assert!(states[0].handle(&tampered).is_err());
}
