//! End-to-end client/server handshake and application-channel scenarios,
//! covering the seed tests from §8.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use saltchannel_core::client;
use saltchannel_core::nonce::NonceSequence;
use saltchannel_core::packet::{
    AddressType, EncryptedPacket, M1Packet, M2Packet, M3Packet, M4Packet, SIG2_PREFIX,
};
use saltchannel_core::server::{self, Accepted};
use saltchannel_core::time::{NullTimeChecker, NullTimeKeeper, SequenceTimeKeeper};
use saltchannel_core::{Error, SessionError, Transport};
use saltchannel_crypto::{box_afternm, box_beforenm, box_open_afternm, sha512, sign};
use saltchannel_crypto::{EncryptionKeyPair, SigningKeyPair};

#[derive(Debug)]
struct ChannelClosed;
impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel closed")
    }
}
impl std::error::Error for ChannelClosed {}

/// Shared-queue transport. `read_message` polls rather than failing
/// immediately on an empty queue, since the two ends of a pair run on
/// different threads in these tests and a write is not otherwise
/// synchronized with the peer's matching read.
struct QueueTransport {
    outbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl Transport for QueueTransport {
    type Error = ChannelClosed;
    fn write_message(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.outbound.lock().unwrap().push_back(data.to_vec());
        Ok(())
    }
    fn read_message(&mut self) -> Result<Vec<u8>, Self::Error> {
        for _ in 0..5_000 {
            if let Some(message) = self.inbound.lock().unwrap().pop_front() {
                return Ok(message);
            }
            thread::sleep(Duration::from_millis(1));
        }
        Err(ChannelClosed)
    }
}

fn pair() -> (QueueTransport, QueueTransport) {
    let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
    let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
    (
        QueueTransport {
            outbound: a_to_b.clone(),
            inbound: b_to_a.clone(),
        },
        QueueTransport {
            outbound: b_to_a,
            inbound: a_to_b,
        },
    )
}

/// NaCl paper encryption key pairs (Bernstein's `crypto_box` example),
/// used here only to pin the shared-key derivation down to a concrete,
/// independently checkable value — the handshake itself always generates
/// fresh ephemeral keys.
fn hex32(s: &str) -> [u8; 32] {
    let bytes = hex_bytes(s);
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out
}

fn hex_bytes(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn nacl_paper_vectors_agree_from_either_side() {
    let a_sec = hex32("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
    let a_pub = hex32("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a");
    let b_sec = hex32("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb");
    let b_pub = hex32("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f");

    let a = EncryptionKeyPair::from_bytes(a_sec, a_pub);
    let b = EncryptionKeyPair::from_bytes(b_sec, b_pub);
    let k_ab = box_beforenm(&b.public, &a.secret);
    let k_ba = box_beforenm(&a.public, &b.secret);
    assert_eq!(k_ab, k_ba);
}

#[test]
fn fixed_keys_handshake_produces_the_documented_wire_times() {
    let (client_t, server_t) = pair();
    let client_sig = SigningKeyPair::generate();
    let server_sig = SigningKeyPair::generate();

    let server_sig_for_thread = server_sig.clone();
    let server_thread = thread::spawn(move || {
        let mut keeper = SequenceTimeKeeper::new();
        let mut checker = NullTimeChecker;
        match server::accept(server_t, &server_sig_for_thread, &mut keeper, &mut checker, false)
            .unwrap()
        {
            Accepted::Channel(mut app) => {
                let msg = app.read().unwrap();
                app.write(&mut keeper, &msg, true).unwrap();
            }
            Accepted::Discovered => panic!("expected a handshake, not discovery"),
        }
    });

    let mut keeper = SequenceTimeKeeper::new();
    let mut checker = NullTimeChecker;
    let mut app = client::handshake(client_t, &client_sig, None, &mut keeper, &mut checker, false)
        .unwrap();
    app.write(&mut keeper, b"ping", false).unwrap();
    let echoed = app.read().unwrap();
    assert_eq!(echoed, b"ping");
    assert!(app.last_flag());

    server_thread.join().unwrap();
}

#[test]
fn echo_one_app_packet_then_one_multi_app_packet() {
    let (client_t, server_t) = pair();
    let client_sig = SigningKeyPair::generate();
    let server_sig = SigningKeyPair::generate();

    let server_sig_for_thread = server_sig.clone();
    let server_thread = thread::spawn(move || {
        let mut keeper = NullTimeKeeper;
        let mut checker = NullTimeChecker;
        match server::accept(server_t, &server_sig_for_thread, &mut keeper, &mut checker, false)
            .unwrap()
        {
            Accepted::Channel(mut app) => {
                let first = app.read().unwrap();
                app.write(&mut keeper, &first, false).unwrap();
                let second = app.read().unwrap();
                let third = app.read().unwrap();
                app.write_multi(&mut keeper, &[&second, &third], true).unwrap();
            }
            Accepted::Discovered => panic!("expected a handshake, not discovery"),
        }
    });

    let mut keeper = NullTimeKeeper;
    let mut checker = NullTimeChecker;
    let mut app = client::handshake(client_t, &client_sig, None, &mut keeper, &mut checker, false)
        .unwrap();

    app.write(&mut keeper, &[0x01, 0x05, 0x05, 0x05, 0x05, 0x05], false)
        .unwrap();
    assert_eq!(app.read().unwrap(), vec![0x01, 0x05, 0x05, 0x05, 0x05, 0x05]);

    app.write_multi(
        &mut keeper,
        &[&[0x01, 0x04, 0x04, 0x04, 0x04], &[0x03, 0x03, 0x03, 0x03]],
        true,
    )
    .unwrap();
    assert_eq!(app.read().unwrap(), vec![0x01, 0x04, 0x04, 0x04, 0x04]);
    assert_eq!(app.read().unwrap(), vec![0x03, 0x03, 0x03, 0x03]);
    assert!(app.last_flag());

    server_thread.join().unwrap();
}

#[test]
fn a1_to_a2_discovery_with_matching_pubkey_address() {
    let (mut client_t, server_t) = pair();
    let server_sig = SigningKeyPair::generate();
    let server_sig_for_thread = server_sig.clone();
    let server_thread = thread::spawn(move || {
        let mut keeper = NullTimeKeeper;
        let mut checker = NullTimeChecker;
        match server::accept(server_t, &server_sig_for_thread, &mut keeper, &mut checker, false)
            .unwrap()
        {
            Accepted::Discovered => {}
            Accepted::Channel(_) => panic!("expected discovery"),
        }
    });

    let a2 = client::discover(
        &mut client_t,
        AddressType::PublicKey(server_sig.public),
    )
    .unwrap();
    assert!(!a2.no_such_server);

    server_thread.join().unwrap();
}

#[test]
fn a1_to_a2_discovery_with_wrong_pubkey_address() {
    let (mut client_t, server_t) = pair();
    let server_sig = SigningKeyPair::generate();
    let other_sig = SigningKeyPair::generate();
    let server_thread = thread::spawn(move || {
        let mut keeper = NullTimeKeeper;
        let mut checker = NullTimeChecker;
        server::accept(server_t, &server_sig, &mut keeper, &mut checker, false).unwrap();
    });

    let a2 = client::discover(&mut client_t, AddressType::PublicKey(other_sig.public)).unwrap();
    assert!(a2.no_such_server);
    assert!(a2.protocols.is_empty());

    server_thread.join().unwrap();
}

#[test]
fn m1_targeting_unknown_server_fails_with_no_such_server() {
    let (client_t, server_t) = pair();
    let client_sig = SigningKeyPair::generate();
    let server_sig = SigningKeyPair::generate();
    let wrong_target = SigningKeyPair::generate().public;

    let server_sig_for_thread = server_sig.clone();
    let server_thread = thread::spawn(move || {
        let mut keeper = NullTimeKeeper;
        let mut checker = NullTimeChecker;
        let result = server::accept(server_t, &server_sig_for_thread, &mut keeper, &mut checker, false);
        assert!(matches!(
            result,
            Err(SessionError::Protocol(Error::NoSuchServer))
        ));
    });

    let mut keeper = NullTimeKeeper;
    let mut checker = NullTimeChecker;
    let result = client::handshake(
        client_t,
        &client_sig,
        Some(wrong_target),
        &mut keeper,
        &mut checker,
        false,
    );
    assert!(matches!(
        result,
        Err(SessionError::Protocol(Error::NoSuchServer))
    ));

    server_thread.join().unwrap();
}

#[test]
fn buffer_m2_and_buffer_m4_optimizations_still_complete_the_handshake() {
    let (client_t, server_t) = pair();
    let client_sig = SigningKeyPair::generate();
    let server_sig = SigningKeyPair::generate();

    let server_sig_for_thread = server_sig.clone();
    let server_thread = thread::spawn(move || {
        let mut keeper = NullTimeKeeper;
        let mut checker = NullTimeChecker;
        match server::accept(server_t, &server_sig_for_thread, &mut keeper, &mut checker, true)
            .unwrap()
        {
            Accepted::Channel(mut app) => {
                let msg = app.read().unwrap();
                app.write(&mut keeper, &msg, true).unwrap();
            }
            Accepted::Discovered => panic!("expected a handshake"),
        }
    });

    let mut keeper = NullTimeKeeper;
    let mut checker = NullTimeChecker;
    let mut app = client::handshake(client_t, &client_sig, None, &mut keeper, &mut checker, true)
        .unwrap();
    app.write(&mut keeper, b"buffered", false).unwrap();
    assert_eq!(app.read().unwrap(), b"buffered");

    server_thread.join().unwrap();
}

/// Regression test for the buffered-`M2` timestamp bug: when the server
/// defers `M2` so it can be batched into the same write as `M3`, both
/// records must carry the same `Time` value. A `SequenceTimeKeeper`
/// (advances on every `first()`/`now()` call) is required to catch this —
/// `NullTimeKeeper` always reports `0` for both and cannot distinguish
/// correct from buggy behavior. Nothing in the handshake itself
/// cross-checks `M2.Time` against `M3.Time`, so this drives a hand-built
/// client against `server::accept` and inspects the wire bytes directly.
#[test]
fn buffer_m2_stamps_m2_and_m3_with_the_same_time() {
    let (client_t, server_t) = pair();
    let server_sig = SigningKeyPair::generate();
    let client_sig = SigningKeyPair::generate();
    let client_eph = EncryptionKeyPair::generate();

    let m1 = M1Packet {
        time: 1,
        client_enc_key: client_eph.public,
        server_sig_key: None,
    };
    let m1_bytes = m1.encode();
    let m1_hash = sha512(&m1_bytes);

    // Hand M1 to the server side before the server thread starts reading.
    client_t.outbound.lock().unwrap().push_back(m1_bytes.clone());

    let server_thread = thread::spawn(move || {
        let mut keeper = SequenceTimeKeeper::new();
        let mut checker = NullTimeChecker;
        server::accept(server_t, &server_sig, &mut keeper, &mut checker, true).unwrap();
    });

    // Wait for the server's batched M2+M3 write: two distinct queue entries.
    let stc = client_t.inbound.clone();
    let mut m2_bytes = None;
    let mut m3_wrapped = None;
    for _ in 0..5_000 {
        let mut q = stc.lock().unwrap();
        if q.len() >= 2 {
            m2_bytes = q.pop_front();
            m3_wrapped = q.pop_front();
            break;
        }
        drop(q);
        thread::sleep(Duration::from_millis(1));
    }
    let m2_bytes = m2_bytes.expect("M2 never arrived");
    let m3_wrapped = m3_wrapped.expect("M3 never arrived");

    let m2 = M2Packet::decode(&m2_bytes).unwrap();
    let m2_hash = sha512(&m2_bytes);

    let session_key = box_beforenm(&m2.server_enc_key, &client_eph.secret);
    let m3_packet = EncryptedPacket::decode(&m3_wrapped).unwrap();
    let read_nonce = NonceSequence::starting_at(2).current(); // client reads start at 2
    let m3_plain = box_open_afternm(&m3_packet.body, &read_nonce, &session_key).unwrap();
    let m3 = M3Packet::decode(&m3_plain).unwrap();

    assert_eq!(
        m2.time, m3.time,
        "buffered M2 and M3 must carry the same timestamp"
    );

    let mut transcript = Vec::with_capacity(SIG2_PREFIX.len() + 128);
    transcript.extend_from_slice(SIG2_PREFIX);
    transcript.extend_from_slice(&m1_hash);
    transcript.extend_from_slice(&m2_hash);
    let signed = sign(&transcript, &client_sig);
    let signature2: [u8; 64] = signed[signed.len() - 64..].try_into().unwrap();

    let m4 = M4Packet {
        time: 2,
        client_sig_key: client_sig.public,
        signature2,
    };
    let write_nonce = NonceSequence::starting_at(1).current(); // client writes start at 1
    let m4_ciphertext = box_afternm(&m4.encode(), &write_nonce, &session_key);
    let m4_wrapped = EncryptedPacket {
        last_flag: false,
        body: m4_ciphertext,
    }
    .encode();
    client_t.outbound.lock().unwrap().push_back(m4_wrapped);

    server_thread.join().unwrap();
}
