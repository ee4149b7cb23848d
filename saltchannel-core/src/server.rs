//! Server session (C7, §4.7): accepts discovery or a handshake and hands
//! back a live [`AppChannel`].

use saltchannel_crypto::{box_beforenm, sha512, EncryptionKeyPair, SigningKeyPair};

use crate::app_channel::AppChannel;
use crate::channel::{EncryptedChannel, Role};
use crate::error::{Error, SessionError};
use crate::packet::{
    A1Packet, A2Packet, AddressType, M1Packet, M2Packet, M3Packet, M4Packet, PacketType, Protocol,
    SIG1_PREFIX, SIG2_PREFIX,
};
use crate::time::{TimeChecker, TimeKeeper};
use crate::transcript::{sign_detached, verify_detached};
use crate::transport::Transport;

/// The outcome of reading the first message on a fresh connection: either
/// the caller ran the discovery branch and the session is over, or a live
/// application channel is ready.
pub enum Accepted<T: Transport> {
    /// `A1` was received, `A2` was written, and the transport is done.
    Discovered,
    /// `M1` was received and the handshake completed.
    Channel(AppChannel<T>),
}

/// Accept one connection: read the first message, and either run the A1/A2
/// discovery branch or the full M1–M4 handshake (§4.7).
///
/// `buffer_m2` controls whether `M2` is sent immediately or held so it can
/// be batched into the same transport write as `M3`.
pub fn accept<T: Transport>(
    mut transport: T,
    sig_keys: &SigningKeyPair,
    time_keeper: &mut dyn TimeKeeper,
    time_checker: &mut dyn TimeChecker,
    buffer_m2: bool,
) -> Result<Accepted<T>, SessionError<T::Error>> {
    let first_bytes = transport.read_message().map_err(SessionError::Transport)?;
    let type_byte = *first_bytes
        .first()
        .ok_or_else(|| SessionError::Protocol(Error::BadPeer("empty first message".into())))?;

    match PacketType::from_byte(type_byte).map_err(SessionError::Protocol)? {
        PacketType::A1 => {
            let a1 = A1Packet::decode(&first_bytes).map_err(SessionError::Protocol)?;
            let no_such_server = match a1.address {
                AddressType::Any => false,
                AddressType::PublicKey(requested) => requested != sig_keys.public,
            };
            let a2 = if no_such_server {
                A2Packet {
                    no_such_server: true,
                    protocols: vec![],
                }
            } else {
                A2Packet {
                    no_such_server: false,
                    protocols: vec![Protocol::default_entry()],
                }
            };
            log::debug!("A1 discovery request, no_such_server={no_such_server}");
            transport
                .write_message(&a2.encode())
                .map_err(SessionError::Transport)?;
            Ok(Accepted::Discovered)
        }
        PacketType::M1 => {
            let app = run_handshake(
                transport,
                &first_bytes,
                sig_keys,
                time_keeper,
                time_checker,
                buffer_m2,
            )?;
            Ok(Accepted::Channel(app))
        }
        other => Err(SessionError::Protocol(Error::BadPeer(format!(
            "expected A1 or M1, got packet type {}",
            other as u8
        )))),
    }
}

fn run_handshake<T: Transport>(
    mut transport: T,
    m1_bytes: &[u8],
    sig_keys: &SigningKeyPair,
    time_keeper: &mut dyn TimeKeeper,
    time_checker: &mut dyn TimeChecker,
    buffer_m2: bool,
) -> Result<AppChannel<T>, SessionError<T::Error>> {
    let m1 = M1Packet::decode(m1_bytes).map_err(SessionError::Protocol)?;
    time_checker
        .report_first(m1.time)
        .map_err(SessionError::Protocol)?;
    let m1_hash = sha512(m1_bytes);

    if let Some(requested) = m1.server_sig_key {
        if requested != sig_keys.public {
            log::warn!("M1 targets an unknown server signing key, rejecting");
            let reject = M2Packet {
                no_such_server: true,
                time: 0,
                server_enc_key: [0u8; 32],
            };
            transport
                .write_message(&reject.encode())
                .map_err(SessionError::Transport)?;
            return Err(SessionError::Protocol(Error::NoSuchServer));
        }
    }

    let eph = EncryptionKeyPair::generate();
    let m2 = M2Packet {
        no_such_server: false,
        time: time_keeper.first(),
        server_enc_key: eph.public,
    };

    let m2_hash_now = if !buffer_m2 {
        let m2_bytes = m2.encode();
        transport
            .write_message(&m2_bytes)
            .map_err(SessionError::Transport)?;
        Some(sha512(&m2_bytes))
    } else {
        None
    };

    let session_key = box_beforenm(&m1.client_enc_key, &eph.secret);
    let mut channel = EncryptedChannel::new(transport, session_key, Role::Server);

    // When M2 was buffered, its Time was never sent and is only now fixed,
    // at the point M3 is about to be built — recompute m2_hash off that
    // final encoding, and stamp M3 with that *same* Time value rather than
    // a fresh `now()` call (§4.7 step 5): M2 and M3 must carry one shared
    // timestamp in the buffered case, not two different ones.
    let (m2_bytes_to_send, m2_hash, m3_time) = match m2_hash_now {
        Some(hash) => (None, hash, time_keeper.now()),
        None => {
            let bytes = m2.encode();
            let hash = sha512(&bytes);
            (Some(bytes), hash, m2.time)
        }
    };

    let m3 = M3Packet {
        time: m3_time,
        server_sig_key: sig_keys.public,
        signature1: sign_detached(SIG1_PREFIX, &m1_hash, &m2_hash, sig_keys),
    };
    let m3_bytes = m3.encode();

    match m2_bytes_to_send {
        Some(m2_bytes) => channel.write_with_leading_raw(&m2_bytes, &m3_bytes, false)?,
        None => channel.write(&[&m3_bytes], false)?,
    }

    let m4_plaintext = channel.read()?;
    let m4 = M4Packet::decode(&m4_plaintext).map_err(SessionError::Protocol)?;
    time_checker.check(m4.time).map_err(SessionError::Protocol)?;
    verify_detached(
        SIG2_PREFIX,
        &m1_hash,
        &m2_hash,
        &m4.client_sig_key,
        &m4.signature2,
    )
    .map_err(SessionError::Protocol)?;
    log::debug!("verified M4 signature, client key learned, handshake complete");

    Ok(AppChannel::new(channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SequenceTimeKeeper;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug)]
    struct ChannelClosed;
    impl std::fmt::Display for ChannelClosed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "channel closed")
        }
    }
    impl std::error::Error for ChannelClosed {}

    struct QueueTransport {
        outbound: Rc<RefCell<VecDeque<Vec<u8>>>>,
        inbound: Rc<RefCell<VecDeque<Vec<u8>>>>,
    }

    impl Transport for QueueTransport {
        type Error = ChannelClosed;
        fn write_message(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.outbound.borrow_mut().push_back(data.to_vec());
            Ok(())
        }
        fn read_message(&mut self) -> Result<Vec<u8>, Self::Error> {
            self.inbound.borrow_mut().pop_front().ok_or(ChannelClosed)
        }
    }

    #[test]
    fn a1_with_matching_pubkey_gets_default_a2() {
        let sig_keys = SigningKeyPair::generate();
        let inbound = Rc::new(RefCell::new(VecDeque::new()));
        let outbound = Rc::new(RefCell::new(VecDeque::new()));
        inbound.borrow_mut().push_back(
            A1Packet {
                address: AddressType::PublicKey(sig_keys.public),
            }
            .encode(),
        );
        let transport = QueueTransport {
            outbound: outbound.clone(),
            inbound,
        };
        let mut keeper = SequenceTimeKeeper::new();
        let mut checker = crate::time::NullTimeChecker;
        let outcome = accept(transport, &sig_keys, &mut keeper, &mut checker, false).unwrap();
        assert!(matches!(outcome, Accepted::Discovered));
        let a2 = A2Packet::decode(&outbound.borrow_mut().pop_front().unwrap()).unwrap();
        assert!(!a2.no_such_server);
        assert_eq!(a2.protocols, vec![Protocol::default_entry()]);
    }

    #[test]
    fn a1_with_wrong_pubkey_gets_no_such_server() {
        let sig_keys = SigningKeyPair::generate();
        let other = SigningKeyPair::generate();
        let inbound = Rc::new(RefCell::new(VecDeque::new()));
        let outbound = Rc::new(RefCell::new(VecDeque::new()));
        inbound.borrow_mut().push_back(
            A1Packet {
                address: AddressType::PublicKey(other.public),
            }
            .encode(),
        );
        let transport = QueueTransport {
            outbound: outbound.clone(),
            inbound,
        };
        let mut keeper = SequenceTimeKeeper::new();
        let mut checker = crate::time::NullTimeChecker;
        accept(transport, &sig_keys, &mut keeper, &mut checker, false).unwrap();
        let a2 = A2Packet::decode(&outbound.borrow_mut().pop_front().unwrap()).unwrap();
        assert!(a2.no_such_server);
        assert!(a2.protocols.is_empty());
    }
}
