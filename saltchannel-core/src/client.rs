//! Client session (C6, §4.6): drives the handshake and hands back a live
//! [`AppChannel`].

use saltchannel_crypto::{box_beforenm, sha512, EncryptionKeyPair, SigningKeyPair};

use crate::app_channel::AppChannel;
use crate::channel::{EncryptedChannel, Role};
use crate::error::{Error, SessionError};
use crate::packet::{
    A1Packet, A2Packet, AddressType, M1Packet, M2Packet, M3Packet, M4Packet, PacketType,
    SIG1_PREFIX, SIG2_PREFIX,
};
use crate::time::{TimeChecker, TimeKeeper};
use crate::transcript::{sign_detached, verify_detached};
use crate::transport::Transport;

/// Run the A1/A2 discovery exchange: write one `A1`, read back one `A2`.
/// A separate, shorter protocol from the M1–M4 handshake — no keys, no
/// encryption (§4.6).
pub fn discover<T: Transport>(
    transport: &mut T,
    address: AddressType,
) -> Result<A2Packet, SessionError<T::Error>> {
    let a1 = A1Packet { address }.encode();
    transport.write_message(&a1).map_err(SessionError::Transport)?;
    let raw = transport.read_message().map_err(SessionError::Transport)?;
    A2Packet::decode(&raw).map_err(SessionError::Protocol)
}

/// Run the M1→M2→M3→M4 mutual-authentication handshake as the client,
/// returning a ready-to-use application channel.
///
/// `target_server_key`, if set, is pinned into `M1.ServerSigKey` and the
/// server is required to recognize it (else the handshake fails with
/// [`Error::NoSuchServer`]).
pub fn handshake<T: Transport>(
    mut transport: T,
    sig_keys: &SigningKeyPair,
    target_server_key: Option<[u8; 32]>,
    time_keeper: &mut dyn TimeKeeper,
    time_checker: &mut dyn TimeChecker,
    buffer_m4: bool,
) -> Result<AppChannel<T>, SessionError<T::Error>> {
    let eph = EncryptionKeyPair::generate();

    let m1 = M1Packet {
        time: time_keeper.first(),
        client_enc_key: eph.public,
        server_sig_key: target_server_key,
    };
    let m1_bytes = m1.encode();
    let m1_hash = sha512(&m1_bytes);
    transport
        .write_message(&m1_bytes)
        .map_err(SessionError::Transport)?;
    log::debug!("sent M1 (target_server_key={})", target_server_key.is_some());

    let m2_bytes = transport.read_message().map_err(SessionError::Transport)?;
    let type_byte = *m2_bytes
        .first()
        .ok_or_else(|| SessionError::Protocol(Error::BadPeer("empty M2".into())))?;
    match PacketType::from_byte(type_byte).map_err(SessionError::Protocol)? {
        PacketType::M2 => {}
        PacketType::A2 => {
            return Err(SessionError::Protocol(Error::BadPeer(
                "server is in discovery-only mode (A2 received instead of M2)".into(),
            )))
        }
        other => {
            return Err(SessionError::Protocol(Error::BadPeer(format!(
                "expected M2 or A2, got packet type {}",
                other as u8
            ))))
        }
    }
    let m2 = M2Packet::decode(&m2_bytes).map_err(SessionError::Protocol)?;
    let m2_hash = sha512(&m2_bytes);
    time_checker
        .report_first(m2.time)
        .map_err(SessionError::Protocol)?;
    if m2.no_such_server {
        return Err(SessionError::Protocol(Error::NoSuchServer));
    }

    let session_key = box_beforenm(&m2.server_enc_key, &eph.secret);
    let mut channel = EncryptedChannel::new(transport, session_key, Role::Client);

    let m3_plaintext = channel.read()?;
    let m3 = M3Packet::decode(&m3_plaintext).map_err(SessionError::Protocol)?;
    time_checker.check(m3.time).map_err(SessionError::Protocol)?;
    verify_detached(
        SIG1_PREFIX,
        &m1_hash,
        &m2_hash,
        &m3.server_sig_key,
        &m3.signature1,
    )
    .map_err(SessionError::Protocol)?;
    log::debug!("verified M3 signature, server key learned");

    let m4 = M4Packet {
        time: time_keeper.now(),
        client_sig_key: sig_keys.public,
        signature2: sign_detached(SIG2_PREFIX, &m1_hash, &m2_hash, sig_keys),
    };
    let m4_bytes = m4.encode();

    let mut app = AppChannel::new(channel);
    if buffer_m4 {
        app.set_buffered_m4(m4_bytes);
    } else {
        app.write_raw(&m4_bytes)?;
    }
    Ok(app)
}
