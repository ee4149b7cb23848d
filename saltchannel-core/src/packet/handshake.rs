//! `M1`–`M4`: the mutual-authentication handshake packets.

use super::{read_array, read_u32_le, PacketType};
use crate::error::Error;

/// `ProtocolIndicator` every `M1` must carry.
pub const PROTOCOL_INDICATOR: [u8; 4] = *b"SCv2";

const SERVER_SIG_KEY_INCLUDED_BIT: u8 = 0b0000_0001;

/// `M1` — client hello: `["SCv2":4][type:u8][flags:u8][time:u32][client_enc_key:32][server_sig_key:32?]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct M1Packet {
    /// Millisecond timestamp from the client's time keeper.
    pub time: u32,
    /// The client's ephemeral X25519 public key.
    pub client_enc_key: [u8; 32],
    /// Signing public key of the server the client wants to talk to, if it
    /// wants to pin one.
    pub server_sig_key: Option<[u8; 32]>,
}

impl M1Packet {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let included = self.server_sig_key.is_some();
        let mut buf = Vec::with_capacity(4 + 1 + 1 + 4 + 32 + if included { 32 } else { 0 });
        buf.extend_from_slice(&PROTOCOL_INDICATOR);
        buf.push(PacketType::M1 as u8);
        buf.push(if included { SERVER_SIG_KEY_INCLUDED_BIT } else { 0 });
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.client_enc_key);
        if let Some(key) = self.server_sig_key {
            buf.extend_from_slice(&key);
        }
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 42 {
            return Err(Error::BadPeer("M1 too short".into()));
        }
        if buf[..4] != PROTOCOL_INDICATOR {
            return Err(Error::BadPeer(format!(
                "unexpected ProtocolIndicator: {:?}",
                &buf[..4]
            )));
        }
        PacketType::M1.expect(&buf[4..])?;
        let flags = buf[5];
        let included = flags & SERVER_SIG_KEY_INCLUDED_BIT != 0;
        let time = read_u32_le(buf, 6)?;
        let client_enc_key = read_array(buf, 10)?;
        let server_sig_key = if included {
            if buf.len() < 74 {
                return Err(Error::BadPeer("M1 missing ServerSigKey tail".into()));
            }
            Some(read_array(buf, 42)?)
        } else {
            None
        };
        Ok(Self {
            time,
            client_enc_key,
            server_sig_key,
        })
    }
}

const NO_SUCH_SERVER_BIT: u8 = 0b0000_0001;
const LAST_FLAG_BIT: u8 = 0b1000_0000;

/// `M2` — server hello: `[type:u8][flags:u8][time:u32][server_enc_key:32]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct M2Packet {
    /// Set when the server rejected the client's requested server signing
    /// key (§4.7 step 2).
    pub no_such_server: bool,
    /// Millisecond timestamp from the server's time keeper.
    pub time: u32,
    /// The server's ephemeral X25519 public key. All-zero when
    /// `no_such_server` is set — the client must not use it.
    pub server_enc_key: [u8; 32],
}

impl M2Packet {
    /// Encode to wire bytes. `NoSuchServer` implies `LastFlag` — the
    /// original reference implementation sets this automatically on encode
    /// rather than requiring the caller to remember it.
    pub fn encode(&self) -> Vec<u8> {
        let mut flags = 0u8;
        if self.no_such_server {
            flags |= NO_SUCH_SERVER_BIT | LAST_FLAG_BIT;
        }
        let mut buf = Vec::with_capacity(38);
        buf.push(PacketType::M2 as u8);
        buf.push(flags);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.server_enc_key);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 38 {
            return Err(Error::BadPeer("M2 too short".into()));
        }
        PacketType::M2.expect(buf)?;
        let flags = buf[1];
        Ok(Self {
            no_such_server: flags & NO_SUCH_SERVER_BIT != 0,
            time: read_u32_le(buf, 2)?,
            server_enc_key: read_array(buf, 6)?,
        })
    }
}

/// `M3` — server authentication: `[type:u8][reserved:u8][time:u32][server_sig_key:32][signature1:64]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct M3Packet {
    /// Millisecond timestamp.
    pub time: u32,
    /// The server's long-term Ed25519 public key.
    pub server_sig_key: [u8; 32],
    /// `Signature1`: signs `SC-SIG01 || sha512(M1) || sha512(M2)`.
    pub signature1: [u8; 64],
}

impl M3Packet {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(102);
        buf.push(PacketType::M3 as u8);
        buf.push(0);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.server_sig_key);
        buf.extend_from_slice(&self.signature1);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 102 {
            return Err(Error::BadPeer("M3 too short".into()));
        }
        PacketType::M3.expect(buf)?;
        Ok(Self {
            time: read_u32_le(buf, 2)?,
            server_sig_key: read_array(buf, 6)?,
            signature1: read_array(buf, 38)?,
        })
    }
}

/// `M4` — client authentication: `[type:u8][reserved:u8][time:u32][client_sig_key:32][signature2:64]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct M4Packet {
    /// Millisecond timestamp.
    pub time: u32,
    /// The client's long-term Ed25519 public key.
    pub client_sig_key: [u8; 32],
    /// `Signature2`: signs `SC-SIG02 || sha512(M1) || sha512(M2)`.
    pub signature2: [u8; 64],
}

impl M4Packet {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(102);
        buf.push(PacketType::M4 as u8);
        buf.push(0);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.client_sig_key);
        buf.extend_from_slice(&self.signature2);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 102 {
            return Err(Error::BadPeer("M4 too short".into()));
        }
        PacketType::M4.expect(buf)?;
        Ok(Self {
            time: read_u32_le(buf, 2)?,
            client_sig_key: read_array(buf, 6)?,
            signature2: read_array(buf, 38)?,
        })
    }
}
