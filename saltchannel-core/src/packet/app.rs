//! `App`, `Encrypted`, and `MultiApp`: application-data and record-layer
//! packets (§4.2, §4.5).

use super::{read_u16_le, read_u32_le, PacketType};
use crate::error::Error;

/// A single, unencrypted application message: `[type:u8][reserved:u8][time:u32][data...]`.
///
/// Only ever appears wrapped inside an [`EncryptedPacket`] — the spec never
/// puts an `App` packet on the wire in the clear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppPacket {
    /// Millisecond timestamp from the sender's time keeper.
    pub time: u32,
    /// The application payload.
    pub data: Vec<u8>,
}

impl AppPacket {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6 + self.data.len());
        buf.push(PacketType::App as u8);
        buf.push(0);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 6 {
            return Err(Error::BadPeer("App too short".into()));
        }
        PacketType::App.expect(buf)?;
        Ok(Self {
            time: read_u32_le(buf, 2)?,
            data: buf[6..].to_vec(),
        })
    }
}

/// Several application messages batched into a single record: `[type:u8][reserved:u8][time:u32][count:u16][(len:u16, data:len)×count]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiAppPacket {
    /// Millisecond timestamp from the sender's time keeper.
    pub time: u32,
    /// The batched messages, in order.
    pub messages: Vec<Vec<u8>>,
}

impl MultiAppPacket {
    /// Whether a caller holding `messages` for one record should batch them
    /// as a single `MultiAppPacket` instead of one `AppPacket` per message:
    /// true when there are at least two messages, each message's own length
    /// is at most 65535 bytes, and the total encoded size is at most 65535
    /// bytes.
    pub fn should_use(messages: &[&[u8]]) -> bool {
        if messages.len() < 2 {
            return false;
        }
        if messages.iter().any(|m| m.len() > u16::MAX as usize) {
            return false;
        }
        let total: usize = messages.iter().map(|m| 2 + m.len()).sum();
        total <= u16::MAX as usize
    }

    /// Encode to wire bytes. Fails if any message is longer than 65535
    /// bytes, since its length prefix cannot represent that.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        for message in &self.messages {
            if message.len() > u16::MAX as usize {
                return Err(Error::BadPeer(format!(
                    "MultiApp message too long ({} bytes)",
                    message.len()
                )));
            }
        }
        let body_len: usize = self.messages.iter().map(|m| 2 + m.len()).sum();
        let mut buf = Vec::with_capacity(8 + body_len);
        buf.push(PacketType::MultiApp as u8);
        buf.push(0);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&(self.messages.len() as u16).to_le_bytes());
        for message in &self.messages {
            buf.extend_from_slice(&(message.len() as u16).to_le_bytes());
            buf.extend_from_slice(message);
        }
        Ok(buf)
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 8 {
            return Err(Error::BadPeer("MultiApp too short".into()));
        }
        PacketType::MultiApp.expect(buf)?;
        let time = read_u32_le(buf, 2)?;
        let count = read_u16_le(buf, 6)? as usize;
        let mut messages = Vec::with_capacity(count);
        let mut at = 8;
        for _ in 0..count {
            let size = read_u16_le(buf, at)? as usize;
            at += 2;
            let body = buf
                .get(at..at + size)
                .ok_or_else(|| Error::BadPeer("MultiApp message truncated".into()))?;
            messages.push(body.to_vec());
            at += size;
        }
        Ok(Self { time, messages })
    }
}

/// An AEAD-wrapped record: `[type:u8][flags:u8][ciphertext...]`. Flags bit 7
/// is `LastFlag`. The ciphertext always carries a 16-byte Poly1305 tag, so
/// its minimum length is 16 even for an empty plaintext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPacket {
    /// Whether the sender will write no further record in this session.
    pub last_flag: bool,
    /// `box_afternm` ciphertext, tag included.
    pub body: Vec<u8>,
}

const LAST_FLAG_BIT: u8 = 0b1000_0000;

impl EncryptedPacket {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.body.len());
        buf.push(PacketType::Encrypted as u8);
        buf.push(if self.last_flag { LAST_FLAG_BIT } else { 0 });
        buf.extend_from_slice(&self.body);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 2 {
            return Err(Error::BadPeer("Encrypted too short".into()));
        }
        PacketType::Encrypted.expect(buf)?;
        let last_flag = buf[1] & LAST_FLAG_BIT != 0;
        let body = &buf[2..];
        if body.len() < 16 {
            return Err(Error::BadPeer("Encrypted body shorter than AEAD tag".into()));
        }
        Ok(Self {
            last_flag,
            body: body.to_vec(),
        })
    }
}
