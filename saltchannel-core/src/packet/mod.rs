//! Packet codec (§4.2, §6): bit-exact encode/decode for the nine wire
//! packets the core defines. Every packet is a fixed header plus, for most
//! types, a length-tagged tail — modelled here as a fixed-size struct plus
//! a `Vec<u8>`/`Vec<T>` field, not a runtime-reflected layout.
//!
//! All integers are little-endian. Reserved bits are accepted as-is on
//! decode (ingress is lenient, per the spec's "pending a strict-mode
//! option" note) and always written zero on encode.

mod a1a2;
mod app;
mod handshake;

pub use a1a2::{A1Packet, A2Packet, AddressType, Protocol};
pub use app::{AppPacket, EncryptedPacket, MultiAppPacket};
pub use handshake::{M1Packet, M2Packet, M3Packet, M4Packet};

use crate::error::Error;

/// The "SCv2" application prefix required in every A1/A2/M1/M2/M3/M4 run.
pub const SIG1_PREFIX: &[u8; 8] = b"SC-SIG01";
/// Prefix mixed into `Signature2`'s transcript.
pub const SIG2_PREFIX: &[u8; 8] = b"SC-SIG02";

/// Identifies the shape of a packet. The first byte of every header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Client hello (`M1`).
    M1 = 1,
    /// Server hello (`M2`).
    M2 = 2,
    /// Server authentication (`M3`).
    M3 = 3,
    /// Client authentication (`M4`).
    M4 = 4,
    /// A single application message.
    App = 5,
    /// An AEAD-wrapped record carrying `M3`, `M4`, `AppPacket`, or
    /// `MultiAppPacket` bytes.
    Encrypted = 6,
    /// Discovery request.
    A1 = 8,
    /// Discovery response.
    A2 = 9,
    /// Several application messages batched into one record.
    MultiApp = 11,
}

impl PacketType {
    /// Parse a type byte, or fail with `BadPeer` if it names no known
    /// packet (including the reserved resume types 7 and 10, which this
    /// core does not implement).
    pub fn from_byte(b: u8) -> Result<Self, Error> {
        Ok(match b {
            1 => Self::M1,
            2 => Self::M2,
            3 => Self::M3,
            4 => Self::M4,
            5 => Self::App,
            6 => Self::Encrypted,
            8 => Self::A1,
            9 => Self::A2,
            11 => Self::MultiApp,
            other => return Err(Error::BadPeer(format!("unknown packet type {other}"))),
        })
    }

    /// Fail with `BadPeer` unless `buf`'s first byte is exactly this type.
    pub(crate) fn expect(self, buf: &[u8]) -> Result<(), Error> {
        let got = *buf
            .first()
            .ok_or_else(|| Error::BadPeer("empty packet".into()))?;
        if got != self as u8 {
            return Err(Error::BadPeer(format!(
                "expected packet type {}, got {got}",
                self as u8
            )));
        }
        Ok(())
    }
}

pub(crate) fn read_u16_le(buf: &[u8], at: usize) -> Result<u16, Error> {
    let slice = buf
        .get(at..at + 2)
        .ok_or_else(|| Error::BadPeer("packet truncated".into()))?;
    Ok(u16::from_le_bytes(slice.try_into().unwrap()))
}

pub(crate) fn read_u32_le(buf: &[u8], at: usize) -> Result<u32, Error> {
    let slice = buf
        .get(at..at + 4)
        .ok_or_else(|| Error::BadPeer("packet truncated".into()))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

pub(crate) fn read_array<const N: usize>(buf: &[u8], at: usize) -> Result<[u8; N], Error> {
    let slice = buf
        .get(at..at + N)
        .ok_or_else(|| Error::BadPeer("packet truncated".into()))?;
    Ok(slice.try_into().unwrap())
}
