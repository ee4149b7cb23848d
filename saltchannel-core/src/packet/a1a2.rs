//! `A1`/`A2`: unauthenticated discovery packets (§4.7).

use super::{read_u16_le, PacketType};
use crate::error::Error;

const ADDRESS_TYPE_ANY: u8 = 0;
const ADDRESS_TYPE_PUBLIC_KEY: u8 = 1;

/// The address a client is asking an `A1` intermediary to look up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressType {
    /// No address specified: "any server will do".
    Any,
    /// A 32-byte Ed25519 public key.
    PublicKey([u8; 32]),
}

/// `A1` — discovery request: `[type:u8][reserved:u8][address_type:u8][addr_size:u16][address]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct A1Packet {
    /// The server this client wants to reach.
    pub address: AddressType,
}

impl A1Packet {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let (address_type, addr_bytes): (u8, &[u8]) = match &self.address {
            AddressType::Any => (ADDRESS_TYPE_ANY, &[]),
            AddressType::PublicKey(key) => (ADDRESS_TYPE_PUBLIC_KEY, key.as_slice()),
        };
        let mut buf = Vec::with_capacity(5 + addr_bytes.len());
        buf.push(PacketType::A1 as u8);
        buf.push(0);
        buf.push(address_type);
        buf.extend_from_slice(&(addr_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(addr_bytes);
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 5 {
            return Err(Error::BadPeer("A1 too short".into()));
        }
        PacketType::A1.expect(buf)?;
        let address_type = buf[2];
        let addr_size = read_u16_le(buf, 3)? as usize;
        let address_bytes = buf
            .get(5..5 + addr_size)
            .ok_or_else(|| Error::BadPeer("A1 address truncated".into()))?;
        let address = match address_type {
            ADDRESS_TYPE_ANY => {
                if addr_size != 0 {
                    return Err(Error::BadPeer("A1 AddressType::Any with nonzero size".into()));
                }
                AddressType::Any
            }
            ADDRESS_TYPE_PUBLIC_KEY => {
                if addr_size != 32 {
                    return Err(Error::BadPeer(format!(
                        "A1 PublicKey address must be 32 bytes, got {addr_size}"
                    )));
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(address_bytes);
                AddressType::PublicKey(key)
            }
            other => return Err(Error::BadPeer(format!("unknown A1 address type {other}"))),
        };
        Ok(Self { address })
    }
}

const LAST_FLAG_BIT: u8 = 0b1000_0000;
const NO_SUCH_SERVER_BIT: u8 = 0b0000_0001;

/// The fixed width of each of P1/P2 in an `A2` protocol entry.
const PROTOCOL_FIELD_LEN: usize = 10;

/// One advertised protocol stack in an `A2` response: a `(P1, P2)` pair,
/// each exactly 10 ASCII bytes matching `^[A-Za-z0-9./_-]+$`, dash-padded
/// (`-` is in the allowed class) to the fixed width. The canonical entry is
/// `("SCv2------", "----------")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocol {
    p1: String,
    p2: String,
}

impl Protocol {
    /// Build a `Protocol` entry from two unpadded names, validating charset
    /// and length and right-padding each with `-` to 10 bytes.
    pub fn new(p1: impl Into<String>, p2: impl Into<String>) -> Result<Self, Error> {
        let p1 = p1.into();
        let p2 = p2.into();
        Self::validate_field(&p1)?;
        Self::validate_field(&p2)?;
        Ok(Self { p1, p2 })
    }

    /// The default protocol entry every server advertises when it does not
    /// implement A1/A2-level protocol negotiation.
    pub fn default_entry() -> Self {
        Self {
            p1: "SCv2".to_string(),
            p2: String::new(),
        }
    }

    fn validate_field(name: &str) -> Result<(), Error> {
        if name.len() > PROTOCOL_FIELD_LEN {
            return Err(Error::BadPeer(format!(
                "protocol field must be at most {PROTOCOL_FIELD_LEN} bytes, got {}",
                name.len()
            )));
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'/' | b'_' | b'-'))
        {
            return Err(Error::BadPeer(format!("invalid protocol field {name:?}")));
        }
        Ok(())
    }

    /// `P1`, right-padded with `-` to 10 bytes.
    pub fn p1(&self) -> &str {
        &self.p1
    }

    /// `P2`, right-padded with `-` to 10 bytes.
    pub fn p2(&self) -> &str {
        &self.p2
    }

    fn encode(&self) -> [u8; PROTOCOL_FIELD_LEN * 2] {
        let mut field = [b'-'; PROTOCOL_FIELD_LEN * 2];
        field[..self.p1.len()].copy_from_slice(self.p1.as_bytes());
        field[PROTOCOL_FIELD_LEN..PROTOCOL_FIELD_LEN + self.p2.len()]
            .copy_from_slice(self.p2.as_bytes());
        field
    }

    fn decode(field: &[u8; PROTOCOL_FIELD_LEN * 2]) -> Result<Self, Error> {
        let p1 = std::str::from_utf8(&field[..PROTOCOL_FIELD_LEN])
            .map_err(|_| Error::BadPeer("protocol P1 is not UTF-8".into()))?;
        let p2 = std::str::from_utf8(&field[PROTOCOL_FIELD_LEN..])
            .map_err(|_| Error::BadPeer("protocol P2 is not UTF-8".into()))?;
        Self::validate_field(p1)?;
        Self::validate_field(p2)?;
        Ok(Self {
            p1: p1.to_string(),
            p2: p2.to_string(),
        })
    }
}

/// `A2` — discovery response: `[type:u8][flags:u8][count:i8][({P1,P2}:20)×count]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct A2Packet {
    /// Set when the server named in the `A1` request is unknown — `protocols`
    /// is then empty and the implicit `LastFlag` was already set on encode.
    pub no_such_server: bool,
    /// Advertised protocol stacks, in preference order. At most 127 entries.
    pub protocols: Vec<Protocol>,
}

impl A2Packet {
    /// Encode to wire bytes. `NoSuchServer` implies `LastFlag`, matching
    /// `M2Packet`.
    pub fn encode(&self) -> Vec<u8> {
        let mut flags = LAST_FLAG_BIT;
        if self.no_such_server {
            flags |= NO_SUCH_SERVER_BIT;
        }
        let mut buf = Vec::with_capacity(3 + self.protocols.len() * PROTOCOL_FIELD_LEN * 2);
        buf.push(PacketType::A2 as u8);
        buf.push(flags);
        buf.push(self.protocols.len() as u8);
        for protocol in &self.protocols {
            buf.extend_from_slice(&protocol.encode());
        }
        buf
    }

    /// Decode from wire bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < 3 {
            return Err(Error::BadPeer("A2 too short".into()));
        }
        PacketType::A2.expect(buf)?;
        let flags = buf[1];
        if flags & LAST_FLAG_BIT == 0 {
            return Err(Error::BadPeer("A2 LastFlag must be set".into()));
        }
        let no_such_server = flags & NO_SUCH_SERVER_BIT != 0;
        let count = buf[2] as usize;
        if count > 127 {
            return Err(Error::BadPeer("A2 count must be at most 127".into()));
        }
        if no_such_server && count != 0 {
            return Err(Error::BadPeer(
                "A2 NoSuchServer must carry zero protocols".into(),
            ));
        }
        let entry_len = PROTOCOL_FIELD_LEN * 2;
        let expected_len = 3 + count * entry_len;
        if buf.len() < expected_len {
            return Err(Error::BadPeer("A2 protocol list truncated".into()));
        }
        let mut protocols = Vec::with_capacity(count);
        for i in 0..count {
            let at = 3 + i * entry_len;
            let field: [u8; 20] = buf[at..at + entry_len]
                .try_into()
                .expect("slice has exact length");
            protocols.push(Protocol::decode(&field)?);
        }
        Ok(Self {
            no_such_server,
            protocols,
        })
    }
}
