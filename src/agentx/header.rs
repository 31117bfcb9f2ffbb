//! The fixed 20-byte AgentX PDU header (RFC 2741 §6.1).
//!
//! ```text
//! +---------------+---------------+---------------+---------------+
//! |   h.version   |    h.type     |    h.flags    |  <reserved>   |
//! +---------------+---------------+---------------+---------------+
//! |                          h.sessionID                          |
//! +---------------+---------------+---------------+---------------+
//! |                        h.transactionID                        |
//! +---------------+---------------+---------------+---------------+
//! |                          h.packetID                           |
//! +---------------+---------------+---------------+---------------+
//! |                        h.payload_length                       |
//! +---------------+---------------+---------------+---------------+
//! ```

use std::{fmt, ops};

use serde::{Deserialize, Serialize};

use super::AgentXError;

/// PDU header size in bytes.
pub const HEADER_SIZE: usize = 20;

/// AgentX protocol version.
pub const AGENTX_VERSION: u8 = 1;

/// PDU type (RFC 2741 §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PduType {
    Open = 1,
    Close = 2,
    Register = 3,
    Unregister = 4,
    Get = 5,
    GetNext = 6,
    GetBulk = 7,
    TestSet = 8,
    CommitSet = 9,
    UndoSet = 10,
    CleanupSet = 11,
    Notify = 12,
    Ping = 13,
    IndexAllocate = 14,
    IndexDeallocate = 15,
    AddAgentCaps = 16,
    RemoveAgentCaps = 17,
    Response = 18,
}

impl TryFrom<u8> for PduType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PduType::Open),
            2 => Ok(PduType::Close),
            3 => Ok(PduType::Register),
            4 => Ok(PduType::Unregister),
            5 => Ok(PduType::Get),
            6 => Ok(PduType::GetNext),
            7 => Ok(PduType::GetBulk),
            8 => Ok(PduType::TestSet),
            9 => Ok(PduType::CommitSet),
            10 => Ok(PduType::UndoSet),
            11 => Ok(PduType::CleanupSet),
            12 => Ok(PduType::Notify),
            13 => Ok(PduType::Ping),
            14 => Ok(PduType::IndexAllocate),
            15 => Ok(PduType::IndexDeallocate),
            16 => Ok(PduType::AddAgentCaps),
            17 => Ok(PduType::RemoveAgentCaps),
            18 => Ok(PduType::Response),
            other => Err(other),
        }
    }
}

impl PduType {
    /// Returns true if the payload may open with a context octet string when
    /// `NON_DEFAULT_CONTEXT` is set.
    pub fn carries_context(self) -> bool {
        !matches!(
            self,
            PduType::Open
                | PduType::Close
                | PduType::CommitSet
                | PduType::UndoSet
                | PduType::CleanupSet
                | PduType::Response
        )
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PduType::Open => "Open",
            PduType::Close => "Close",
            PduType::Register => "Register",
            PduType::Unregister => "Unregister",
            PduType::Get => "Get",
            PduType::GetNext => "GetNext",
            PduType::GetBulk => "GetBulk",
            PduType::TestSet => "TestSet",
            PduType::CommitSet => "CommitSet",
            PduType::UndoSet => "UndoSet",
            PduType::CleanupSet => "CleanupSet",
            PduType::Notify => "Notify",
            PduType::Ping => "Ping",
            PduType::IndexAllocate => "IndexAllocate",
            PduType::IndexDeallocate => "IndexDeallocate",
            PduType::AddAgentCaps => "AddAgentCaps",
            PduType::RemoveAgentCaps => "RemoveAgentCaps",
            PduType::Response => "Response",
        };
        f.write_str(name)
    }
}

/// Header flag bits (`h.flags`).
///
/// Reserved bits 5-7 are carried through unchanged when decoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PduFlags(u8);

impl PduFlags {
    pub const INSTANCE_REGISTRATION: PduFlags = PduFlags(0x01);
    pub const NEW_INDEX: PduFlags = PduFlags(0x02);
    pub const ANY_INDEX: PduFlags = PduFlags(0x04);
    pub const NON_DEFAULT_CONTEXT: PduFlags = PduFlags(0x08);
    pub const NETWORK_BYTE_ORDER: PduFlags = PduFlags(0x10);

    const NAMES: [(PduFlags, &'static str); 5] = [
        (PduFlags::INSTANCE_REGISTRATION, "INSTANCE_REGISTRATION"),
        (PduFlags::NEW_INDEX, "NEW_INDEX"),
        (PduFlags::ANY_INDEX, "ANY_INDEX"),
        (PduFlags::NON_DEFAULT_CONTEXT, "NON_DEFAULT_CONTEXT"),
        (PduFlags::NETWORK_BYTE_ORDER, "NETWORK_BYTE_ORDER"),
    ];

    pub const fn empty() -> Self {
        PduFlags(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        PduFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: PduFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: PduFlags) {
        self.0 |= other.0;
    }

    /// Sets or clears `other` depending on `value`.
    pub fn set(&mut self, other: PduFlags, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl ops::BitOr for PduFlags {
    type Output = PduFlags;

    fn bitor(self, rhs: PduFlags) -> PduFlags {
        PduFlags(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for PduFlags {
    fn bitor_assign(&mut self, rhs: PduFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PduFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "PduFlags({:#04x}", self.0)?;
        if !names.is_empty() {
            write!(f, " {}", names.join(" | "))?;
        }
        f.write_str(")")
    }
}

/// Decoded AgentX PDU header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PduHeader {
    pub version: u8,
    pub pdu_type: PduType,
    pub flags: PduFlags,
    pub session_id: u32,
    pub transaction_id: u32,
    pub packet_id: u32,
    pub payload_length: u32,
}

impl PduHeader {
    /// Creates a version 1 header in network byte order with an empty payload.
    pub fn new(
        pdu_type: PduType,
        session_id: u32,
        transaction_id: u32,
        packet_id: u32,
    ) -> Self {
        PduHeader {
            version: AGENTX_VERSION,
            pdu_type,
            flags: PduFlags::NETWORK_BYTE_ORDER,
            session_id,
            transaction_id,
            packet_id,
            payload_length: 0,
        }
    }

    pub fn with_flags(mut self, flags: PduFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_payload_length(mut self, len: u32) -> Self {
        self.payload_length = len;
        self
    }

    pub fn is_network_byte_order(&self) -> bool {
        self.flags.contains(PduFlags::NETWORK_BYTE_ORDER)
    }

    pub fn has_context(&self) -> bool {
        self.flags.contains(PduFlags::NON_DEFAULT_CONTEXT)
    }

    /// Serializes the header. Output is always network byte order, so
    /// `NETWORK_BYTE_ORDER` is forced on.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[1] = self.pdu_type as u8;
        buf[2] = (self.flags | PduFlags::NETWORK_BYTE_ORDER).bits();
        buf[3] = 0; // reserved
        buf[4..8].copy_from_slice(&self.session_id.to_be_bytes());
        buf[8..12].copy_from_slice(&self.transaction_id.to_be_bytes());
        buf[12..16].copy_from_slice(&self.packet_id.to_be_bytes());
        buf[16..20].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// # Errors
    /// `Truncated` if fewer than 20 bytes are supplied, `UnsupportedVersion`
    /// for a version other than 1, `UnknownPduType` for an unknown type byte.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, AgentXError> {
        if buf.len() < HEADER_SIZE {
            return Err(AgentXError::Truncated {
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }

        let version = buf[0];
        if version != AGENTX_VERSION {
            return Err(AgentXError::UnsupportedVersion(version));
        }
        let pdu_type = PduType::try_from(buf[1]).map_err(AgentXError::UnknownPduType)?;
        let flags = PduFlags::from_bits(buf[2]);

        let network_order = flags.contains(PduFlags::NETWORK_BYTE_ORDER);
        let field = |at: usize| {
            let bytes = [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
            if network_order {
                u32::from_be_bytes(bytes)
            } else {
                u32::from_le_bytes(bytes)
            }
        };

        if !network_order {
            log::debug!("Accepting little-endian {} PDU header", pdu_type);
        }

        Ok(PduHeader {
            version,
            pdu_type,
            flags,
            session_id: field(4),
            transaction_id: field(8),
            packet_id: field(12),
            payload_length: field(16),
        })
    }
}

/// Encodes a header. `NETWORK_BYTE_ORDER` is always set.
pub fn encode_header(
    pdu_type: PduType,
    flags: PduFlags,
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    payload_length: u32,
) -> [u8; HEADER_SIZE] {
    PduHeader::new(pdu_type, session_id, transaction_id, packet_id)
        .with_flags(flags)
        .with_payload_length(payload_length)
        .to_bytes()
}

/// Decodes an AgentX PDU header from a buffer of at least 20 bytes.
pub fn decode_header(buf: &[u8]) -> Result<PduHeader, AgentXError> {
    PduHeader::from_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = PduHeader::new(PduType::Open, 1, 2, 3).with_payload_length(100);
        let buf = header.to_bytes();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(decode_header(&buf).unwrap(), header);
    }

    #[test]
    fn test_header_layout() {
        let buf = encode_header(
            PduType::Register,
            PduFlags::NON_DEFAULT_CONTEXT,
            0x01020304,
            0x05060708,
            0x090a0b0c,
            0x10,
        );
        assert_eq!(
            buf,
            [
                1, 3, 0x18, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 0, 0, 0, 0x10
            ]
        );
    }

    #[test]
    fn test_encode_always_sets_network_byte_order() {
        let buf = PduHeader::new(PduType::Ping, 0, 0, 0)
            .with_flags(PduFlags::empty())
            .to_bytes();
        assert_eq!(buf[2], 0x10);
    }

    #[test]
    fn test_decode_short_buffer() {
        let buf = PduHeader::new(PduType::Ping, 0, 0, 0).to_bytes();
        assert_eq!(
            decode_header(&buf[..19]),
            Err(AgentXError::Truncated {
                needed: 20,
                available: 19
            })
        );
        assert!(decode_header(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_type_and_version() {
        let mut buf = PduHeader::new(PduType::Ping, 0, 0, 0).to_bytes();
        buf[1] = 19;
        assert_eq!(decode_header(&buf), Err(AgentXError::UnknownPduType(19)));
        buf[1] = 0;
        assert_eq!(decode_header(&buf), Err(AgentXError::UnknownPduType(0)));

        let mut buf = PduHeader::new(PduType::Ping, 0, 0, 0).to_bytes();
        buf[0] = 2;
        assert_eq!(decode_header(&buf), Err(AgentXError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_decode_little_endian_header() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = 1;
        buf[1] = PduType::Get as u8;
        buf[2] = 0; // NETWORK_BYTE_ORDER clear
        buf[4..8].copy_from_slice(&42u32.to_le_bytes());
        buf[8..12].copy_from_slice(&7u32.to_le_bytes());
        buf[12..16].copy_from_slice(&99u32.to_le_bytes());
        buf[16..20].copy_from_slice(&8u32.to_le_bytes());

        let header = decode_header(&buf).unwrap();
        assert!(!header.is_network_byte_order());
        assert_eq!(header.session_id, 42);
        assert_eq!(header.transaction_id, 7);
        assert_eq!(header.packet_id, 99);
        assert_eq!(header.payload_length, 8);
    }

    #[test]
    fn test_pdu_type_conversion() {
        assert_eq!(PduType::try_from(1), Ok(PduType::Open));
        assert_eq!(PduType::try_from(13), Ok(PduType::Ping));
        assert_eq!(PduType::try_from(18), Ok(PduType::Response));
        assert!(PduType::try_from(19).is_err());
        assert_eq!(PduType::GetBulk.to_string(), "GetBulk");
    }

    #[test]
    fn test_flags() {
        let mut flags = PduFlags::NETWORK_BYTE_ORDER | PduFlags::NON_DEFAULT_CONTEXT;
        assert_eq!(flags.bits(), 0x18);
        assert!(flags.contains(PduFlags::NON_DEFAULT_CONTEXT));
        flags.set(PduFlags::NON_DEFAULT_CONTEXT, false);
        assert!(!flags.contains(PduFlags::NON_DEFAULT_CONTEXT));
        flags.insert(PduFlags::ANY_INDEX);
        assert_eq!(
            format!("{:?}", flags),
            "PduFlags(0x14 ANY_INDEX | NETWORK_BYTE_ORDER)"
        );
    }
}
