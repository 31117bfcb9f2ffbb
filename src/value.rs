//! SNMP SMI values and variable bindings.

use std::{fmt, net::Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::oid::Oid;

/// AgentX VarBind type tags (RFC 2741 §5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ValueType {
    Integer = 2,
    OctetString = 4,
    Null = 5,
    ObjectIdentifier = 6,
    IpAddress = 64,
    Counter32 = 65,
    Gauge32 = 66,
    TimeTicks = 67,
    Opaque = 68,
    Counter64 = 70,
    NoSuchObject = 128,
    NoSuchInstance = 129,
    EndOfMibView = 130,
}

impl TryFrom<u16> for ValueType {
    type Error = u16;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        match tag {
            2 => Ok(ValueType::Integer),
            4 => Ok(ValueType::OctetString),
            5 => Ok(ValueType::Null),
            6 => Ok(ValueType::ObjectIdentifier),
            64 => Ok(ValueType::IpAddress),
            65 => Ok(ValueType::Counter32),
            66 => Ok(ValueType::Gauge32),
            67 => Ok(ValueType::TimeTicks),
            68 => Ok(ValueType::Opaque),
            70 => Ok(ValueType::Counter64),
            128 => Ok(ValueType::NoSuchObject),
            129 => Ok(ValueType::NoSuchInstance),
            130 => Ok(ValueType::EndOfMibView),
            other => Err(other),
        }
    }
}

impl ValueType {
    /// Wire tag of this type.
    pub fn tag(self) -> u16 {
        self as u16
    }
}

/// An SNMP variable binding value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Integer(i32),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(Oid),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    pub fn integer(v: i32) -> Self {
        Value::Integer(v)
    }

    pub fn octet_string(v: impl Into<Vec<u8>>) -> Self {
        Value::OctetString(v.into())
    }

    /// OctetString holding the UTF-8 bytes of `s`.
    pub fn string(s: &str) -> Self {
        Value::OctetString(s.as_bytes().to_vec())
    }

    pub fn oid(o: Oid) -> Self {
        Value::ObjectIdentifier(o)
    }

    pub fn ip_address(addr: Ipv4Addr) -> Self {
        Value::IpAddress(addr)
    }

    pub fn counter32(v: u32) -> Self {
        Value::Counter32(v)
    }

    pub fn gauge32(v: u32) -> Self {
        Value::Gauge32(v)
    }

    pub fn timeticks(v: u32) -> Self {
        Value::TimeTicks(v)
    }

    pub fn opaque(v: impl Into<Vec<u8>>) -> Self {
        Value::Opaque(v.into())
    }

    pub fn counter64(v: u64) -> Self {
        Value::Counter64(v)
    }

    /// Returns the wire type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::OctetString(_) => ValueType::OctetString,
            Value::Null => ValueType::Null,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::IpAddress(_) => ValueType::IpAddress,
            Value::Counter32(_) => ValueType::Counter32,
            Value::Gauge32(_) => ValueType::Gauge32,
            Value::TimeTicks(_) => ValueType::TimeTicks,
            Value::Opaque(_) => ValueType::Opaque,
            Value::Counter64(_) => ValueType::Counter64,
            Value::NoSuchObject => ValueType::NoSuchObject,
            Value::NoSuchInstance => ValueType::NoSuchInstance,
            Value::EndOfMibView => ValueType::EndOfMibView,
        }
    }

    /// True for the Get-response exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Payload of an OctetString or Opaque value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) | Value::Opaque(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(v) => std::str::from_utf8(v).ok(),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(o) => Some(o),
            _ => None,
        }
    }

    /// Payload of a Counter32, Gauge32 or TimeTicks value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_counter64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "INTEGER: {}", v),
            Value::OctetString(v) => match std::str::from_utf8(v) {
                Ok(s) => write!(f, "STRING: \"{}\"", s),
                Err(_) => write!(f, "Hex-STRING: {}", hex(v)),
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(o) => write!(f, "OID: {}", o),
            Value::IpAddress(a) => write!(f, "IpAddress: {}", a),
            Value::Counter32(v) => write!(f, "Counter32: {}", v),
            Value::Gauge32(v) => write!(f, "Gauge32: {}", v),
            Value::TimeTicks(v) => write!(f, "Timeticks: ({})", v),
            Value::Opaque(v) => write!(f, "Opaque: {}", hex(v)),
            Value::Counter64(v) => write!(f, "Counter64: {}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::OctetString(v)
    }
}

impl From<Oid> for Value {
    fn from(o: Oid) -> Self {
        Value::ObjectIdentifier(o)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(addr: Ipv4Addr) -> Self {
        Value::IpAddress(addr)
    }
}

/// A variable binding (OID + value).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        VarBind { oid, value }
    }
}

impl fmt::Display for VarBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}
