//! Data-type encodings shared by every PDU body (RFC 2741 §5).

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::AgentXError;
use crate::{
    oid::Oid,
    value::{Value, ValueType, VarBind},
};

/// Maximum number of sub-identifiers in an OID (RFC 2741 §5.1).
pub const MAX_SUBIDS: usize = 128;

/// Internet prefix elided by the `prefix` byte of an encoded OID.
const INTERNET_PREFIX: [u32; 4] = [1, 3, 6, 1];

/// Number of zero bytes needed to pad `len` to a 4-byte boundary.
pub fn padding_for(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// Bounded cursor over one PDU payload.
///
/// Reads never leave the slice it was created with, so the declared payload
/// length is enforced simply by handing in the correctly sized window.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self::with_byte_order(buf, true)
    }

    pub(crate) fn with_byte_order(buf: &'a [u8], big_endian: bool) -> Self {
        Reader {
            buf,
            pos: 0,
            big_endian,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails unless the whole window has been consumed.
    pub(crate) fn finish(&self, what: &str) -> Result<(), AgentXError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AgentXError::InvalidLength(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                what
            )))
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], AgentXError> {
        if self.remaining() < n {
            return Err(AgentXError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AgentXError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), AgentXError> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, AgentXError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, AgentXError> {
        let b = self.array::<2>()?;
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, AgentXError> {
        let b = self.array::<4>()?;
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, AgentXError> {
        let b = self.array::<8>()?;
        Ok(if self.big_endian {
            u64::from_be_bytes(b)
        } else {
            u64::from_le_bytes(b)
        })
    }

    /// Octet String (§5.3): length, data, padding to 4 bytes.
    pub(crate) fn read_octet_string(&mut self) -> Result<Vec<u8>, AgentXError> {
        let len = self.read_u32()? as usize;
        if len > self.buf.len() {
            return Err(AgentXError::InvalidLength(format!(
                "octet string length {} exceeds payload of {} bytes",
                len,
                self.buf.len()
            )));
        }
        let data = self.take(len)?.to_vec();
        self.skip(padding_for(len))?;
        Ok(data)
    }

    /// Object Identifier (§5.1). A null OID decodes to `None`.
    pub(crate) fn read_oid(&mut self) -> Result<(Option<Oid>, bool), AgentXError> {
        let [n_subid, prefix, include, _reserved] = self.array::<4>()?;
        let n_subid = n_subid as usize;
        if n_subid > MAX_SUBIDS {
            return Err(AgentXError::InvalidLength(format!(
                "n_subid {} exceeds {}",
                n_subid, MAX_SUBIDS
            )));
        }

        let mut parts = Vec::with_capacity(n_subid + 5);
        if prefix != 0 {
            parts.extend_from_slice(&INTERNET_PREFIX);
            parts.push(prefix as u32);
        }
        for _ in 0..n_subid {
            parts.push(self.read_u32()?);
        }

        // Only empty `parts` can fail here, which is exactly the null OID.
        Ok((Oid::new(parts).ok(), include != 0))
    }

    /// An OID in a position where the null OID is not allowed.
    pub(crate) fn read_required_oid(&mut self, what: &str) -> Result<Oid, AgentXError> {
        match self.read_oid()? {
            (Some(oid), _) => Ok(oid),
            (None, _) => Err(AgentXError::InvalidLength(format!("null OID in {}", what))),
        }
    }

    /// Data portion of a VarBind for the given type tag.
    pub(crate) fn read_value(&mut self, tag: u16) -> Result<Value, AgentXError> {
        let value_type = ValueType::try_from(tag).map_err(AgentXError::UnknownValueType)?;
        let value = match value_type {
            ValueType::Integer => Value::Integer(self.read_u32()? as i32),
            ValueType::OctetString => Value::OctetString(self.read_octet_string()?),
            ValueType::Null => Value::Null,
            ValueType::ObjectIdentifier => {
                Value::ObjectIdentifier(self.read_required_oid("ObjectIdentifier value")?)
            }
            // 4 raw octets, already aligned
            ValueType::IpAddress => Value::IpAddress(Ipv4Addr::from(self.array::<4>()?)),
            ValueType::Counter32 => Value::Counter32(self.read_u32()?),
            ValueType::Gauge32 => Value::Gauge32(self.read_u32()?),
            ValueType::TimeTicks => Value::TimeTicks(self.read_u32()?),
            ValueType::Opaque => Value::Opaque(self.read_octet_string()?),
            ValueType::Counter64 => Value::Counter64(self.read_u64()?),
            ValueType::NoSuchObject => Value::NoSuchObject,
            ValueType::NoSuchInstance => Value::NoSuchInstance,
            ValueType::EndOfMibView => Value::EndOfMibView,
        };
        Ok(value)
    }

    /// VarBind (§5.4): type, reserved, name, data.
    pub(crate) fn read_varbind(&mut self) -> Result<VarBind, AgentXError> {
        let tag = self.read_u16()?;
        self.skip(2)?; // reserved
        let oid = self.read_required_oid("VarBind name")?;
        let value = self.read_value(tag)?;
        Ok(VarBind { oid, value })
    }

    /// VarBinds until the window is exhausted.
    pub(crate) fn read_varbind_list(&mut self) -> Result<Vec<VarBind>, AgentXError> {
        let mut varbinds = Vec::new();
        while !self.is_empty() {
            varbinds.push(self.read_varbind()?);
        }
        Ok(varbinds)
    }

    /// SearchRange (§5.2): start OID carrying the include flag, then end OID.
    pub(crate) fn read_search_range(&mut self) -> Result<SearchRange, AgentXError> {
        let (start, include) = self.read_oid()?;
        let start = start.ok_or_else(|| {
            AgentXError::InvalidLength("null start OID in SearchRange".to_string())
        })?;
        let (end, _) = self.read_oid()?;
        Ok(SearchRange {
            start,
            end,
            include,
        })
    }

    /// SearchRanges until the window is exhausted.
    pub(crate) fn read_search_range_list(&mut self) -> Result<Vec<SearchRange>, AgentXError> {
        let mut ranges = Vec::new();
        while !self.is_empty() {
            ranges.push(self.read_search_range()?);
        }
        Ok(ranges)
    }
}

/// A SearchRange as carried by Get, GetNext and GetBulk PDUs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start: Oid,
    /// `None` is the null OID: no upper bound.
    pub end: Option<Oid>,
    /// Whether `start` itself is included in the range.
    pub include: bool,
}

impl SearchRange {
    pub fn new(start: Oid, end: Oid, include: bool) -> Self {
        SearchRange {
            start,
            end: Some(end),
            include,
        }
    }

    /// A range with no upper bound.
    pub fn unbounded(start: Oid, include: bool) -> Self {
        SearchRange {
            start,
            end: None,
            include,
        }
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        encode_oid(buf, Some(&self.start), self.include)?;
        encode_oid(buf, self.end.as_ref(), false)
    }
}

/// Appends an encoded OID (§5.1). `None` encodes the null OID.
///
/// OIDs under `1.3.6.1.X` (1 <= X <= 255) use the prefix byte.
///
/// # Errors
/// `InvalidArgument` if the OID has more than [`MAX_SUBIDS`] sub-identifiers.
pub fn encode_oid(
    buf: &mut Vec<u8>,
    oid: Option<&Oid>,
    include: bool,
) -> Result<(), AgentXError> {
    let subs: &[u32] = oid.map(Oid::as_slice).unwrap_or(&[]);
    if subs.len() > MAX_SUBIDS {
        return Err(AgentXError::InvalidArgument(format!(
            "OID has {} sub-identifiers, maximum is {}",
            subs.len(),
            MAX_SUBIDS
        )));
    }

    // A fifth sub-identifier of 0 cannot be expressed: prefix 0 means "none".
    let (prefix, rest) = match subs {
        [1, 3, 6, 1, fifth, rest @ ..] if (1..=255).contains(fifth) => (*fifth as u8, rest),
        _ => (0u8, subs),
    };

    buf.reserve(4 + rest.len() * 4);
    buf.push(rest.len() as u8);
    buf.push(prefix);
    buf.push(u8::from(include));
    buf.push(0); // reserved
    for sub in rest {
        buf.extend_from_slice(&sub.to_be_bytes());
    }
    Ok(())
}

/// Decodes an OID, returning `(oid, include, bytes_consumed)`.
/// The null OID decodes to `None`.
pub fn decode_oid(buf: &[u8]) -> Result<(Option<Oid>, bool, usize), AgentXError> {
    let mut r = Reader::new(buf);
    let (oid, include) = r.read_oid()?;
    Ok((oid, include, r.position()))
}

/// Appends an Octet String (§5.3): length, data, zero padding.
pub fn encode_octet_string(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), AgentXError> {
    let len = u32::try_from(data.len()).map_err(|_| {
        AgentXError::InvalidArgument(format!("octet string of {} bytes", data.len()))
    })?;
    buf.reserve(4 + data.len() + 3);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(data);
    buf.extend(std::iter::repeat(0u8).take(padding_for(data.len())));
    Ok(())
}

/// Decodes an Octet String, returning `(data, bytes_consumed)`.
pub fn decode_octet_string(buf: &[u8]) -> Result<(Vec<u8>, usize), AgentXError> {
    let mut r = Reader::new(buf);
    let data = r.read_octet_string()?;
    Ok((data, r.position()))
}

/// Appends the data portion of a VarBind for `value`.
/// The type tag is written by [`encode_varbind`].
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), AgentXError> {
    match value {
        Value::Integer(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::OctetString(v) | Value::Opaque(v) => encode_octet_string(buf, v)?,
        Value::ObjectIdentifier(oid) => encode_oid(buf, Some(oid), false)?,
        Value::IpAddress(addr) => buf.extend_from_slice(&addr.octets()),
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
            buf.extend_from_slice(&v.to_be_bytes())
        }
        Value::Counter64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
    }
    Ok(())
}

/// Decodes the data portion of a VarBind of type `tag`,
/// returning `(value, bytes_consumed)`.
pub fn decode_value(tag: u16, buf: &[u8]) -> Result<(Value, usize), AgentXError> {
    let mut r = Reader::new(buf);
    let value = r.read_value(tag)?;
    Ok((value, r.position()))
}

/// Appends a VarBind (§5.4): type(2) reserved(2) name data.
pub fn encode_varbind(buf: &mut Vec<u8>, vb: &VarBind) -> Result<(), AgentXError> {
    buf.extend_from_slice(&vb.value.value_type().tag().to_be_bytes());
    buf.extend_from_slice(&[0, 0]); // reserved
    encode_oid(buf, Some(&vb.oid), false)?;
    encode_value(buf, &vb.value)
}

/// Decodes one VarBind, returning `(varbind, bytes_consumed)`.
pub fn decode_varbind(buf: &[u8]) -> Result<(VarBind, usize), AgentXError> {
    let mut r = Reader::new(buf);
    let vb = r.read_varbind()?;
    Ok((vb, r.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn encoded_oid(o: &Oid, include: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_oid(&mut buf, Some(o), include).unwrap();
        buf
    }

    #[test]
    fn test_oid_roundtrip_internet() {
        let o = oid("1.3.6.1.4.1.99999");
        let buf = encoded_oid(&o, false);
        let (decoded, include, consumed) = decode_oid(&buf).unwrap();
        assert_eq!(decoded, Some(o));
        assert!(!include);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_oid_prefix_compression() {
        let buf = encoded_oid(&oid("1.3.6.1.4.1.99999"), false);
        // n_subid covers only the sub-ids after the prefix: 1, 99999
        assert_eq!(&buf[..4], &[2, 4, 0, 0]);
        assert_eq!(buf.len(), 4 + 2 * 4);
    }

    #[test]
    fn test_oid_without_prefix() {
        let o = oid("1.2.3");
        let buf = encoded_oid(&o, true);
        assert_eq!(&buf[..4], &[3, 0, 1, 0]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 1]);
        let (decoded, include, _) = decode_oid(&buf).unwrap();
        assert_eq!(decoded, Some(o));
        assert!(include);
    }

    #[test]
    fn test_oid_fifth_zero_not_compressed() {
        let o = oid("1.3.6.1.0.5");
        let buf = encoded_oid(&o, false);
        assert_eq!(buf[1], 0);
        assert_eq!(decode_oid(&buf).unwrap().0, Some(o));
    }

    #[test]
    fn test_oid_fifth_too_large_not_compressed() {
        let o = oid("1.3.6.1.256.1");
        let buf = encoded_oid(&o, false);
        assert_eq!(&buf[..2], &[6, 0]);
        assert_eq!(decode_oid(&buf).unwrap().0, Some(o));
    }

    #[test]
    fn test_exact_internet_prefix() {
        // 1.3.6.1.2 is entirely prefix: n_subid 0 but not the null OID
        let o = oid("1.3.6.1.2");
        let buf = encoded_oid(&o, false);
        assert_eq!(buf, vec![0, 2, 0, 0]);
        assert_eq!(decode_oid(&buf).unwrap().0, Some(o));
    }

    #[test]
    fn test_null_oid() {
        let mut buf = Vec::new();
        encode_oid(&mut buf, None, false).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
        let (decoded, _, consumed) = decode_oid(&buf).unwrap();
        assert_eq!(decoded, None);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_oid_length_limits() {
        let parts: Vec<u32> = (1..=128).collect();
        let long = Oid::new(parts.clone()).unwrap();
        let buf = encoded_oid(&long, false);
        assert_eq!(decode_oid(&buf).unwrap().0, Some(long));

        let mut too_long = parts;
        too_long.push(129);
        let mut buf = Vec::new();
        assert!(matches!(
            encode_oid(&mut buf, Some(&Oid::new(too_long).unwrap()), false),
            Err(AgentXError::InvalidArgument(_))
        ));

        assert!(matches!(
            decode_oid(&[129, 0, 0, 0]),
            Err(AgentXError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_oid_truncated() {
        let buf = encoded_oid(&oid("1.2.3"), false);
        assert!(matches!(
            decode_oid(&buf[..buf.len() - 1]),
            Err(AgentXError::Truncated { .. })
        ));
        assert!(matches!(
            decode_oid(&buf[..3]),
            Err(AgentXError::Truncated { .. })
        ));
    }

    #[test]
    fn test_octet_string_padding() {
        let mut buf = Vec::new();
        encode_octet_string(&mut buf, b"hello").unwrap();
        // 4 length + 5 data + 3 padding
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);
        assert_eq!(&buf[9..], &[0, 0, 0]);

        let (data, consumed) = decode_octet_string(&buf).unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(consumed, 12);
    }

    #[test]
    fn test_empty_octet_string() {
        let mut buf = Vec::new();
        encode_octet_string(&mut buf, b"").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
        assert_eq!(decode_octet_string(&buf).unwrap(), (vec![], 4));
    }

    #[test]
    fn test_octet_string_length_checks() {
        // declared length larger than the whole buffer
        assert!(matches!(
            decode_octet_string(&[0, 0, 0, 200, 1, 2, 3, 4]),
            Err(AgentXError::InvalidLength(_))
        ));
        // data present, padding missing
        assert!(matches!(
            decode_octet_string(&[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']),
            Err(AgentXError::Truncated { .. })
        ));
    }

    #[test]
    fn test_varbind_layout() {
        let vb = VarBind::new(oid("1.3.6.1.4.1.99999.1"), Value::Integer(-2));
        let mut buf = Vec::new();
        encode_varbind(&mut buf, &vb).unwrap();
        // type(2) reserved(2) | oid header(4) + 2 subids | value(4)
        assert_eq!(&buf[..4], &[0, 2, 0, 0]);
        assert_eq!(&buf[4..8], &[2, 4, 0, 0]);
        assert_eq!(&buf[16..], &(-2i32).to_be_bytes());
        assert_eq!(decode_varbind(&buf).unwrap(), (vb, buf.len()));
    }

    #[test]
    fn test_ip_address_raw_octets() {
        let vb = VarBind::new(oid("1.2"), Value::IpAddress(Ipv4Addr::new(192, 168, 1, 1)));
        let mut buf = Vec::new();
        encode_varbind(&mut buf, &vb).unwrap();
        // type(2) reserved(2) | oid header(4) + 2 subids | 4 address octets
        assert_eq!(buf.len(), 4 + 12 + 4);
        assert_eq!(&buf[16..], &[192, 168, 1, 1]);
        assert_eq!(decode_varbind(&buf).unwrap(), (vb, buf.len()));
    }

    #[test]
    fn test_ip_address_short() {
        assert!(matches!(
            decode_value(ValueType::IpAddress.tag(), &[10, 0, 0]),
            Err(AgentXError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_value_tag() {
        let mut buf = vec![0, 99, 0, 0];
        encode_oid(&mut buf, Some(&oid("1.3.6.1.2.1")), false).unwrap();
        assert_eq!(
            decode_varbind(&buf),
            Err(AgentXError::UnknownValueType(99))
        );
    }

    #[test]
    fn test_value_data_sizes() {
        let cases = [
            (Value::Counter32(u32::MAX), 4),
            (Value::Counter64(u64::MAX), 8),
            (Value::Null, 0),
            (Value::EndOfMibView, 0),
            (Value::opaque(vec![1, 2, 3]), 8),
        ];
        for (value, size) in cases {
            let mut buf = Vec::new();
            encode_value(&mut buf, &value).unwrap();
            assert_eq!(buf.len(), size, "{:?}", value);
            let (decoded, consumed) = decode_value(value.value_type().tag(), &buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, size);
        }
    }

    #[test]
    fn test_search_range() {
        let range = SearchRange::new(oid("1.3.6.1.2.1"), oid("1.3.6.1.2.2"), true);
        let mut buf = Vec::new();
        range.write(&mut buf).unwrap();
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_search_range().unwrap(), range);
        assert!(r.is_empty());

        let open = SearchRange::unbounded(oid("1.3.6.1.2.1"), false);
        let mut buf = Vec::new();
        open.write(&mut buf).unwrap();
        assert_eq!(&buf[buf.len() - 4..], &[0, 0, 0, 0]);
        assert_eq!(Reader::new(&buf).read_search_range().unwrap(), open);
    }

    #[test]
    fn test_little_endian_reader() {
        let buf = [0x2a, 0, 0, 0, 0x01, 0x00];
        let mut r = Reader::with_byte_order(&buf, false);
        assert_eq!(r.read_u32().unwrap(), 42);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert!(r.finish("test").is_ok());
    }
}
