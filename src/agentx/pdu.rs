//! PDU bodies (RFC 2741 §6.2) and the flag-aware encode/decode entry points.

use serde::{Deserialize, Serialize};

use super::{
    header::{PduFlags, PduHeader, PduType, HEADER_SIZE},
    wire::{encode_octet_string, encode_oid, encode_varbind, Reader, SearchRange},
    AgentXError,
};
use crate::{oid::Oid, value::VarBind};

/// Reasons carried by a Close PDU (RFC 2741 §6.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CloseReason {
    Other = 1,
    ParseError = 2,
    ProtocolError = 3,
    Timeouts = 4,
    Shutdown = 5,
    ByManager = 6,
}

impl TryFrom<u8> for CloseReason {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CloseReason::Other),
            2 => Ok(CloseReason::ParseError),
            3 => Ok(CloseReason::ProtocolError),
            4 => Ok(CloseReason::Timeouts),
            5 => Ok(CloseReason::Shutdown),
            6 => Ok(CloseReason::ByManager),
            other => Err(other),
        }
    }
}

/// `res.error` values of a Response PDU.
///
/// 1-18 are the SNMP error-status codes, 256 and up are AgentX specific
/// (RFC 2741 §6.2.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ResponseError {
    NoError = 0,
    TooBig = 1,
    NoSuchName = 2,
    BadValue = 3,
    ReadOnly = 4,
    GenErr = 5,
    NoAccess = 6,
    WrongType = 7,
    WrongLength = 8,
    WrongEncoding = 9,
    WrongValue = 10,
    NoCreation = 11,
    InconsistentValue = 12,
    ResourceUnavailable = 13,
    CommitFailed = 14,
    UndoFailed = 15,
    AuthorizationError = 16,
    NotWritable = 17,
    InconsistentName = 18,
    OpenFailed = 256,
    NotOpen = 257,
    IndexWrongType = 258,
    IndexAlreadyAllocated = 259,
    IndexNoneAvailable = 260,
    IndexNotAllocated = 261,
    UnsupportedContext = 262,
    DuplicateRegistration = 263,
    UnknownRegistration = 264,
    UnknownAgentCaps = 265,
    ParseError = 266,
    RequestDenied = 267,
    ProcessingError = 268,
}

impl ResponseError {
    const ALL: [ResponseError; 32] = [
        ResponseError::NoError,
        ResponseError::TooBig,
        ResponseError::NoSuchName,
        ResponseError::BadValue,
        ResponseError::ReadOnly,
        ResponseError::GenErr,
        ResponseError::NoAccess,
        ResponseError::WrongType,
        ResponseError::WrongLength,
        ResponseError::WrongEncoding,
        ResponseError::WrongValue,
        ResponseError::NoCreation,
        ResponseError::InconsistentValue,
        ResponseError::ResourceUnavailable,
        ResponseError::CommitFailed,
        ResponseError::UndoFailed,
        ResponseError::AuthorizationError,
        ResponseError::NotWritable,
        ResponseError::InconsistentName,
        ResponseError::OpenFailed,
        ResponseError::NotOpen,
        ResponseError::IndexWrongType,
        ResponseError::IndexAlreadyAllocated,
        ResponseError::IndexNoneAvailable,
        ResponseError::IndexNotAllocated,
        ResponseError::UnsupportedContext,
        ResponseError::DuplicateRegistration,
        ResponseError::UnknownRegistration,
        ResponseError::UnknownAgentCaps,
        ResponseError::ParseError,
        ResponseError::RequestDenied,
        ResponseError::ProcessingError,
    ];

    /// Maps a wire code to its variant, `None` for unassigned codes.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// agentx-Open-PDU. Open never carries a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPdu {
    /// Default timeout in seconds for this session, 0 for the master's default.
    pub timeout: u8,
    /// Subagent identifier; `None` encodes the null OID.
    pub id: Option<Oid>,
    pub description: Vec<u8>,
}

impl OpenPdu {
    pub fn new(timeout: u8, id: Option<Oid>, description: impl Into<Vec<u8>>) -> Self {
        OpenPdu {
            timeout,
            id,
            description: description.into(),
        }
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        buf.extend_from_slice(&[self.timeout, 0, 0, 0]);
        encode_oid(buf, self.id.as_ref(), false)?;
        encode_octet_string(buf, &self.description)
    }

    fn read(r: &mut Reader) -> Result<Self, AgentXError> {
        let timeout = r.read_u8()?;
        r.skip(3)?;
        let (id, _) = r.read_oid()?;
        let description = r.read_octet_string()?;
        r.finish("Open PDU")?;
        Ok(OpenPdu {
            timeout,
            id,
            description,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePdu {
    pub reason: CloseReason,
}

impl ClosePdu {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[self.reason as u8, 0, 0, 0]);
    }

    fn read(r: &mut Reader) -> Result<Self, AgentXError> {
        let reason = r.read_u8()?;
        let reason = CloseReason::try_from(reason).map_err(AgentXError::UnknownCloseReason)?;
        r.skip(3)?;
        r.finish("Close PDU")?;
        Ok(ClosePdu { reason })
    }
}

/// Checks `range_subid`/`upper_bound` against `subtree`.
fn validate_range(
    subtree: &Oid,
    range_subid: u8,
    upper_bound: Option<u32>,
) -> Result<(), AgentXError> {
    match (range_subid, upper_bound) {
        (0, None) => Ok(()),
        (0, Some(_)) => Err(AgentXError::InvalidArgument(
            "upper_bound given without range_subid".to_string(),
        )),
        (_, None) => Err(AgentXError::InvalidArgument(format!(
            "range_subid {} given without upper_bound",
            range_subid
        ))),
        (idx, Some(bound)) => {
            let lower = subtree
                .as_slice()
                .get(idx as usize - 1)
                .copied()
                .ok_or_else(|| {
                    AgentXError::InvalidArgument(format!(
                        "range_subid {} beyond subtree of {} sub-identifiers",
                        idx,
                        subtree.len()
                    ))
                })?;
            if bound < lower {
                return Err(AgentXError::InvalidArgument(format!(
                    "upper_bound {} below sub-identifier {}",
                    bound, lower
                )));
            }
            Ok(())
        }
    }
}

fn read_upper_bound(r: &mut Reader, range_subid: u8) -> Result<Option<u32>, AgentXError> {
    if range_subid == 0 {
        Ok(None)
    } else {
        r.read_u32().map(Some)
    }
}

/// agentx-Register-PDU.
///
/// A range registration (`range_subid` != 0) replaces the sub-identifier at
/// 1-based position `range_subid` of `subtree` with the range
/// `subtree[range_subid - 1] ..= upper_bound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPdu {
    pub context: Option<Vec<u8>>,
    pub timeout: u8,
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
    /// Encoded as the INSTANCE_REGISTRATION header flag.
    pub instance_registration: bool,
}

impl RegisterPdu {
    pub fn new(subtree: Oid, priority: u8, timeout: u8) -> Self {
        RegisterPdu {
            context: None,
            timeout,
            priority,
            range_subid: 0,
            subtree,
            upper_bound: None,
            instance_registration: false,
        }
    }

    pub fn with_context(mut self, context: impl Into<Vec<u8>>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_range(mut self, range_subid: u8, upper_bound: u32) -> Self {
        self.range_subid = range_subid;
        self.upper_bound = Some(upper_bound);
        self
    }

    pub fn with_instance_registration(mut self) -> Self {
        self.instance_registration = true;
        self
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        validate_range(&self.subtree, self.range_subid, self.upper_bound)?;
        buf.extend_from_slice(&[self.timeout, self.priority, self.range_subid, 0]);
        encode_oid(buf, Some(&self.subtree), false)?;
        if let Some(bound) = self.upper_bound {
            buf.extend_from_slice(&bound.to_be_bytes());
        }
        Ok(())
    }

    fn read(
        r: &mut Reader,
        context: Option<Vec<u8>>,
        flags: PduFlags,
    ) -> Result<Self, AgentXError> {
        let timeout = r.read_u8()?;
        let priority = r.read_u8()?;
        let range_subid = r.read_u8()?;
        r.skip(1)?;
        let subtree = r.read_required_oid("Register subtree")?;
        let upper_bound = read_upper_bound(r, range_subid)?;
        r.finish("Register PDU")?;
        Ok(RegisterPdu {
            context,
            timeout,
            priority,
            range_subid,
            subtree,
            upper_bound,
            instance_registration: flags.contains(PduFlags::INSTANCE_REGISTRATION),
        })
    }
}

/// agentx-Unregister-PDU: a Register without timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterPdu {
    pub context: Option<Vec<u8>>,
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
}

impl UnregisterPdu {
    pub fn new(subtree: Oid, priority: u8) -> Self {
        UnregisterPdu {
            context: None,
            priority,
            range_subid: 0,
            subtree,
            upper_bound: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<Vec<u8>>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_range(mut self, range_subid: u8, upper_bound: u32) -> Self {
        self.range_subid = range_subid;
        self.upper_bound = Some(upper_bound);
        self
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        validate_range(&self.subtree, self.range_subid, self.upper_bound)?;
        buf.extend_from_slice(&[0, self.priority, self.range_subid, 0]);
        encode_oid(buf, Some(&self.subtree), false)?;
        if let Some(bound) = self.upper_bound {
            buf.extend_from_slice(&bound.to_be_bytes());
        }
        Ok(())
    }

    fn read(r: &mut Reader, context: Option<Vec<u8>>) -> Result<Self, AgentXError> {
        r.skip(1)?;
        let priority = r.read_u8()?;
        let range_subid = r.read_u8()?;
        r.skip(1)?;
        let subtree = r.read_required_oid("Unregister subtree")?;
        let upper_bound = read_upper_bound(r, range_subid)?;
        r.finish("Unregister PDU")?;
        Ok(UnregisterPdu {
            context,
            priority,
            range_subid,
            subtree,
            upper_bound,
        })
    }
}

/// Body of agentx-Get-PDU and agentx-GetNext-PDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPdu {
    pub context: Option<Vec<u8>>,
    pub ranges: Vec<SearchRange>,
}

impl GetPdu {
    pub fn new(ranges: Vec<SearchRange>) -> Self {
        GetPdu {
            context: None,
            ranges,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        self.ranges.iter().try_for_each(|range| range.write(buf))
    }

    fn read(r: &mut Reader, context: Option<Vec<u8>>) -> Result<Self, AgentXError> {
        Ok(GetPdu {
            context,
            ranges: r.read_search_range_list()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBulkPdu {
    pub context: Option<Vec<u8>>,
    pub non_repeaters: u16,
    pub max_repetitions: u16,
    pub ranges: Vec<SearchRange>,
}

impl GetBulkPdu {
    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        buf.extend_from_slice(&self.non_repeaters.to_be_bytes());
        buf.extend_from_slice(&self.max_repetitions.to_be_bytes());
        self.ranges.iter().try_for_each(|range| range.write(buf))
    }

    fn read(r: &mut Reader, context: Option<Vec<u8>>) -> Result<Self, AgentXError> {
        let non_repeaters = r.read_u16()?;
        let max_repetitions = r.read_u16()?;
        Ok(GetBulkPdu {
            context,
            non_repeaters,
            max_repetitions,
            ranges: r.read_search_range_list()?,
        })
    }
}

fn write_varbinds(buf: &mut Vec<u8>, varbinds: &[VarBind]) -> Result<(), AgentXError> {
    varbinds.iter().try_for_each(|vb| encode_varbind(buf, vb))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetPdu {
    pub context: Option<Vec<u8>>,
    pub varbinds: Vec<VarBind>,
}

/// agentx-Notify-PDU. The first VarBinds are conventionally sysUpTime.0 and
/// snmpTrapOID.0; this is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyPdu {
    pub context: Option<Vec<u8>>,
    pub varbinds: Vec<VarBind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPdu {
    pub context: Option<Vec<u8>>,
}

/// Body of agentx-IndexAllocate-PDU and agentx-IndexDeallocate-PDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPdu {
    pub context: Option<Vec<u8>>,
    /// Encoded as the NEW_INDEX header flag.
    pub new_index: bool,
    /// Encoded as the ANY_INDEX header flag.
    pub any_index: bool,
    pub varbinds: Vec<VarBind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAgentCapsPdu {
    pub context: Option<Vec<u8>>,
    pub id: Oid,
    pub description: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveAgentCapsPdu {
    pub context: Option<Vec<u8>>,
    pub id: Oid,
}

/// agentx-Response-PDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePdu {
    pub sys_uptime: u32,
    /// Raw `res.error`; see [`ResponseError`].
    pub error: u16,
    /// 1-based index of the failing VarBind, 0 if none.
    pub index: u16,
    pub varbinds: Vec<VarBind>,
}

impl ResponsePdu {
    pub fn new(sys_uptime: u32, varbinds: Vec<VarBind>) -> Self {
        ResponsePdu {
            sys_uptime,
            error: 0,
            index: 0,
            varbinds,
        }
    }

    pub fn with_error(mut self, error: ResponseError, index: u16) -> Self {
        self.error = error.code();
        self.index = index;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error != 0
    }

    /// The error as a known code, `None` for unassigned values.
    pub fn error_kind(&self) -> Option<ResponseError> {
        ResponseError::from_code(self.error)
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        buf.extend_from_slice(&self.sys_uptime.to_be_bytes());
        buf.extend_from_slice(&self.error.to_be_bytes());
        buf.extend_from_slice(&self.index.to_be_bytes());
        write_varbinds(buf, &self.varbinds)
    }

    fn read(r: &mut Reader) -> Result<Self, AgentXError> {
        let sys_uptime = r.read_u32()?;
        let error = r.read_u16()?;
        let index = r.read_u16()?;
        Ok(ResponsePdu {
            sys_uptime,
            error,
            index,
            varbinds: r.read_varbind_list()?,
        })
    }
}

/// Any AgentX PDU body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pdu {
    Open(OpenPdu),
    Close(ClosePdu),
    Register(RegisterPdu),
    Unregister(UnregisterPdu),
    Get(GetPdu),
    GetNext(GetPdu),
    GetBulk(GetBulkPdu),
    TestSet(TestSetPdu),
    CommitSet,
    UndoSet,
    CleanupSet,
    Notify(NotifyPdu),
    Ping(PingPdu),
    IndexAllocate(IndexPdu),
    IndexDeallocate(IndexPdu),
    AddAgentCaps(AddAgentCapsPdu),
    RemoveAgentCaps(RemoveAgentCapsPdu),
    Response(ResponsePdu),
}

impl Pdu {
    pub fn pdu_type(&self) -> PduType {
        match self {
            Pdu::Open(_) => PduType::Open,
            Pdu::Close(_) => PduType::Close,
            Pdu::Register(_) => PduType::Register,
            Pdu::Unregister(_) => PduType::Unregister,
            Pdu::Get(_) => PduType::Get,
            Pdu::GetNext(_) => PduType::GetNext,
            Pdu::GetBulk(_) => PduType::GetBulk,
            Pdu::TestSet(_) => PduType::TestSet,
            Pdu::CommitSet => PduType::CommitSet,
            Pdu::UndoSet => PduType::UndoSet,
            Pdu::CleanupSet => PduType::CleanupSet,
            Pdu::Notify(_) => PduType::Notify,
            Pdu::Ping(_) => PduType::Ping,
            Pdu::IndexAllocate(_) => PduType::IndexAllocate,
            Pdu::IndexDeallocate(_) => PduType::IndexDeallocate,
            Pdu::AddAgentCaps(_) => PduType::AddAgentCaps,
            Pdu::RemoveAgentCaps(_) => PduType::RemoveAgentCaps,
            Pdu::Response(_) => PduType::Response,
        }
    }

    /// The non-default context, if any. An empty context is the default one.
    pub fn context(&self) -> Option<&[u8]> {
        let context = match self {
            Pdu::Register(p) => p.context.as_deref(),
            Pdu::Unregister(p) => p.context.as_deref(),
            Pdu::Get(p) | Pdu::GetNext(p) => p.context.as_deref(),
            Pdu::GetBulk(p) => p.context.as_deref(),
            Pdu::TestSet(p) => p.context.as_deref(),
            Pdu::Notify(p) => p.context.as_deref(),
            Pdu::Ping(p) => p.context.as_deref(),
            Pdu::IndexAllocate(p) | Pdu::IndexDeallocate(p) => p.context.as_deref(),
            Pdu::AddAgentCaps(p) => p.context.as_deref(),
            Pdu::RemoveAgentCaps(p) => p.context.as_deref(),
            Pdu::Open(_)
            | Pdu::Close(_)
            | Pdu::CommitSet
            | Pdu::UndoSet
            | Pdu::CleanupSet
            | Pdu::Response(_) => None,
        };
        context.filter(|c| !c.is_empty())
    }

    fn flags(&self) -> PduFlags {
        let mut flags = PduFlags::NETWORK_BYTE_ORDER;
        flags.set(PduFlags::NON_DEFAULT_CONTEXT, self.context().is_some());
        match self {
            Pdu::Register(p) => {
                flags.set(PduFlags::INSTANCE_REGISTRATION, p.instance_registration)
            }
            Pdu::IndexAllocate(p) | Pdu::IndexDeallocate(p) => {
                flags.set(PduFlags::NEW_INDEX, p.new_index);
                flags.set(PduFlags::ANY_INDEX, p.any_index);
            }
            _ => {}
        }
        flags
    }

    fn write_payload(&self, buf: &mut Vec<u8>) -> Result<(), AgentXError> {
        if let Some(context) = self.context() {
            encode_octet_string(buf, context)?;
        }
        match self {
            Pdu::Open(p) => p.write(buf),
            Pdu::Close(p) => {
                p.write(buf);
                Ok(())
            }
            Pdu::Register(p) => p.write(buf),
            Pdu::Unregister(p) => p.write(buf),
            Pdu::Get(p) | Pdu::GetNext(p) => p.write(buf),
            Pdu::GetBulk(p) => p.write(buf),
            Pdu::TestSet(p) => write_varbinds(buf, &p.varbinds),
            Pdu::Notify(p) => write_varbinds(buf, &p.varbinds),
            Pdu::IndexAllocate(p) | Pdu::IndexDeallocate(p) => {
                write_varbinds(buf, &p.varbinds)
            }
            Pdu::AddAgentCaps(p) => {
                encode_oid(buf, Some(&p.id), false)?;
                encode_octet_string(buf, &p.description)
            }
            Pdu::RemoveAgentCaps(p) => encode_oid(buf, Some(&p.id), false),
            Pdu::Response(p) => p.write(buf),
            Pdu::Ping(_) | Pdu::CommitSet | Pdu::UndoSet | Pdu::CleanupSet => Ok(()),
        }
    }
}

/// Encodes a complete PDU, header included.
///
/// Header flags are derived from the body: NETWORK_BYTE_ORDER always,
/// NON_DEFAULT_CONTEXT for a non-empty context, INSTANCE_REGISTRATION,
/// NEW_INDEX and ANY_INDEX from the matching body fields.
///
/// # Errors
/// `InvalidArgument` for inconsistent input: a malformed register range, an
/// OID longer than 128 sub-identifiers, or a payload over `u32::MAX` bytes.
pub fn encode_pdu(
    pdu: &Pdu,
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
) -> Result<Vec<u8>, AgentXError> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + 64);
    buf.resize(HEADER_SIZE, 0);
    pdu.write_payload(&mut buf)?;

    let payload_length = u32::try_from(buf.len() - HEADER_SIZE).map_err(|_| {
        AgentXError::InvalidArgument(format!("payload of {} bytes", buf.len() - HEADER_SIZE))
    })?;
    let header = PduHeader::new(pdu.pdu_type(), session_id, transaction_id, packet_id)
        .with_flags(pdu.flags())
        .with_payload_length(payload_length);
    buf[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

    log::trace!(
        "Encoded {} PDU session={} transaction={} packet={} payload={}B",
        header.pdu_type,
        session_id,
        transaction_id,
        packet_id,
        payload_length
    );
    Ok(buf)
}

/// Decodes the payload belonging to `header`.
///
/// Only the first `header.payload_length` bytes of `payload` are read. The
/// context, byte order and flag-carried fields are taken from the header.
///
/// # Errors
/// `Truncated` if `payload` is shorter than declared or an element runs past
/// the declared length, `InvalidLength` for impossible lengths or trailing
/// bytes, and the unknown-tag errors for unrecognised close reasons or value
/// types.
pub fn decode_pdu(header: &PduHeader, payload: &[u8]) -> Result<Pdu, AgentXError> {
    let declared = header.payload_length as usize;
    if payload.len() < declared {
        return Err(AgentXError::Truncated {
            needed: declared,
            available: payload.len(),
        });
    }

    let mut r = Reader::with_byte_order(&payload[..declared], header.is_network_byte_order());
    let context = if header.has_context() && header.pdu_type.carries_context() {
        let context = r.read_octet_string()?;
        log::debug!(
            "{} PDU in context {:?}",
            header.pdu_type,
            String::from_utf8_lossy(&context)
        );
        Some(context)
    } else {
        None
    };

    let pdu = match header.pdu_type {
        PduType::Open => Pdu::Open(OpenPdu::read(&mut r)?),
        PduType::Close => Pdu::Close(ClosePdu::read(&mut r)?),
        PduType::Register => Pdu::Register(RegisterPdu::read(&mut r, context, header.flags)?),
        PduType::Unregister => Pdu::Unregister(UnregisterPdu::read(&mut r, context)?),
        PduType::Get => Pdu::Get(GetPdu::read(&mut r, context)?),
        PduType::GetNext => Pdu::GetNext(GetPdu::read(&mut r, context)?),
        PduType::GetBulk => Pdu::GetBulk(GetBulkPdu::read(&mut r, context)?),
        PduType::TestSet => Pdu::TestSet(TestSetPdu {
            context,
            varbinds: r.read_varbind_list()?,
        }),
        PduType::CommitSet => header_only(&r, Pdu::CommitSet)?,
        PduType::UndoSet => header_only(&r, Pdu::UndoSet)?,
        PduType::CleanupSet => header_only(&r, Pdu::CleanupSet)?,
        PduType::Notify => Pdu::Notify(NotifyPdu {
            context,
            varbinds: r.read_varbind_list()?,
        }),
        PduType::Ping => header_only(&r, Pdu::Ping(PingPdu { context }))?,
        PduType::IndexAllocate => {
            Pdu::IndexAllocate(read_index(&mut r, context, header.flags)?)
        }
        PduType::IndexDeallocate => {
            Pdu::IndexDeallocate(read_index(&mut r, context, header.flags)?)
        }
        PduType::AddAgentCaps => {
            let id = r.read_required_oid("AddAgentCaps id")?;
            let description = r.read_octet_string()?;
            r.finish("AddAgentCaps PDU")?;
            Pdu::AddAgentCaps(AddAgentCapsPdu {
                context,
                id,
                description,
            })
        }
        PduType::RemoveAgentCaps => {
            let id = r.read_required_oid("RemoveAgentCaps id")?;
            r.finish("RemoveAgentCaps PDU")?;
            Pdu::RemoveAgentCaps(RemoveAgentCapsPdu { context, id })
        }
        PduType::Response => Pdu::Response(ResponsePdu::read(&mut r)?),
    };

    log::trace!(
        "Decoded {} PDU session={} transaction={} packet={} payload={}B",
        header.pdu_type,
        header.session_id,
        header.transaction_id,
        header.packet_id,
        declared
    );
    Ok(pdu)
}

fn header_only(r: &Reader, pdu: Pdu) -> Result<Pdu, AgentXError> {
    r.finish("header-only PDU")?;
    Ok(pdu)
}

fn read_index(
    r: &mut Reader,
    context: Option<Vec<u8>>,
    flags: PduFlags,
) -> Result<IndexPdu, AgentXError> {
    Ok(IndexPdu {
        context,
        new_index: flags.contains(PduFlags::NEW_INDEX),
        any_index: flags.contains(PduFlags::ANY_INDEX),
        varbinds: r.read_varbind_list()?,
    })
}

/// Splits one PDU off the front of a byte stream.
///
/// Returns the decoded header, its payload and the bytes that follow it.
pub fn split_frame(buf: &[u8]) -> Result<(PduHeader, &[u8], &[u8]), AgentXError> {
    let header = PduHeader::from_bytes(buf)?;
    let body = &buf[HEADER_SIZE..];
    let declared = header.payload_length as usize;
    if body.len() < declared {
        return Err(AgentXError::Truncated {
            needed: declared,
            available: body.len(),
        });
    }
    let (payload, rest) = body.split_at(declared);
    Ok((header, payload, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn roundtrip(pdu: &Pdu) -> (PduHeader, Pdu) {
        let buf = encode_pdu(pdu, 1, 2, 3).unwrap();
        let (header, payload, rest) = split_frame(&buf).unwrap();
        assert!(rest.is_empty());
        let decoded = decode_pdu(&header, payload).unwrap();
        (header, decoded)
    }

    #[test]
    fn test_open_roundtrip() {
        let pdu = Pdu::Open(OpenPdu::new(
            30,
            Some(oid("1.3.6.1.4.1.99999")),
            "test agent",
        ));
        let (header, decoded) = roundtrip(&pdu);
        assert_eq!(header.pdu_type, PduType::Open);
        assert!(!header.has_context());
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn test_open_null_id() {
        let pdu = Pdu::Open(OpenPdu::new(0, None, ""));
        let buf = encode_pdu(&pdu, 0, 0, 0).unwrap();
        // timeout block + null OID + empty description
        assert_eq!(buf.len(), HEADER_SIZE + 12);
        assert_eq!(roundtrip(&pdu).1, pdu);
    }

    #[test]
    fn test_close_reasons() {
        for reason in [CloseReason::Other, CloseReason::Shutdown, CloseReason::ByManager] {
            let pdu = Pdu::Close(ClosePdu { reason });
            assert_eq!(roundtrip(&pdu).1, pdu);
        }

        let header = PduHeader::new(PduType::Close, 0, 0, 0).with_payload_length(4);
        assert_eq!(
            decode_pdu(&header, &[9, 0, 0, 0]),
            Err(AgentXError::UnknownCloseReason(9))
        );
    }

    #[test]
    fn test_register_with_context_and_range() {
        let pdu = Pdu::Register(
            RegisterPdu::new(oid("1.3.6.1.2.1.2.2.1.1.7"), 127, 0)
                .with_context("ctx")
                .with_range(11, 22)
                .with_instance_registration(),
        );
        let (header, decoded) = roundtrip(&pdu);
        assert!(header.has_context());
        assert!(header.flags.contains(PduFlags::INSTANCE_REGISTRATION));
        assert_eq!(decoded, pdu);
        assert_eq!(decoded.context(), Some(&b"ctx"[..]));
    }

    #[test]
    fn test_register_empty_context_is_default() {
        let pdu =
            Pdu::Register(RegisterPdu::new(oid("1.3.6.1.4.1.1"), 127, 0).with_context(""));
        let buf = encode_pdu(&pdu, 0, 0, 0).unwrap();
        assert_eq!(buf[2] & PduFlags::NON_DEFAULT_CONTEXT.bits(), 0);
        assert_eq!(pdu.context(), None);
    }

    #[test]
    fn test_register_range_validation() {
        let subtree = oid("1.3.6.1.2.1.2.2.1.1.7");
        let reject = |pdu: RegisterPdu| {
            assert!(matches!(
                encode_pdu(&Pdu::Register(pdu), 0, 0, 0),
                Err(AgentXError::InvalidArgument(_))
            ));
        };

        let mut missing_bound = RegisterPdu::new(subtree.clone(), 127, 0);
        missing_bound.range_subid = 11;
        reject(missing_bound);

        let mut missing_subid = RegisterPdu::new(subtree.clone(), 127, 0);
        missing_subid.upper_bound = Some(10);
        reject(missing_subid);

        reject(RegisterPdu::new(subtree.clone(), 127, 0).with_range(12, 99));
        reject(RegisterPdu::new(subtree, 127, 0).with_range(11, 6));
    }

    #[test]
    fn test_unregister_roundtrip() {
        let pdu = Pdu::Unregister(
            UnregisterPdu::new(oid("1.3.6.1.4.1.99999.1"), 100).with_range(8, 5),
        );
        assert_eq!(roundtrip(&pdu).1, pdu);
    }

    #[test]
    fn test_get_and_getnext() {
        let ranges = vec![
            SearchRange::unbounded(oid("1.3.6.1.2.1.1.1.0"), true),
            SearchRange::new(oid("1.3.6.1.2.1.2"), oid("1.3.6.1.2.1.3"), false),
        ];
        let get = Pdu::Get(GetPdu::new(ranges.clone()));
        assert_eq!(roundtrip(&get).1, get);

        let mut body = GetPdu::new(ranges);
        body.context = Some(b"public".to_vec());
        let next = Pdu::GetNext(body);
        let (header, decoded) = roundtrip(&next);
        assert!(header.has_context());
        assert_eq!(decoded, next);
    }

    #[test]
    fn test_getbulk_roundtrip() {
        let pdu = Pdu::GetBulk(GetBulkPdu {
            context: None,
            non_repeaters: 1,
            max_repetitions: 10,
            ranges: vec![SearchRange::unbounded(oid("1.3.6.1.2.1.2.2"), false)],
        });
        assert_eq!(roundtrip(&pdu).1, pdu);
    }

    #[test]
    fn test_varbind_bodies() {
        let varbinds = vec![
            VarBind::new(oid("1.3.6.1.2.1.1.3.0"), Value::timeticks(100)),
            VarBind::new(oid("1.3.6.1.6.3.1.1.4.1.0"), Value::oid(oid("1.3.6.1.4.1.1.0.1"))),
        ];
        let pdus = [
            Pdu::TestSet(TestSetPdu {
                context: None,
                varbinds: varbinds.clone(),
            }),
            Pdu::Notify(NotifyPdu {
                context: Some(b"ctx".to_vec()),
                varbinds: varbinds.clone(),
            }),
            Pdu::IndexAllocate(IndexPdu {
                context: None,
                new_index: true,
                any_index: false,
                varbinds: varbinds.clone(),
            }),
            Pdu::IndexDeallocate(IndexPdu {
                context: None,
                new_index: false,
                any_index: true,
                varbinds,
            }),
        ];
        for pdu in &pdus {
            assert_eq!(&roundtrip(pdu).1, pdu);
        }
    }

    #[test]
    fn test_header_only_pdus() {
        let pdus = [
            Pdu::CommitSet,
            Pdu::UndoSet,
            Pdu::CleanupSet,
            Pdu::Ping(PingPdu::default()),
        ];
        for pdu in pdus {
            let buf = encode_pdu(&pdu, 1, 2, 3).unwrap();
            assert_eq!(buf.len(), HEADER_SIZE);
            assert_eq!(roundtrip(&pdu).1, pdu);
        }

        let header = PduHeader::new(PduType::CommitSet, 0, 0, 0).with_payload_length(4);
        assert!(matches!(
            decode_pdu(&header, &[0, 0, 0, 0]),
            Err(AgentXError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_agent_caps() {
        let add = Pdu::AddAgentCaps(AddAgentCapsPdu {
            context: None,
            id: oid("1.3.6.1.4.1.99999.2"),
            description: b"caps".to_vec(),
        });
        assert_eq!(roundtrip(&add).1, add);

        let remove = Pdu::RemoveAgentCaps(RemoveAgentCapsPdu {
            context: Some(b"ctx".to_vec()),
            id: oid("1.3.6.1.4.1.99999.2"),
        });
        assert_eq!(roundtrip(&remove).1, remove);

        let header = PduHeader::new(PduType::RemoveAgentCaps, 0, 0, 0).with_payload_length(4);
        assert!(matches!(
            decode_pdu(&header, &[0, 0, 0, 0]),
            Err(AgentXError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_response_keeps_varbinds_on_error() {
        let pdu = Pdu::Response(
            ResponsePdu::new(
                1000,
                vec![VarBind::new(oid("1.3.6.1.2.1.1.5.0"), Value::NoSuchObject)],
            )
            .with_error(ResponseError::NotWritable, 1),
        );
        match roundtrip(&pdu).1 {
            Pdu::Response(r) => {
                assert!(r.is_error());
                assert_eq!(r.error, 17);
                assert_eq!(r.error_kind(), Some(ResponseError::NotWritable));
                assert_eq!(r.varbinds.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_response_error_codes() {
        assert_eq!(ResponseError::from_code(0), Some(ResponseError::NoError));
        assert_eq!(ResponseError::from_code(256), Some(ResponseError::OpenFailed));
        assert_eq!(
            ResponseError::from_code(263),
            Some(ResponseError::DuplicateRegistration)
        );
        assert_eq!(ResponseError::ProcessingError.code(), 268);
        assert_eq!(ResponseError::from_code(19), None);
        assert_eq!(ResponseError::from_code(255), None);
        assert_eq!(ResponseError::from_code(269), None);
    }

    #[test]
    fn test_decode_short_payload() {
        let buf = encode_pdu(&Pdu::Response(ResponsePdu::new(5, vec![])), 0, 0, 0).unwrap();
        let header = PduHeader::from_bytes(&buf).unwrap();
        assert_eq!(
            decode_pdu(&header, &buf[HEADER_SIZE..HEADER_SIZE + 4]),
            Err(AgentXError::Truncated {
                needed: 8,
                available: 4
            })
        );
    }

    #[test]
    fn test_decode_reads_only_declared_window() {
        let pdu = Pdu::Response(ResponsePdu::new(5, vec![]));
        let mut buf = encode_pdu(&pdu, 0, 0, 0).unwrap();
        buf.extend_from_slice(&[0xff; 16]);
        let header = PduHeader::from_bytes(&buf).unwrap();
        let decoded = decode_pdu(&header, &buf[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, Pdu::Response(ResponsePdu::new(5, vec![])));
    }

    #[test]
    fn test_decode_little_endian_payload() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        let header = PduHeader::new(PduType::Response, 0, 0, 0)
            .with_flags(PduFlags::empty())
            .with_payload_length(payload.len() as u32);

        match decode_pdu(&header, &payload).unwrap() {
            Pdu::Response(r) => {
                assert_eq!(r.sys_uptime, 7);
                assert_eq!(r.error, 3);
                assert_eq!(r.index, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_split_frame_stream() {
        let mut stream = encode_pdu(&Pdu::Ping(PingPdu::default()), 1, 1, 1).unwrap();
        let close = Pdu::Close(ClosePdu {
            reason: CloseReason::Shutdown,
        });
        stream.extend(encode_pdu(&close, 1, 1, 2).unwrap());

        let (first, payload, rest) = split_frame(&stream).unwrap();
        assert_eq!(first.pdu_type, PduType::Ping);
        assert!(payload.is_empty());
        let (second, payload, rest) = split_frame(rest).unwrap();
        assert_eq!(second.packet_id, 2);
        assert_eq!(payload.len(), 4);
        assert!(rest.is_empty());

        assert!(matches!(
            split_frame(&stream[..HEADER_SIZE + HEADER_SIZE + 2][HEADER_SIZE..]),
            Err(AgentXError::Truncated { .. })
        ));
    }
}
