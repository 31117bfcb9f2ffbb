//! Per-type encode/decode functions.
//!
//! Encoders return the full PDU, header included. Decoders take the payload
//! with the header already stripped plus the declared payload length, and
//! assume network byte order with the default context; use
//! [`decode_pdu`](super::decode_pdu) when the header flags matter.

use super::{
    header::{PduHeader, PduType},
    pdu::{
        decode_pdu, encode_pdu, ClosePdu, CloseReason, GetBulkPdu, GetPdu, NotifyPdu, OpenPdu,
        Pdu, PingPdu, RegisterPdu, ResponsePdu, TestSetPdu, UnregisterPdu,
    },
    AgentXError,
};
use crate::{oid::Oid, value::VarBind};

fn context_bytes(context: Option<&str>) -> Option<Vec<u8>> {
    context.map(|c| c.as_bytes().to_vec())
}

/// Encodes an Open PDU. `id` of `None` sends the null OID.
pub fn encode_open_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    timeout: u8,
    id: Option<&Oid>,
    description: &str,
) -> Result<Vec<u8>, AgentXError> {
    let pdu = OpenPdu::new(timeout, id.cloned(), description);
    encode_pdu(&Pdu::Open(pdu), session_id, transaction_id, packet_id)
}

pub fn encode_close_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    reason: CloseReason,
) -> Result<Vec<u8>, AgentXError> {
    encode_pdu(
        &Pdu::Close(ClosePdu { reason }),
        session_id,
        transaction_id,
        packet_id,
    )
}

/// Encodes a Register PDU for a plain (non-range) subtree.
///
/// A non-empty `context` sets the NON_DEFAULT_CONTEXT flag. Range and
/// instance registrations go through [`RegisterPdu`] and
/// [`encode_pdu`](super::encode_pdu).
pub fn encode_register_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    subtree: &Oid,
    priority: u8,
    timeout: u8,
    context: Option<&str>,
) -> Result<Vec<u8>, AgentXError> {
    let mut pdu = RegisterPdu::new(subtree.clone(), priority, timeout);
    pdu.context = context_bytes(context);
    encode_pdu(&Pdu::Register(pdu), session_id, transaction_id, packet_id)
}

pub fn encode_unregister_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    subtree: &Oid,
    priority: u8,
    context: Option<&str>,
) -> Result<Vec<u8>, AgentXError> {
    let mut pdu = UnregisterPdu::new(subtree.clone(), priority);
    pdu.context = context_bytes(context);
    encode_pdu(&Pdu::Unregister(pdu), session_id, transaction_id, packet_id)
}

pub fn encode_notify_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    varbinds: &[VarBind],
    context: Option<&str>,
) -> Result<Vec<u8>, AgentXError> {
    let pdu = NotifyPdu {
        context: context_bytes(context),
        varbinds: varbinds.to_vec(),
    };
    encode_pdu(&Pdu::Notify(pdu), session_id, transaction_id, packet_id)
}

/// Encodes a Ping PDU: header only, empty payload.
pub fn encode_ping_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
) -> Result<Vec<u8>, AgentXError> {
    encode_pdu(
        &Pdu::Ping(PingPdu::default()),
        session_id,
        transaction_id,
        packet_id,
    )
}

pub fn encode_response_pdu(
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    sys_uptime: u32,
    error: u16,
    index: u16,
    varbinds: &[VarBind],
) -> Result<Vec<u8>, AgentXError> {
    let pdu = ResponsePdu {
        sys_uptime,
        error,
        index,
        varbinds: varbinds.to_vec(),
    };
    encode_pdu(&Pdu::Response(pdu), session_id, transaction_id, packet_id)
}

/// Runs `decode_pdu` under a synthetic network-order header.
fn decode_as(
    pdu_type: PduType,
    payload: &[u8],
    payload_len: usize,
) -> Result<Pdu, AgentXError> {
    let payload_length = u32::try_from(payload_len).map_err(|_| {
        AgentXError::InvalidLength(format!("payload length {} exceeds u32", payload_len))
    })?;
    let header = PduHeader::new(pdu_type, 0, 0, 0).with_payload_length(payload_length);
    decode_pdu(&header, payload)
}

// decode_pdu always yields the variant of the header type; the fallback arms
// below are unreachable in practice.
fn mismatch(expected: PduType, got: &Pdu) -> AgentXError {
    AgentXError::InvalidArgument(format!(
        "expected {} PDU, decoded {}",
        expected,
        got.pdu_type()
    ))
}

pub fn decode_open_pdu(payload: &[u8], payload_len: usize) -> Result<OpenPdu, AgentXError> {
    match decode_as(PduType::Open, payload, payload_len)? {
        Pdu::Open(p) => Ok(p),
        other => Err(mismatch(PduType::Open, &other)),
    }
}

pub fn decode_close_pdu(payload: &[u8], payload_len: usize) -> Result<ClosePdu, AgentXError> {
    match decode_as(PduType::Close, payload, payload_len)? {
        Pdu::Close(p) => Ok(p),
        other => Err(mismatch(PduType::Close, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_register_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<RegisterPdu, AgentXError> {
    match decode_as(PduType::Register, payload, payload_len)? {
        Pdu::Register(p) => Ok(p),
        other => Err(mismatch(PduType::Register, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_unregister_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<UnregisterPdu, AgentXError> {
    match decode_as(PduType::Unregister, payload, payload_len)? {
        Pdu::Unregister(p) => Ok(p),
        other => Err(mismatch(PduType::Unregister, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_get_pdu(payload: &[u8], payload_len: usize) -> Result<GetPdu, AgentXError> {
    match decode_as(PduType::Get, payload, payload_len)? {
        Pdu::Get(p) => Ok(p),
        other => Err(mismatch(PduType::Get, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_getnext_pdu(payload: &[u8], payload_len: usize) -> Result<GetPdu, AgentXError> {
    match decode_as(PduType::GetNext, payload, payload_len)? {
        Pdu::GetNext(p) => Ok(p),
        other => Err(mismatch(PduType::GetNext, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_getbulk_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<GetBulkPdu, AgentXError> {
    match decode_as(PduType::GetBulk, payload, payload_len)? {
        Pdu::GetBulk(p) => Ok(p),
        other => Err(mismatch(PduType::GetBulk, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_testset_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<TestSetPdu, AgentXError> {
    match decode_as(PduType::TestSet, payload, payload_len)? {
        Pdu::TestSet(p) => Ok(p),
        other => Err(mismatch(PduType::TestSet, &other)),
    }
}

/// Assumes the default context. When the header carries NON_DEFAULT_CONTEXT
/// the payload opens with the context string; decode it with
/// [`decode_pdu`](super::decode_pdu) instead.
pub fn decode_notify_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<NotifyPdu, AgentXError> {
    match decode_as(PduType::Notify, payload, payload_len)? {
        Pdu::Notify(p) => Ok(p),
        other => Err(mismatch(PduType::Notify, &other)),
    }
}

pub fn decode_response_pdu(
    payload: &[u8],
    payload_len: usize,
) -> Result<ResponsePdu, AgentXError> {
    match decode_as(PduType::Response, payload, payload_len)? {
        Pdu::Response(p) => Ok(p),
        other => Err(mismatch(PduType::Response, &other)),
    }
}
