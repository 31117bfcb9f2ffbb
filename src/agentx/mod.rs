//! AgentX protocol codec per RFC 2741.
//!
//! Pure byte-buffer to structured-PDU transformation. Callers read
//! [`HEADER_SIZE`] bytes, decode them with [`decode_header`], read
//! `payload_length` more bytes and hand them to [`decode_pdu`] (or one of the
//! per-type decoders). Encoders return the complete PDU, header included.
//!
//! # Usage
//!
//! ```
//! use agentx_codec::agentx::{
//!     decode_header, decode_response_pdu, encode_response_pdu, HEADER_SIZE,
//! };
//! use agentx_codec::{Value, VarBind};
//!
//! let vb = VarBind::new("1.3.6.1.2.1.1.5.0".parse().unwrap(), Value::string("host"));
//! let pdu = encode_response_pdu(1, 2, 3, 1000, 0, 0, &[vb.clone()]).unwrap();
//!
//! let header = decode_header(&pdu).unwrap();
//! let payload_len = header.payload_length as usize;
//! let response = decode_response_pdu(&pdu[HEADER_SIZE..], payload_len).unwrap();
//! assert_eq!(response.varbinds, vec![vb]);
//! ```

mod batch;
mod codec;
mod header;
mod pdu;
mod wire;

pub use batch::{
    concat_buffers, encode_oids_batch, encode_search_ranges_batch, encode_values_batch,
    encode_varbinds_batch,
};
pub use codec::{
    decode_close_pdu, decode_get_pdu, decode_getbulk_pdu, decode_getnext_pdu,
    decode_notify_pdu, decode_open_pdu, decode_register_pdu, decode_response_pdu,
    decode_testset_pdu, decode_unregister_pdu, encode_close_pdu, encode_notify_pdu,
    encode_open_pdu, encode_ping_pdu, encode_register_pdu, encode_response_pdu,
    encode_unregister_pdu,
};
pub use header::{
    decode_header, encode_header, PduFlags, PduHeader, PduType, AGENTX_VERSION, HEADER_SIZE,
};
pub use pdu::{
    decode_pdu, encode_pdu, split_frame, AddAgentCapsPdu, ClosePdu, CloseReason, GetBulkPdu,
    GetPdu, IndexPdu, NotifyPdu, OpenPdu, Pdu, PingPdu, RegisterPdu, RemoveAgentCapsPdu,
    ResponseError, ResponsePdu, TestSetPdu, UnregisterPdu,
};
pub use wire::{
    decode_octet_string, decode_oid, decode_value, decode_varbind, encode_octet_string,
    encode_oid, encode_value, encode_varbind, padding_for, SearchRange, MAX_SUBIDS,
};

/// Errors that can occur while encoding or decoding AgentX PDUs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentXError {
    /// The buffer ended before the element being decoded.
    #[error("Truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    /// PDU type byte outside RFC 2741 §6.1.
    #[error("Unknown PDU type: {0}")]
    UnknownPduType(u8),
    /// VarBind type tag outside RFC 2741 §5.4.
    #[error("Unknown value type tag: {0}")]
    UnknownValueType(u16),
    /// Close reason outside RFC 2741 §6.2.2.
    #[error("Unknown close reason: {0}")]
    UnknownCloseReason(u8),
    /// A declared length no well-formed PDU can carry.
    #[error("Invalid length: {0}")]
    InvalidLength(String),
    #[error("Unsupported AgentX version: {0}")]
    UnsupportedVersion(u8),
    /// Inconsistent input handed to an encoder.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AgentXError {
    /// True for the unknown PDU type / value tag / close reason family.
    pub fn is_unknown_tag(&self) -> bool {
        matches!(
            self,
            AgentXError::UnknownPduType(_)
                | AgentXError::UnknownValueType(_)
                | AgentXError::UnknownCloseReason(_)
        )
    }
}
