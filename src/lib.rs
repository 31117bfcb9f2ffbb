//! AgentX Codec - RFC 2741 wire encoding for SNMP subagents.
//!
//! This crate turns AgentX PDUs into bytes and back. It owns the SNMP data
//! types carried by the protocol ([`Oid`], [`Value`], [`VarBind`]) and the
//! per-PDU payload layouts, and leaves transport and session handling to the
//! caller.
//!
//! # Usage
//!
//! Decode a captured stream with the bundled inspector:
//! ```bash
//! agentx-inspect "01 0d 10 00 00000001 00000002 00000003 00000000"
//! agentx-inspect --file capture.bin --format json
//! ```

/// AgentX header, wire primitives and PDU codec.
pub mod agentx;
/// Command-line configuration and validation.
pub mod configuration;
/// Stream decoding and report rendering for the inspector.
pub mod inspect;
/// Object identifiers.
pub mod oid;
/// SNMP values and variable bindings.
pub mod value;

pub use agentx::AgentXError;
pub use oid::{Oid, OidError};
pub use value::{Value, ValueType, VarBind};
