//! Batch encoders producing one buffer per input item.
//!
//! With the `parallel` feature the items are encoded on rayon's thread pool;
//! output order always follows input order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{
    wire::{encode_oid, encode_value, encode_varbind, SearchRange},
    AgentXError,
};
use crate::{
    oid::Oid,
    value::{Value, VarBind},
};

#[cfg(feature = "parallel")]
fn encode_each<T, F>(items: &[T], encode: F) -> Result<Vec<Vec<u8>>, AgentXError>
where
    T: Sync,
    F: Fn(&mut Vec<u8>, &T) -> Result<(), AgentXError> + Sync + Send,
{
    items
        .par_iter()
        .map(|item| {
            let mut buf = Vec::new();
            encode(&mut buf, item)?;
            Ok(buf)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn encode_each<T, F>(items: &[T], encode: F) -> Result<Vec<Vec<u8>>, AgentXError>
where
    F: Fn(&mut Vec<u8>, &T) -> Result<(), AgentXError>,
{
    items
        .iter()
        .map(|item| {
            let mut buf = Vec::new();
            encode(&mut buf, item)?;
            Ok(buf)
        })
        .collect()
}

pub fn encode_varbinds_batch(varbinds: &[VarBind]) -> Result<Vec<Vec<u8>>, AgentXError> {
    encode_each(varbinds, encode_varbind)
}

pub fn encode_search_ranges_batch(
    ranges: &[SearchRange],
) -> Result<Vec<Vec<u8>>, AgentXError> {
    encode_each(ranges, |buf, range| range.write(buf))
}

/// Encodes each OID with the same `include` flag.
pub fn encode_oids_batch(oids: &[Oid], include: bool) -> Result<Vec<Vec<u8>>, AgentXError> {
    encode_each(oids, |buf, oid| encode_oid(buf, Some(oid), include))
}

/// Encodes the data portion of each value (no type tag).
pub fn encode_values_batch(values: &[Value]) -> Result<Vec<Vec<u8>>, AgentXError> {
    encode_each(values, encode_value)
}

/// Joins encoded buffers in order into one allocation.
pub fn concat_buffers(buffers: Vec<Vec<u8>>) -> Vec<u8> {
    let total: usize = buffers.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for buf in buffers {
        out.extend_from_slice(&buf);
    }
    out
}
