//! SNMP Object Identifiers.
//!
//! An [`Oid`] is a non-empty sequence of 32-bit sub-identifiers. Ordering is
//! numeric and lexicographic over the sub-identifiers, so `1.2 < 1.10` and a
//! prefix always sorts before its descendants (`1.3.6.1 < 1.3.6.1.1`).
//!
//! The zero-length "null OID" of the AgentX wire format is deliberately not
//! representable here; the PDU layer models it as `Option<Oid>`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when building an [`Oid`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OidError {
    /// Empty input, or a component that is not a base-10 `u32`.
    #[error("invalid OID format: {0}")]
    InvalidFormat(String),
}

/// An SNMP Object Identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid {
    parts: Vec<u32>,
}

impl Oid {
    /// Creates an OID from owned sub-identifiers.
    ///
    /// # Errors
    /// Returns `OidError::InvalidFormat` if `parts` is empty.
    pub fn new(parts: Vec<u32>) -> Result<Self, OidError> {
        if parts.is_empty() {
            return Err(OidError::InvalidFormat("empty".to_string()));
        }
        Ok(Oid { parts })
    }

    /// Creates an OID from a slice of sub-identifiers.
    ///
    /// # Errors
    /// Returns `OidError::InvalidFormat` if `parts` is empty.
    pub fn from_slice(parts: &[u32]) -> Result<Self, OidError> {
        Self::new(parts.to_vec())
    }

    /// Parses dotted-decimal notation, e.g. `".1.3.6.1"` or `"1.3.6.1"`.
    ///
    /// # Errors
    /// Returns `OidError::InvalidFormat` on empty input or a component that is
    /// not a non-negative base-10 integer fitting in 32 bits.
    pub fn parse(s: &str) -> Result<Self, OidError> {
        s.parse()
    }

    /// Returns a copy of the sub-identifiers.
    pub fn parts(&self) -> Vec<u32> {
        self.parts.clone()
    }

    /// Iterates over the sub-identifiers.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.parts.iter().copied()
    }

    /// Returns the number of sub-identifiers.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always false: an `Oid` holds at least one sub-identifier.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns true if `prefix` is a prefix of (or equal to) this OID.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.parts.starts_with(&prefix.parts)
    }

    /// Returns true if `other` is exactly one level below this OID.
    pub fn is_parent_of(&self, other: &Oid) -> bool {
        other.parts.len() == self.parts.len() + 1 && other.parts.starts_with(&self.parts)
    }

    /// Returns this OID without its last sub-identifier, or `None` for a
    /// single-element OID.
    pub fn parent(&self) -> Option<Oid> {
        if self.parts.len() <= 1 {
            return None;
        }
        Some(Oid {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    /// Returns a new OID with `sub_id` appended.
    pub fn child(&self, sub_id: u32) -> Oid {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.extend_from_slice(&self.parts);
        parts.push(sub_id);
        Oid { parts }
    }

    pub(crate) fn as_slice(&self) -> &[u32] {
        &self.parts
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('.').unwrap_or(s);

        if s.is_empty() {
            return Err(OidError::InvalidFormat("empty".to_string()));
        }

        let parts = s
            .split('.')
            .map(|part| {
                // u32::from_str tolerates a leading '+', which is not dotted-decimal.
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(OidError::InvalidFormat(format!(
                        "invalid component '{}'",
                        part
                    )));
                }
                part.parse::<u32>().map_err(|_| {
                    OidError::InvalidFormat(format!("invalid component '{}'", part))
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        Self::new(parts)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for sub in &self.parts {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", sub)?;
            first = false;
        }
        Ok(())
    }
}

impl TryFrom<String> for Oid {
    type Error = OidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}
