//! The unit of data passed between actors.

use super::payload::{Payload, PayloadType};
use crate::provenance::ProvenanceChain;
use serde::{Deserialize, Serialize};

/// An immutable carrier of one payload plus an optional provenance chain.
///
/// Transformations never mutate a token; they build a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provenance: Option<ProvenanceChain>,
}

impl Token {
    /// Creates a token without provenance.
    #[must_use]
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            provenance: None,
        }
    }

    /// Creates a token carrying the given provenance chain.
    #[must_use]
    pub fn with_provenance(payload: impl Into<Payload>, provenance: Option<ProvenanceChain>) -> Self {
        Self {
            payload: payload.into(),
            provenance,
        }
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the payload type.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        self.payload.payload_type()
    }

    /// Returns the provenance chain, if any.
    #[must_use]
    pub fn provenance(&self) -> Option<&ProvenanceChain> {
        self.provenance.as_ref()
    }

    /// Returns true if the token carries a provenance chain.
    #[must_use]
    pub fn has_provenance(&self) -> bool {
        self.provenance.is_some()
    }

    /// Consumes the token, returning the payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.payload)
    }
}
