//! Provenance: the ordered record of which actors transformed a token.
//!
//! Chains are append-only. Before extending the chain of an incoming token
//! an actor works on a clone, so that tokens on independent branches never
//! share a mutable chain. When tracking is disabled every operation is a
//! no-op and actors keep working unchanged.

use crate::core::{Payload, PayloadType, Token};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// What kind of change an actor made to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// Produced new data.
    DataGenerator,
    /// Changed the data.
    Modifier,
    /// Filtered or transformed the data using a trained model.
    Filter,
    /// Anything else.
    Other,
}

/// One link of a provenance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Full path of the actor.
    pub actor: String,
    /// Kind of change.
    pub actor_type: ActorType,
    /// Type of the consumed payload; `None` for sources.
    pub input_type: Option<PayloadType>,
    /// Type of the produced payload.
    pub output_type: PayloadType,
    /// Position in the chain, starting at 0.
    pub position: usize,
    /// When the entry was added.
    pub timestamp: DateTime<Utc>,
}

/// An append-only, ordered provenance chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceChain {
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn add_provenance(
        &mut self,
        actor: impl Into<String>,
        actor_type: ActorType,
        input_type: Option<PayloadType>,
        output_type: PayloadType,
    ) {
        let position = self.entries.len();
        self.entries.push(ProvenanceEntry {
            actor: actor.into(),
            actor_type,
            input_type,
            output_type,
            position,
            timestamp: Utc::now(),
        });
    }

    /// Returns an independent copy of the chain, to be extended by a branch.
    #[must_use]
    pub fn get_clone(&self) -> Self {
        self.clone()
    }

    /// Returns the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    /// Returns the actor paths in chain order.
    #[must_use]
    pub fn actors(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.actor.as_str()).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the chain has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-flow provenance switch and token factory.
#[derive(Debug, Default)]
pub struct ProvenanceTracker {
    enabled: AtomicBool,
}

impl ProvenanceTracker {
    /// Creates a tracker.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Returns whether tracking is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enables or disables tracking.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Appends an entry to `chain` if tracking is enabled.
    pub fn add_provenance(
        &self,
        chain: &mut ProvenanceChain,
        actor: &str,
        actor_type: ActorType,
        input_type: Option<PayloadType>,
        output_type: PayloadType,
    ) {
        if self.is_enabled() {
            chain.add_provenance(actor, actor_type, input_type, output_type);
        }
    }

    /// Builds the output token for `payload` derived from `input`.
    ///
    /// Enabled: the input chain is cloned and extended with one entry for
    /// `actor`. Disabled: the input chain is carried over untouched.
    #[must_use]
    pub fn derive(
        &self,
        input: Option<&Token>,
        payload: impl Into<Payload>,
        actor: &str,
        actor_type: ActorType,
    ) -> Token {
        let payload = payload.into();
        let inherited = input.and_then(Token::provenance);
        if !self.is_enabled() {
            return Token::with_provenance(payload, inherited.cloned());
        }

        let mut chain = inherited.map(ProvenanceChain::get_clone).unwrap_or_default();
        chain.add_provenance(
            actor,
            actor_type,
            input.map(Token::payload_type),
            payload.payload_type(),
        );
        Token::with_provenance(payload, Some(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_append_only_order() {
        let mut chain = ProvenanceChain::new();
        chain.add_provenance("Flow.A", ActorType::DataGenerator, None, PayloadType::Integer);
        chain.add_provenance(
            "Flow.B",
            ActorType::Modifier,
            Some(PayloadType::Integer),
            PayloadType::Double,
        );

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.actors(), vec!["Flow.A", "Flow.B"]);
        assert_eq!(chain.entries()[1].position, 1);
        assert!(chain.entries()[0].timestamp <= chain.entries()[1].timestamp);
    }

    #[test]
    fn test_derive_disabled_keeps_input_chain() {
        let tracker = ProvenanceTracker::new(false);
        let input = Token::new(1_i64);
        let out = tracker.derive(Some(&input), 2.0, "Flow.Math", ActorType::Modifier);
        assert!(!out.has_provenance());
    }

    #[test]
    fn test_derive_enabled_extends_clone() {
        let tracker = ProvenanceTracker::new(true);
        let source = tracker.derive(None, 1_i64, "Flow.Source", ActorType::DataGenerator);
        let branch_a = tracker.derive(Some(&source), 2.0, "Flow.A", ActorType::Modifier);
        let branch_b = tracker.derive(Some(&source), 3.0, "Flow.B", ActorType::Modifier);

        assert_eq!(source.provenance().unwrap().len(), 1);
        assert_eq!(branch_a.provenance().unwrap().actors(), vec!["Flow.Source", "Flow.A"]);
        assert_eq!(branch_b.provenance().unwrap().actors(), vec!["Flow.Source", "Flow.B"]);
        assert_eq!(
            branch_a.provenance().unwrap().entries()[1].input_type,
            Some(PayloadType::Integer)
        );
    }

    #[test]
    fn test_tracker_add_provenance_noop_when_disabled() {
        let tracker = ProvenanceTracker::default();
        let mut chain = ProvenanceChain::new();
        tracker.add_provenance(&mut chain, "Flow.A", ActorType::Other, None, PayloadType::String);
        assert!(chain.is_empty());

        tracker.set_enabled(true);
        tracker.add_provenance(&mut chain, "Flow.A", ActorType::Other, None, PayloadType::String);
        assert_eq!(chain.len(), 1);
    }
}
