//! Flow run identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one run of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowIdentity {
    /// The flow name; also the root of every actor path.
    pub flow_name: String,
    /// The unique ID of the current run.
    pub run_id: Uuid,
    /// The run ID of an enclosing flow, for nested executions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    /// When the current run started.
    pub started_at: DateTime<Utc>,
}

impl FlowIdentity {
    /// Creates an identity with a fresh run ID.
    #[must_use]
    pub fn new(flow_name: impl Into<String>) -> Self {
        Self {
            flow_name: flow_name.into(),
            run_id: Uuid::new_v4(),
            parent_run_id: None,
            started_at: Utc::now(),
        }
    }

    /// Sets the parent run ID.
    #[must_use]
    pub fn with_parent_run_id(mut self, parent: Uuid) -> Self {
        self.parent_run_id = Some(parent);
        self
    }

    /// Returns the identity for the next run of the same flow.
    #[must_use]
    pub fn next_run(&self) -> Self {
        Self {
            flow_name: self.flow_name.clone(),
            run_id: Uuid::new_v4(),
            parent_run_id: self.parent_run_id,
            started_at: Utc::now(),
        }
    }

    /// Converts to string-valued fields for logging.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("flow_name".to_string(), serde_json::json!(self.flow_name));
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert(
            "parent_run_id".to_string(),
            self.parent_run_id
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id.to_string())),
        );
        map.insert(
            "started_at".to_string(),
            serde_json::json!(self.started_at.to_rfc3339()),
        );
        map
    }
}
