//! Flow building and execution.
//!
//! This module provides:
//! - The flow builder with validation
//! - The sequence driver
//! - Runnable flows, stop handles and results
//! - Sub-flows

mod builder;
mod flow;
mod integration_tests;
mod result;
mod sequence;
mod subflow;

pub use builder::PipelineBuilder;
pub use flow::{Flow, FlowStopHandle};
pub use result::{FlowResult, FlowStatus};
pub use sequence::Sequence;
pub use subflow::SubFlow;
