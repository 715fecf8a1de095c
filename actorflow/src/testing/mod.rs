//! Testing utilities for actorflow flows.
//!
//! This module provides:
//! - Scripted actors that record or fail their lifecycle calls
//! - A constant source
//! - Assertions over flow results

mod assertions;
mod mocks;

pub use assertions::{
    assert_completed, assert_failed, assert_output_payloads, assert_stopped,
};
pub use mocks::{ConstantSource, FailingActor, FailurePoint, LifecycleLog, RecordingActor};
