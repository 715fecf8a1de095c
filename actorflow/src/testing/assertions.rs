//! Assertions over flow results.

use crate::core::Payload;
use crate::pipeline::{FlowResult, FlowStatus};

/// Asserts that the flow completed without errors.
pub fn assert_completed(result: &FlowResult) {
    assert!(
        result.is_success(),
        "Expected a clean completion, got status {} with errors {:?}",
        result.status,
        result.errors
    );
}

/// Asserts that the flow was stopped on request.
pub fn assert_stopped(result: &FlowResult) {
    assert_eq!(
        result.status,
        FlowStatus::Stopped,
        "Expected a requested stop, got errors {:?}",
        result.errors
    );
}

/// Asserts that the flow failed and that one of its errors contains
/// `fragment`.
pub fn assert_failed(result: &FlowResult, fragment: &str) {
    assert_eq!(result.status, FlowStatus::Failed, "Expected a failed flow");
    assert!(
        result.errors.iter().any(|e| e.contains(fragment)),
        "Expected an error containing '{}', got {:?}",
        fragment,
        result.errors
    );
}

/// Asserts the payloads of the flow outputs, in order.
pub fn assert_output_payloads(result: &FlowResult, expected: &[Payload]) {
    let actual: Vec<&Payload> = result.payloads();
    let expected: Vec<&Payload> = expected.iter().collect();
    assert_eq!(actual, expected, "Unexpected flow outputs");
}
