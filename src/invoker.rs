//! Invocation outcomes and the invoker seam.
//!
//! An [`OperationInvoker`] performs exactly one bounded-argument call against
//! a live service endpoint and classifies the result. The trait is the seam
//! that lets the scanner run against alternate providers, and against mock
//! invokers in tests, without caring how calls are made.

use std::future::Future;

use schemars::JsonSchema;
use serde::Serialize;
use strum::Display;

use crate::rules::rule::ResolvedArgs;

/// The four possible classifications for one invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// The call was not rejected on authorization grounds: either a success
    /// response, or a service-level error that is only reachable once
    /// authorization has already passed.
    Allowed,
    /// The service rejected the call with an authorization-denied error code.
    Denied,
    /// Any other failure: transport errors, throttling, bad arguments.
    /// Carries no privilege signal.
    Errored,
    /// Deny-listed by the safety filter; never invoked.
    Skipped,
}

impl Outcome {
    /// Single-character marker used by the pretty report.
    pub fn marker(&self) -> &'static str {
        match self {
            Outcome::Allowed => "+",
            Outcome::Denied => "-",
            Outcome::Errored => "!",
            Outcome::Skipped => "~",
        }
    }
}

/// Error code and message attached to Denied/Errored results.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }
}

/// The classified result of one (region, operation) attempt. Created once,
/// never mutated.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InvocationResult {
    pub operation: String,
    pub region: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Raw response payload, kept only for the lifetime of the run.
    #[serde(skip)]
    pub payload: Option<String>,
}

impl InvocationResult {
    pub fn allowed(
        operation: impl Into<String>,
        region: impl Into<String>,
        payload: Option<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            region: region.into(),
            outcome: Outcome::Allowed,
            error: None,
            payload,
        }
    }

    pub fn denied(
        operation: impl Into<String>,
        region: impl Into<String>,
        error: ErrorDetail,
    ) -> Self {
        Self {
            operation: operation.into(),
            region: region.into(),
            outcome: Outcome::Denied,
            error: Some(error),
            payload: None,
        }
    }

    pub fn errored(
        operation: impl Into<String>,
        region: impl Into<String>,
        error: ErrorDetail,
    ) -> Self {
        Self {
            operation: operation.into(),
            region: region.into(),
            outcome: Outcome::Errored,
            error: Some(error),
            payload: None,
        }
    }

    pub fn skipped(operation: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            region: region.into(),
            outcome: Outcome::Skipped,
            error: None,
            payload: None,
        }
    }
}

/// Everything an invoker needs for one call. Arguments arrive fully resolved;
/// rule matching has already happened by the time a request is built.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub service: String,
    pub region: String,
    pub operation: String,
    pub arguments: ResolvedArgs,
}

/// Performs one call against a live endpoint and classifies the outcome.
/// Implementations never panic on remote failures; every failure mode maps
/// to an [`InvocationResult`].
pub trait OperationInvoker: Send + Sync {
    fn invoke(&self, request: InvocationRequest) -> impl Future<Output = InvocationResult> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_markers_match_report_legend() {
        assert_eq!(Outcome::Allowed.marker(), "+");
        assert_eq!(Outcome::Denied.marker(), "-");
        assert_eq!(Outcome::Errored.marker(), "!");
        assert_eq!(Outcome::Skipped.marker(), "~");
    }

    #[test]
    fn payload_is_never_serialized() {
        let result = InvocationResult::allowed("list_things", "us-east-1", Some("secret".into()));
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"outcome\":\"allowed\""));
    }

    #[test]
    fn error_detail_serializes_code_when_present() {
        let result = InvocationResult::denied(
            "list_things",
            "us-east-1",
            ErrorDetail::new(Some("AccessDenied".into()), "nope"),
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("AccessDenied"));
    }
}
