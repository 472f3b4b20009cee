// crates/tenant-gate-deploy/src/backend/tests.rs
// ============================================================================
// Module: Backend Classification Tests
// Description: Unit tests for wire-level response classification.
// Purpose: Validate rejection mapping and in-band error record detection.
// Dependencies: tenant-gate-deploy, tenant-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Validates the pure classification layer beneath the HTTP backend: the
//! conflict, throttling, and permission mappings for rejected calls, and
//! the detection of command failures travelling inside HTTP 200 bodies.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap and fail loudly on shape mismatches."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use tenant_gate_core::BearerToken;

use super::DeployError;
use super::HttpBackend;
use super::RemoteCallKind;
use super::in_band_error;

fn token() -> BearerToken {
    BearerToken::new("opaque-fixture-token")
}

fn classify(status: u16, body: Option<Value>) -> DeployError {
    let text = body.as_ref().map(Value::to_string).unwrap_or_default();
    HttpBackend::rest_failure(&token(), status, body.as_ref(), &text, "/v1.0/fixture")
}

fn kind_of(err: &DeployError) -> (RemoteCallKind, u16) {
    match err {
        DeployError::RemoteCall {
            kind,
            status,
            ..
        } => (*kind, *status),
        other => panic!("expected a remote-call rejection, got {other}"),
    }
}

// ============================================================================
// SECTION: Rejection Mapping
// ============================================================================

#[test]
fn status_409_maps_to_conflict() {
    let err = classify(409, None);
    assert_eq!(kind_of(&err), (RemoteCallKind::Conflict, 409));
    assert!(err.is_conflict());
}

#[test]
fn conflict_error_code_is_normalized_to_409() {
    let body = json!({
        "error": {
            "code": "ConditionalAccessPolicyAlreadyExists",
            "message": "A policy with this name exists",
        },
    });
    let err = classify(400, Some(body));
    assert_eq!(kind_of(&err), (RemoteCallKind::Conflict, 409));
    assert!(err.is_conflict());
}

#[test]
fn status_429_maps_to_rate_limited() {
    let err = classify(429, None);
    assert_eq!(kind_of(&err), (RemoteCallKind::RateLimited, 429));
    assert!(!err.is_conflict());
}

#[test]
fn status_403_maps_to_forbidden_with_body_message() {
    let body = json!({"error": {"message": "Insufficient privileges"}});
    let err = classify(403, Some(body));
    assert_eq!(kind_of(&err), (RemoteCallKind::Forbidden, 403));
    assert!(err.to_string().contains("Insufficient privileges"));
}

#[test]
fn scope_message_maps_to_forbidden_on_any_status() {
    let body = json!({"error": {"message": "Missing scope Policy.ReadWrite"}});
    let err = classify(400, Some(body));
    assert_eq!(kind_of(&err), (RemoteCallKind::Forbidden, 400));
}

#[test]
fn unclassified_rejection_maps_to_other() {
    let body = json!({"error": {"message": "Bad request shape"}});
    let err = classify(400, Some(body));
    assert_eq!(kind_of(&err), (RemoteCallKind::Other, 400));
    assert!(err.to_string().contains("Bad request shape"));
}

// ============================================================================
// SECTION: In-Band Error Detection
// ============================================================================

#[test]
fn error_record_exception_message_is_extracted() {
    let body = json!({
        "ErrorRecords": [{
            "ErrorRecord": {
                "Exception": {"Message": "The policy name is already in use"},
            },
        }],
    });
    let message = in_band_error(Some(&body)).unwrap();
    assert_eq!(message, "The policy name is already in use");
}

#[test]
fn error_record_falls_back_to_top_level_message() {
    let body = json!({
        "ErrorRecords": [{"Message": "Parameter set cannot be resolved"}],
    });
    let message = in_band_error(Some(&body)).unwrap();
    assert_eq!(message, "Parameter set cannot be resolved");
}

#[test]
fn embedded_error_message_is_detected_without_records() {
    let body = json!({"error": {"message": "Cmdlet not found"}});
    let message = in_band_error(Some(&body)).unwrap();
    assert_eq!(message, "Cmdlet not found");
}

#[test]
fn clean_body_carries_no_error() {
    let body = json!({"value": [{"Name": "Default"}]});
    assert!(in_band_error(Some(&body)).is_none());
    assert!(in_band_error(None).is_none());
}
