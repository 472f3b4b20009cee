// crates/tenant-gate-deploy/tests/dispatcher_runs.rs
// ============================================================================
// Module: Dispatcher Tests
// Description: Integration tests for the deployment state machine.
// Purpose: Validate preflight stickiness, status transitions, and bulk runs.
// Dependencies: tenant-gate-deploy, tenant-gate-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! Validates the dispatcher over a fake backend: one probe per family per
//! session, conflict short-circuits to `exists`, first failure abandons
//! the remaining calls, and bulk runs count outcomes without aborting.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tenant_gate_core::AccountInfo;
use tenant_gate_core::AuthError;
use tenant_gate_core::BearerToken;
use tenant_gate_core::Control;
use tenant_gate_core::ControlId;
use tenant_gate_core::ControlType;
use tenant_gate_core::DeployState;
use tenant_gate_core::MethodFamily;
use tenant_gate_core::NullProgress;
use tenant_gate_core::SpecLoadError;
use tenant_gate_core::SpecLoader;
use tenant_gate_core::TokenProvider;
use tenant_gate_deploy::Backend;
use tenant_gate_deploy::Command;
use tenant_gate_deploy::DeployError;
use tenant_gate_deploy::DeployOutcome;
use tenant_gate_deploy::Dispatcher;
use tenant_gate_deploy::InvokeSurface;
use tenant_gate_deploy::RemoteCallKind;
use tenant_gate_deploy::RestCall;

// ============================================================================
// SECTION: Fakes
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum CannedResult {
    Ok,
    Conflict,
    Fail,
}

/// Backend serving canned results keyed by endpoint or cmdlet.
#[derive(Default)]
struct FakeBackend {
    canned: HashMap<String, CannedResult>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn result_for(&self, key: &str) -> CannedResult {
        self.canned.get(key).copied().unwrap_or(CannedResult::Ok)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn call_rest(&self, call: &RestCall) -> Result<Value, DeployError> {
        self.calls.lock().unwrap().push(call.endpoint.clone());
        match self.result_for(&call.endpoint) {
            CannedResult::Ok => Ok(json!({})),
            CannedResult::Conflict => Err(DeployError::RemoteCall {
                kind: RemoteCallKind::Conflict,
                status: 409,
                message: "configuration already exists".to_string(),
            }),
            CannedResult::Fail => Err(DeployError::RemoteCall {
                kind: RemoteCallKind::Other,
                status: 400,
                message: "bad request".to_string(),
            }),
        }
    }

    async fn invoke_command(
        &self,
        _surface: InvokeSurface,
        command: &Command,
    ) -> Result<Value, DeployError> {
        self.calls.lock().unwrap().push(command.cmdlet.clone());
        match self.result_for(&command.cmdlet) {
            CannedResult::Ok => Ok(json!({})),
            CannedResult::Conflict | CannedResult::Fail => Err(DeployError::InBandCommand {
                cmdlet: command.cmdlet.clone(),
                message: "fixture failure".to_string(),
            }),
        }
    }
}

/// Spec loader serving documents keyed by reference.
struct FakeSpecs {
    documents: HashMap<String, Value>,
}

#[async_trait]
impl SpecLoader for FakeSpecs {
    async fn load(
        &self,
        _control_type: ControlType,
        reference: &str,
    ) -> Result<Value, SpecLoadError> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| SpecLoadError::NotFound {
                reference: reference.to_string(),
            })
    }
}

struct FakeTokens;

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn token(&self, _family: MethodFamily) -> Result<Option<BearerToken>, AuthError> {
        Ok(Some(BearerToken::new("fixture-token")))
    }

    async fn account(&self) -> Option<AccountInfo> {
        Some(AccountInfo {
            tenant_id: Some("contoso-tenant".to_string()),
            email: Some("admin@contoso.com".to_string()),
        })
    }
}

fn control(id: &str, control_type: ControlType) -> Control {
    Control {
        id: ControlId::new(id),
        control_type,
        spec_doc_ref: format!("{id}.json"),
        display_name: format!("Control {id}"),
        frameworks: Vec::new(),
        required_licence: None,
    }
}

fn dispatcher(
    backend: FakeBackend,
    documents: HashMap<String, Value>,
) -> (Dispatcher<FakeBackend>, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let dispatcher = Dispatcher::new(
        Arc::clone(&backend),
        Arc::new(FakeSpecs {
            documents,
        }),
        Arc::new(FakeTokens),
        Arc::new(NullProgress),
    );
    (dispatcher, backend)
}

fn ca_document() -> Value {
    json!({"displayName": "Require MFA", "state": "enabled"})
}

// ============================================================================
// SECTION: Single Deployments
// ============================================================================

#[tokio::test]
async fn script_only_control_fails_without_status_entry() {
    let (dispatcher, backend) = dispatcher(FakeBackend::default(), HashMap::new());
    let teams = control("TMS01", ControlType::Teams);

    let err = dispatcher.deploy(&teams).await.unwrap_err();
    assert!(matches!(err, DeployError::ScriptOnly));
    assert!(dispatcher.status(&teams.id).is_none());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn successful_deploy_runs_probe_then_calls() {
    let (dispatcher, backend) = dispatcher(
        FakeBackend::default(),
        HashMap::from([("CA01.json".to_string(), ca_document())]),
    );
    let ca = control("CA01", ControlType::ConditionalAccess);

    let outcome = dispatcher.deploy(&ca).await.unwrap();
    assert_eq!(outcome, DeployOutcome::Deployed);
    assert_eq!(
        backend.calls(),
        vec![
            "/v1.0/me".to_string(),
            "/v1.0/identity/conditionalAccess/policies".to_string(),
        ]
    );
    assert_eq!(dispatcher.status(&ca.id).unwrap().state, DeployState::Success);
}

#[tokio::test]
async fn preflight_passes_once_per_family() {
    let (dispatcher, backend) = dispatcher(
        FakeBackend::default(),
        HashMap::from([
            ("CA01.json".to_string(), ca_document()),
            ("CA02.json".to_string(), ca_document()),
        ]),
    );

    dispatcher.deploy(&control("CA01", ControlType::ConditionalAccess)).await.unwrap();
    dispatcher.deploy(&control("CA02", ControlType::ConditionalAccess)).await.unwrap();

    let probes = backend.calls().iter().filter(|call| *call == "/v1.0/me").count();
    assert_eq!(probes, 1);
}

#[tokio::test]
async fn preflight_failure_marks_the_control_failed() {
    let mut backend = FakeBackend::default();
    backend.canned.insert("/v1.0/me".to_string(), CannedResult::Fail);
    let (dispatcher, backend) = dispatcher(
        backend,
        HashMap::from([("CA01.json".to_string(), ca_document())]),
    );
    let ca = control("CA01", ControlType::ConditionalAccess);

    let err = dispatcher.deploy(&ca).await.unwrap_err();
    assert!(matches!(err, DeployError::Preflight { .. }));
    assert_eq!(dispatcher.status(&ca.id).unwrap().state, DeployState::Failed);
    assert_eq!(backend.calls(), vec!["/v1.0/me".to_string()]);
}

#[tokio::test]
async fn conflict_sets_exists_and_stays_sticky() {
    let mut backend = FakeBackend::default();
    backend.canned.insert(
        "/v1.0/identity/conditionalAccess/policies".to_string(),
        CannedResult::Conflict,
    );
    let (dispatcher, backend) = dispatcher(
        backend,
        HashMap::from([("CA01.json".to_string(), ca_document())]),
    );
    let ca = control("CA01", ControlType::ConditionalAccess);

    let outcome = dispatcher.deploy(&ca).await.unwrap();
    assert_eq!(outcome, DeployOutcome::AlreadyExists);
    assert_eq!(dispatcher.status(&ca.id).unwrap().state, DeployState::Exists);

    // A second deploy is answered from the sticky record without calls.
    let calls_before = backend.calls().len();
    let outcome = dispatcher.deploy(&ca).await.unwrap();
    assert_eq!(outcome, DeployOutcome::AlreadyExists);
    assert_eq!(backend.calls().len(), calls_before);
}

#[tokio::test]
async fn failed_deploy_is_reenterable_after_the_cause_clears() {
    let mut backend = FakeBackend::default();
    backend.canned.insert(
        "/v1.0/identity/conditionalAccess/policies".to_string(),
        CannedResult::Fail,
    );
    let (dispatcher, _backend) = dispatcher(
        backend,
        HashMap::from([("CA01.json".to_string(), ca_document())]),
    );
    let ca = control("CA01", ControlType::ConditionalAccess);

    dispatcher.deploy(&ca).await.unwrap_err();
    assert_eq!(dispatcher.status(&ca.id).unwrap().state, DeployState::Failed);

    // Failed is not sticky; the next attempt reaches the backend again.
    dispatcher.deploy(&ca).await.unwrap_err();
    assert_eq!(dispatcher.status(&ca.id).unwrap().state, DeployState::Failed);
}

#[tokio::test(start_paused = true)]
async fn multi_command_sequences_pause_between_commands() {
    let (dispatcher, backend) = dispatcher(
        FakeBackend::default(),
        HashMap::from([(
            "DEF01.json".to_string(),
            json!({
                "steps": [
                    {"cmdlet": "New-AntiPhishPolicy", "parameters": {"Name": "P"}},
                    {"cmdlet": "New-AntiPhishRule", "parameters": {"Name": "R"}},
                ],
            }),
        )]),
    );
    let def = control("DEF01", ControlType::Defender);

    let started = tokio::time::Instant::now();
    let outcome = dispatcher.deploy(&def).await.unwrap();
    assert_eq!(outcome, DeployOutcome::Deployed);
    assert!(started.elapsed() >= std::time::Duration::from_millis(500));
    assert_eq!(
        backend.calls(),
        vec![
            "Get-OrganizationConfig".to_string(),
            "New-AntiPhishPolicy".to_string(),
            "New-AntiPhishRule".to_string(),
        ]
    );
}

#[tokio::test]
async fn command_failure_abandons_the_remainder() {
    let mut backend = FakeBackend::default();
    backend.canned.insert("New-AntiPhishPolicy".to_string(), CannedResult::Fail);
    let (dispatcher, backend) = dispatcher(
        backend,
        HashMap::from([(
            "DEF01.json".to_string(),
            json!({
                "steps": [
                    {"cmdlet": "New-AntiPhishPolicy", "parameters": {}},
                    {"cmdlet": "New-AntiPhishRule", "parameters": {}},
                ],
            }),
        )]),
    );
    let def = control("DEF01", ControlType::Defender);

    dispatcher.deploy(&def).await.unwrap_err();
    let record = dispatcher.status(&def.id).unwrap();
    assert_eq!(record.state, DeployState::Failed);
    assert!(record.detail.starts_with("New-AntiPhishPolicy:"));
    assert!(!backend.calls().contains(&"New-AntiPhishRule".to_string()));
}

#[tokio::test]
async fn empty_payload_is_a_failure() {
    let (dispatcher, _backend) = dispatcher(
        FakeBackend::default(),
        HashMap::from([("ENT01.json".to_string(), json!({"graphApiCalls": []}))]),
    );
    let entra = control("ENT01", ControlType::Entra);

    let err = dispatcher.deploy(&entra).await.unwrap_err();
    assert!(matches!(err, DeployError::NoPayload));
    assert_eq!(dispatcher.status(&entra.id).unwrap().state, DeployState::Failed);
}

// ============================================================================
// SECTION: Bulk Runs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn bulk_counts_outcomes_and_never_aborts() {
    let mut backend = FakeBackend::default();
    backend.canned.insert(
        "/v1.0/identity/conditionalAccess/policies".to_string(),
        CannedResult::Conflict,
    );
    let (dispatcher, _backend) = dispatcher(
        backend,
        HashMap::from([
            ("CA01.json".to_string(), ca_document()),
            (
                "INT01.json".to_string(),
                json!({"@odata.type": "#microsoft.graph.windows10GeneralConfiguration"}),
            ),
        ]),
    );

    let batch = vec![
        control("CA01", ControlType::ConditionalAccess),
        control("INT01", ControlType::Intune),
        control("TMS01", ControlType::Teams),
    ];
    let outcome = dispatcher.deploy_bulk(&batch).await;
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.exists, 1);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
}

// ============================================================================
// SECTION: Session Reset
// ============================================================================

#[tokio::test]
async fn clear_drops_statuses_and_preflight_flags() {
    let (dispatcher, backend) = dispatcher(
        FakeBackend::default(),
        HashMap::from([("CA01.json".to_string(), ca_document())]),
    );
    let ca = control("CA01", ControlType::ConditionalAccess);

    dispatcher.deploy(&ca).await.unwrap();
    dispatcher.clear();
    assert!(dispatcher.status(&ca.id).is_none());
    assert!(dispatcher.statuses().is_empty());

    // The next deploy must probe again.
    dispatcher.deploy(&ca).await.unwrap();
    let probes = backend.calls().iter().filter(|call| *call == "/v1.0/me").count();
    assert_eq!(probes, 2);
}
