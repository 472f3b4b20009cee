// crates/tenant-gate-deploy/src/dispatcher.rs
// ============================================================================
// Module: Deployment Dispatcher
// Description: Sequential deployment runs with per-control state tracking.
// Purpose: Drive preflight, payload extraction, and remote execution.
// Dependencies: serde, time, tokio, tracing, crate::{backend, payload}
// ============================================================================

//! ## Overview
//! Deployment is strictly sequential: one call at a time within a control,
//! one control at a time within a batch. Each method family is probed once
//! per session with a read-only call before its first deployment; a passed
//! probe is sticky until the status map is cleared. A control whose latest
//! run ended in `success` or `exists` is not redeployed until cleared;
//! `failed` is always re-enterable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use serde::Serialize;
use serde_json::Map;
use tenant_gate_core::BulkProgress;
use tenant_gate_core::Control;
use tenant_gate_core::ControlId;
use tenant_gate_core::DeployMethod;
use tenant_gate_core::DeployState;
use tenant_gate_core::DeploymentRecord;
use tenant_gate_core::MethodFamily;
use tenant_gate_core::ProgressSink;
use tenant_gate_core::SpecLoader;
use tenant_gate_core::TokenProvider;
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::info;
use tracing::warn;

use crate::backend::Backend;
use crate::backend::DeployError;
use crate::backend::InvokeSurface;
use crate::payload::Command;
use crate::payload::Payload;
use crate::payload::RestCall;
use crate::payload::extract_payload;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Delay between consecutive commands of a multi-command control.
const COMMAND_DELAY: Duration = Duration::from_millis(500);

/// Delay between consecutive controls of a bulk run.
const BULK_DELAY: Duration = Duration::from_millis(300);

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Terminal outcome of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Every call succeeded.
    Deployed,
    /// The backend reported the configuration already present.
    AlreadyExists,
}

/// Accumulated counts of a bulk run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    /// Controls in the batch.
    pub total: usize,
    /// Controls deployed successfully.
    pub succeeded: usize,
    /// Controls already present in the tenant.
    pub exists: usize,
    /// Controls that failed.
    pub failed: usize,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Sequential deployment dispatcher with sticky terminal states.
///
/// # Invariants
/// - Calls within a control run strictly in payload order; the first
///   failure abandons the remainder.
/// - `success` and `exists` records survive later `deploy` calls until
///   [`Dispatcher::clear`].
pub struct Dispatcher<B>
where
    B: Backend,
{
    backend: Arc<B>,
    specs: Arc<dyn SpecLoader>,
    tokens: Arc<dyn TokenProvider>,
    progress: Arc<dyn ProgressSink>,
    statuses: Mutex<BTreeMap<ControlId, DeploymentRecord>>,
    preflight_passed: Mutex<BTreeSet<MethodFamily>>,
}

impl<B> Dispatcher<B>
where
    B: Backend,
{
    /// Creates a dispatcher over a backend and its collaborators.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        specs: Arc<dyn SpecLoader>,
        tokens: Arc<dyn TokenProvider>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            backend,
            specs,
            tokens,
            progress,
            statuses: Mutex::new(BTreeMap::new()),
            preflight_passed: Mutex::new(BTreeSet::new()),
        }
    }

    // ------------------------------------------------------------------
    // Preflight
    // ------------------------------------------------------------------

    /// Probes a method family once per session with a read-only call.
    async fn preflight(&self, family: MethodFamily) -> Result<(), DeployError> {
        if self
            .preflight_passed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&family)
        {
            return Ok(());
        }

        let probe = match family {
            MethodFamily::Graph => {
                self.backend
                    .call_rest(&RestCall {
                        endpoint: "/v1.0/me".to_string(),
                        method: "GET".to_string(),
                        body: None,
                        description: "Directory preflight probe".to_string(),
                    })
                    .await
            }
            MethodFamily::Exchange => {
                self.backend
                    .invoke_command(
                        InvokeSurface::Exchange,
                        &Command {
                            cmdlet: "Get-OrganizationConfig".to_string(),
                            parameters: Map::new(),
                            description: "Exchange preflight probe".to_string(),
                        },
                    )
                    .await
            }
            MethodFamily::Compliance => {
                self.backend
                    .invoke_command(
                        InvokeSurface::Compliance,
                        &Command {
                            cmdlet: "Get-DlpCompliancePolicy".to_string(),
                            parameters: Map::new(),
                            description: "Compliance preflight probe".to_string(),
                        },
                    )
                    .await
            }
        };

        match probe {
            Ok(_) => {
                info!(family = %family, "preflight passed");
                self.preflight_passed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(family);
                Ok(())
            }
            Err(err) => Err(DeployError::Preflight {
                family,
                message: err.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Single deployment
    // ------------------------------------------------------------------

    /// Deploys one control end to end.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::ScriptOnly`] without touching the status map
    /// for controls with no automated path; otherwise any preflight, spec
    /// load, extraction, or remote failure, with the status map updated to
    /// `failed`.
    pub async fn deploy(&self, control: &Control) -> Result<DeployOutcome, DeployError> {
        let method = control.deploy_method();
        let Some(family) = method.family() else {
            return Err(DeployError::ScriptOnly);
        };

        // Terminal success/exists records are sticky until cleared.
        match self.status(&control.id).map(|record| record.state) {
            Some(DeployState::Success) => return Ok(DeployOutcome::Deployed),
            Some(DeployState::Exists) => return Ok(DeployOutcome::AlreadyExists),
            _ => {}
        }

        if let Err(err) = self.preflight(family).await {
            self.set_status(
                &control.id,
                DeployState::Failed,
                &format!("Preflight failed for {method}"),
            );
            return Err(err);
        }

        self.set_status(&control.id, DeployState::Deploying, "Deploying");

        let document = match self.specs.load(control.control_type, &control.spec_doc_ref).await {
            Ok(document) => document,
            Err(err) => {
                self.set_status(&control.id, DeployState::Failed, &err.to_string());
                return Err(err.into());
            }
        };

        let tenant_id = self.tokens.account().await.and_then(|account| account.tenant_id);
        let payload = extract_payload(control, &document, tenant_id.as_deref());
        if payload.is_empty() {
            self.set_status(&control.id, DeployState::Failed, "No deployable payload found");
            return Err(DeployError::NoPayload);
        }

        let outcome = match payload {
            Payload::Rest(calls) => self.run_rest(control, &calls).await,
            Payload::Commands(commands) => self.run_commands(control, method, &commands).await,
        }?;

        if outcome == DeployOutcome::Deployed {
            self.set_status(&control.id, DeployState::Success, "Deployed successfully");
            info!(control = %control.id, "deployed");
        }
        Ok(outcome)
    }

    async fn run_rest(
        &self,
        control: &Control,
        calls: &[RestCall],
    ) -> Result<DeployOutcome, DeployError> {
        for call in calls {
            match self.backend.call_rest(call).await {
                Ok(_) => {}
                Err(err) if err.is_conflict() => {
                    self.set_status(&control.id, DeployState::Exists, "Already exists in tenant");
                    info!(control = %control.id, "already exists");
                    return Ok(DeployOutcome::AlreadyExists);
                }
                Err(err) => {
                    self.set_status(&control.id, DeployState::Failed, &err.to_string());
                    warn!(control = %control.id, error = %err, "deployment call failed");
                    return Err(err);
                }
            }
        }
        Ok(DeployOutcome::Deployed)
    }

    async fn run_commands(
        &self,
        control: &Control,
        method: DeployMethod,
        commands: &[Command],
    ) -> Result<DeployOutcome, DeployError> {
        let surface = if method == DeployMethod::CcInvoke {
            InvokeSurface::Compliance
        } else {
            InvokeSurface::Exchange
        };
        for (index, command) in commands.iter().enumerate() {
            if let Err(err) = self.backend.invoke_command(surface, command).await {
                let detail = format!("{}: {err}", command.cmdlet);
                self.set_status(&control.id, DeployState::Failed, &detail);
                warn!(control = %control.id, cmdlet = %command.cmdlet, error = %err, "command failed");
                return Err(err);
            }
            // Policy-then-rule sequences need a beat between commands.
            if commands.len() > 1 && index < commands.len() - 1 {
                sleep(COMMAND_DELAY).await;
            }
        }
        Ok(DeployOutcome::Deployed)
    }

    // ------------------------------------------------------------------
    // Bulk deployment
    // ------------------------------------------------------------------

    /// Deploys a batch of controls strictly sequentially.
    ///
    /// Item failures are counted, never propagated; the batch always runs
    /// to completion.
    pub async fn deploy_bulk(&self, controls: &[Control]) -> BulkOutcome {
        let mut outcome = BulkOutcome {
            total: controls.len(),
            ..BulkOutcome::default()
        };

        for (index, control) in controls.iter().enumerate() {
            match self.deploy(control).await {
                Ok(DeployOutcome::Deployed) => outcome.succeeded += 1,
                Ok(DeployOutcome::AlreadyExists) => outcome.exists += 1,
                Err(err) => {
                    warn!(control = %control.id, error = %err, "bulk item failed");
                    outcome.failed += 1;
                }
            }
            self.progress.on_bulk(BulkProgress {
                completed: index + 1,
                total: controls.len(),
                current: control.id.to_string(),
            });
            if index < controls.len() - 1 {
                sleep(BULK_DELAY).await;
            }
        }

        info!(
            succeeded = outcome.succeeded,
            exists = outcome.exists,
            failed = outcome.failed,
            "bulk deployment finished"
        );
        outcome
    }

    // ------------------------------------------------------------------
    // Status map
    // ------------------------------------------------------------------

    fn set_status(&self, id: &ControlId, state: DeployState, detail: &str) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.clone(),
                DeploymentRecord {
                    state,
                    detail: detail.to_string(),
                    timestamp: OffsetDateTime::now_utc(),
                },
            );
    }

    /// Returns the latest deployment record for a control.
    #[must_use]
    pub fn status(&self, id: &ControlId) -> Option<DeploymentRecord> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Returns a copy of the whole status map.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<ControlId, DeploymentRecord> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clears all deployment records and resets preflight flags.
    pub fn clear(&self) {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.preflight_passed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
