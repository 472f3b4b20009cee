// crates/tenant-gate-core/tests/method_resolution.rs
// ============================================================================
// Module: Method Resolution Tests
// Description: Unit tests for deployment-method defaults and overrides.
// Purpose: Validate the override table takes precedence over type defaults.
// Dependencies: tenant-gate-core
// ============================================================================

//! ## Overview
//! Validates the two-layer method resolution: per-control overrides first,
//! per-type defaults second.

use tenant_gate_core::ControlId;
use tenant_gate_core::ControlType;
use tenant_gate_core::DeployMethod;
use tenant_gate_core::MethodFamily;
use tenant_gate_core::default_method;
use tenant_gate_core::method_override;
use tenant_gate_core::resolve_method;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn type_defaults_cover_every_control_type() {
    assert_eq!(default_method(ControlType::ConditionalAccess), DeployMethod::Graph);
    assert_eq!(default_method(ControlType::Intune), DeployMethod::Graph);
    assert_eq!(default_method(ControlType::Entra), DeployMethod::Graph);
    assert_eq!(default_method(ControlType::DefenderEndpoint), DeployMethod::Graph);
    assert_eq!(default_method(ControlType::Defender), DeployMethod::ExoInvoke);
    assert_eq!(default_method(ControlType::Exchange), DeployMethod::ExoInvoke);
    assert_eq!(default_method(ControlType::Purview), DeployMethod::CcInvoke);
    assert_eq!(default_method(ControlType::Sharepoint), DeployMethod::PsOnly);
    assert_eq!(default_method(ControlType::Teams), DeployMethod::PsOnly);
}

#[test]
fn override_table_beats_type_default() {
    let exo02 = ControlId::new("EXO02");
    assert_eq!(method_override(&exo02), Some(DeployMethod::PsOnly));
    assert_eq!(resolve_method(ControlType::Exchange, &exo02), DeployMethod::PsOnly);
}

#[test]
fn collaboration_overrides_route_to_rest_subset() {
    for id in ["SPO07", "SPO09", "SPO13", "SPO15", "SPO19"] {
        let id = ControlId::new(id);
        assert_eq!(resolve_method(ControlType::Sharepoint, &id), DeployMethod::SpoGraph);
    }
}

#[test]
fn unknown_id_falls_through_to_default() {
    let id = ControlId::new("CA01");
    assert_eq!(method_override(&id), None);
    assert_eq!(resolve_method(ControlType::ConditionalAccess, &id), DeployMethod::Graph);
}

#[test]
fn families_group_methods_by_credential() {
    assert_eq!(DeployMethod::Graph.family(), Some(MethodFamily::Graph));
    assert_eq!(DeployMethod::SpoGraph.family(), Some(MethodFamily::Graph));
    assert_eq!(DeployMethod::ExoInvoke.family(), Some(MethodFamily::Exchange));
    assert_eq!(DeployMethod::CcInvoke.family(), Some(MethodFamily::Compliance));
    assert_eq!(DeployMethod::PsOnly.family(), None);
}
