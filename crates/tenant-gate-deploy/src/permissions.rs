// crates/tenant-gate-deploy/src/permissions.rs
// ============================================================================
// Module: Permission Lookups
// Description: Advisory permission and role requirements per control.
// Purpose: Tell operators what to grant before a deployment is attempted.
// Dependencies: tenant-gate-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use tenant_gate_core::ControlId;
use tenant_gate_core::ControlType;
use tenant_gate_core::DeployMethod;
use tenant_gate_core::resolve_method;

// ============================================================================
// SECTION: Lookups
// ============================================================================

/// Returns the delegated permissions a deployment of this control needs.
#[must_use]
pub fn required_permissions(control_type: ControlType, id: &ControlId) -> Vec<&'static str> {
    match resolve_method(control_type, id) {
        DeployMethod::Graph => match control_type {
            ControlType::ConditionalAccess => vec!["Policy.ReadWrite.ConditionalAccess"],
            ControlType::Intune => vec![
                "DeviceManagementManagedDevices.ReadWrite.All",
                "DeviceManagementConfiguration.ReadWrite.All",
            ],
            ControlType::Entra => vec![
                "Policy.ReadWrite.Authorization",
                "Directory.ReadWrite.All",
                "Policy.ReadWrite.AuthenticationMethod",
            ],
            ControlType::DefenderEndpoint => vec!["DeviceManagementConfiguration.ReadWrite.All"],
            _ => Vec::new(),
        },
        DeployMethod::ExoInvoke => vec!["Exchange.Manage (delegated)"],
        DeployMethod::CcInvoke => vec!["Compliance Center (delegated)"],
        DeployMethod::SpoGraph => vec!["SharePointTenantSettings.ReadWrite.All"],
        DeployMethod::PsOnly => Vec::new(),
    }
}

/// Returns the administrator roles expected for a control type.
#[must_use]
pub fn required_roles(control_type: ControlType) -> Vec<&'static str> {
    match control_type {
        ControlType::ConditionalAccess => {
            vec!["Conditional Access Administrator", "Security Administrator"]
        }
        ControlType::Intune => vec!["Intune Administrator"],
        ControlType::Entra => vec!["Global Administrator"],
        ControlType::DefenderEndpoint => vec!["Security Administrator", "Intune Administrator"],
        ControlType::Defender => vec!["Security Administrator"],
        ControlType::Exchange => vec!["Exchange Administrator"],
        ControlType::Sharepoint => vec!["SharePoint Administrator"],
        ControlType::Teams => vec!["Teams Administrator"],
        ControlType::Purview => vec!["Compliance Administrator"],
    }
}
