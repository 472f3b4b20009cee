// crates/tenant-gate-core/src/core/control.rs
// ============================================================================
// Module: Controls and Deployment Methods
// Description: Control catalog entries and deployment-method resolution.
// Purpose: Classify every control by type and backend protocol family.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A control is one compliance requirement backed by a specification
//! document. Its deployment method is resolved from a per-control override
//! table first and a per-type default second; controls covered by neither
//! fall back to script-only remediation. Both tables are closed enum matches
//! so a new control type cannot silently inherit an unintended default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Control Identifier
// ============================================================================

/// Unique identifier for a control within the catalog.
///
/// # Invariants
/// - Identity of a control is its id; ids are unique in a loaded catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    /// Creates a control identifier from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControlId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Control Types
// ============================================================================

/// Product area a control belongs to.
///
/// # Invariants
/// - Variants are stable for serialization and catalog matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlType {
    /// Conditional access policies.
    ConditionalAccess,
    /// Device management (compliance and configuration) policies.
    Intune,
    /// Directory-level tenant settings.
    Entra,
    /// Endpoint security policies.
    DefenderEndpoint,
    /// Mail threat-protection policies.
    Defender,
    /// Mail transport and organization configuration.
    Exchange,
    /// Collaboration tenant settings.
    Sharepoint,
    /// Meeting and federation settings.
    Teams,
    /// Data loss prevention and records management.
    Purview,
}

// ============================================================================
// SECTION: Deployment Methods
// ============================================================================

/// Backend protocol family used to remediate a control.
///
/// # Invariants
/// - Variants are stable for serialization and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployMethod {
    /// Structured REST deployment through the directory API.
    #[serde(rename = "graph")]
    Graph,
    /// Remote-command invocation against the mail admin endpoint.
    #[serde(rename = "exo-invoke")]
    ExoInvoke,
    /// Remote-command invocation against the compliance endpoint.
    #[serde(rename = "cc-invoke")]
    CcInvoke,
    /// Partial REST subset for collaboration tenant settings.
    #[serde(rename = "spo-graph")]
    SpoGraph,
    /// No safe automated path; remediation is a generated script.
    #[serde(rename = "ps-only")]
    PsOnly,
}

impl DeployMethod {
    /// Returns the token/probe family backing this method, if any.
    ///
    /// `PsOnly` controls never touch the network and have no family.
    #[must_use]
    pub const fn family(self) -> Option<MethodFamily> {
        match self {
            Self::Graph | Self::SpoGraph => Some(MethodFamily::Graph),
            Self::ExoInvoke => Some(MethodFamily::Exchange),
            Self::CcInvoke => Some(MethodFamily::Compliance),
            Self::PsOnly => None,
        }
    }
}

impl fmt::Display for DeployMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Graph => "graph",
            Self::ExoInvoke => "exo-invoke",
            Self::CcInvoke => "cc-invoke",
            Self::SpoGraph => "spo-graph",
            Self::PsOnly => "ps-only",
        };
        f.write_str(name)
    }
}

/// Credential/probe family shared by deployment methods.
///
/// # Invariants
/// - One bearer token and one preflight flag exist per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodFamily {
    /// Directory REST API family.
    Graph,
    /// Mail admin remote-command family.
    Exchange,
    /// Compliance remote-command family.
    Compliance,
}

impl fmt::Display for MethodFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Graph => "graph",
            Self::Exchange => "exchange",
            Self::Compliance => "compliance",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SECTION: Method Resolution
// ============================================================================

/// Returns the default deployment method for a control type.
#[must_use]
pub const fn default_method(control_type: ControlType) -> DeployMethod {
    match control_type {
        ControlType::ConditionalAccess
        | ControlType::Intune
        | ControlType::Entra
        | ControlType::DefenderEndpoint => DeployMethod::Graph,
        ControlType::Defender | ControlType::Exchange => DeployMethod::ExoInvoke,
        ControlType::Purview => DeployMethod::CcInvoke,
        ControlType::Sharepoint | ControlType::Teams => DeployMethod::PsOnly,
    }
}

/// Returns the per-control deployment-method override, if one exists.
///
/// EXO02 verifies a DNS record and has no remote call; a small set of
/// collaboration controls map onto the tenant-settings REST subset.
#[must_use]
pub fn method_override(id: &ControlId) -> Option<DeployMethod> {
    match id.as_str() {
        "EXO02" => Some(DeployMethod::PsOnly),
        "SPO07" | "SPO09" | "SPO13" | "SPO15" | "SPO19" => Some(DeployMethod::SpoGraph),
        _ => None,
    }
}

/// Resolves the deployment method for a control.
///
/// The per-control override table takes precedence over the per-type
/// default map; absence of both yields [`DeployMethod::PsOnly`].
#[must_use]
pub fn resolve_method(control_type: ControlType, id: &ControlId) -> DeployMethod {
    method_override(id).unwrap_or_else(|| default_method(control_type))
}

// ============================================================================
// SECTION: Control
// ============================================================================

/// One compliance control loaded from the catalog.
///
/// # Invariants
/// - Immutable once loaded; `id` is unique within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Control identifier.
    pub id: ControlId,
    /// Product area the control belongs to.
    #[serde(rename = "type")]
    pub control_type: ControlType,
    /// Reference to the control's specification document.
    pub spec_doc_ref: String,
    /// Human-readable control name.
    pub display_name: String,
    /// Framework tags the control satisfies.
    #[serde(default)]
    pub frameworks: Vec<String>,
    /// Licence requirement, when the control needs one.
    #[serde(default)]
    pub required_licence: Option<String>,
}

impl Control {
    /// Resolves the deployment method for this control.
    #[must_use]
    pub fn deploy_method(&self) -> DeployMethod {
        resolve_method(self.control_type, &self.id)
    }
}
