// crates/tenant-gate-scanner/src/sources.rs
// ============================================================================
// Module: Scan Sources
// Description: Fixed table of tenant configuration read endpoints.
// Purpose: Name every source a snapshot collects and how each is shaped.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The source table is closed and compiled in: every snapshot has exactly
//! these slots. List sources paginate; singleton sources return one
//! document. Source names double as snapshot slot keys and as the
//! `scanSource` values referenced by match rules.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Base URL of the directory API all sources read from.
pub const GRAPH_BASE: &str = "https://graph.microsoft.com";

// ============================================================================
// SECTION: Source Table
// ============================================================================

/// Shape of a source's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// Paginated collection under a `value` array.
    List,
    /// Single JSON document.
    Singleton,
}

/// One entry of the scan source table.
///
/// # Invariants
/// - `name` is unique in [`SCAN_SOURCES`] and stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSource {
    /// Snapshot slot key and rule-facing source name.
    pub name: &'static str,
    /// Request path relative to [`GRAPH_BASE`].
    pub path: &'static str,
    /// Response shape.
    pub shape: SourceShape,
}

impl ScanSource {
    /// Returns the absolute request URL for this source.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{GRAPH_BASE}{}", self.path)
    }
}

/// Every source a scan collects, in fixed order.
pub const SCAN_SOURCES: [ScanSource; 11] = [
    ScanSource {
        name: "conditionalAccess",
        path: "/v1.0/identity/conditionalAccess/policies",
        shape: SourceShape::List,
    },
    ScanSource {
        name: "compliancePolicies",
        path: "/v1.0/deviceManagement/deviceCompliancePolicies",
        shape: SourceShape::List,
    },
    ScanSource {
        name: "deviceConfigurations",
        path: "/v1.0/deviceManagement/deviceConfigurations",
        shape: SourceShape::List,
    },
    ScanSource {
        name: "configurationPolicies",
        path: "/beta/deviceManagement/configurationPolicies",
        shape: SourceShape::List,
    },
    ScanSource {
        name: "authorizationPolicy",
        path: "/v1.0/policies/authorizationPolicy",
        shape: SourceShape::Singleton,
    },
    ScanSource {
        name: "adminConsentPolicy",
        path: "/v1.0/policies/adminConsentRequestPolicy",
        shape: SourceShape::Singleton,
    },
    ScanSource {
        name: "deviceRegistrationPolicy",
        path: "/v1.0/policies/deviceRegistrationPolicy",
        shape: SourceShape::Singleton,
    },
    ScanSource {
        name: "authMethodsPolicy",
        path: "/v1.0/policies/authenticationMethodsPolicy",
        shape: SourceShape::Singleton,
    },
    ScanSource {
        name: "authenticatorConfig",
        path: "/v1.0/policies/authenticationMethodsPolicy/authenticationMethodConfigurations/MicrosoftAuthenticator",
        shape: SourceShape::Singleton,
    },
    ScanSource {
        name: "organization",
        path: "/v1.0/organization",
        shape: SourceShape::List,
    },
    ScanSource {
        name: "groupSettings",
        path: "/v1.0/groupSettings",
        shape: SourceShape::List,
    },
];
