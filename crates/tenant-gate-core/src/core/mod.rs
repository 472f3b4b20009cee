// crates/tenant-gate-core/src/core/mod.rs
// ============================================================================
// Module: Tenant Gate Core Types
// Description: Control catalog, rules, snapshots, and result types.
// Purpose: Define the shared data model used across scanner and dispatcher.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types are plain data: controls and rules are load-time and read-only,
//! snapshots are produced fresh per scan, and match results are recomputed
//! on demand. Nothing in this module performs I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod control;
pub mod result;
pub mod rule;
pub mod snapshot;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use control::Control;
pub use control::ControlId;
pub use control::ControlType;
pub use control::DeployMethod;
pub use control::MethodFamily;
pub use control::default_method;
pub use control::method_override;
pub use control::resolve_method;
pub use result::DeployState;
pub use result::DeploymentRecord;
pub use result::MatchResult;
pub use result::MatchStatus;
pub use result::MatchedItem;
pub use rule::Condition;
pub use rule::ConditionOp;
pub use rule::EvaluatedRule;
pub use rule::MatchMode;
pub use rule::ManualRule;
pub use rule::Rule;
pub use rule::RuleCatalog;
pub use rule::RuleCatalogError;
pub use snapshot::ScanProgress;
pub use snapshot::SourceData;
pub use snapshot::SourceError;
pub use snapshot::TenantSnapshot;
pub use summary::MatchSummary;
