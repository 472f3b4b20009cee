// crates/tenant-gate-core/src/lib.rs
// ============================================================================
// Module: Tenant Gate Core Library
// Description: Public API surface for the Tenant Gate core.
// Purpose: Expose the control catalog model, rule evaluation, and match engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Tenant Gate core provides the shared data model for compliance controls,
//! deterministic rule evaluation against tenant snapshots, and the match
//! engine that classifies each control. It performs no I/O and integrates
//! with scanners and dispatchers through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::AccountInfo;
pub use interfaces::AuthError;
pub use interfaces::BearerToken;
pub use interfaces::BulkProgress;
pub use interfaces::NullProgress;
pub use interfaces::ProgressSink;
pub use interfaces::SpecLoadError;
pub use interfaces::SpecLoader;
pub use interfaces::TokenProvider;
pub use runtime::evaluator::EvalError;
pub use runtime::evaluator::evaluate_condition;
pub use runtime::evaluator::resolve_path;
pub use runtime::matcher::match_all;
pub use runtime::matcher::match_control;
pub use runtime::matcher::summarize;
