// crates/tenant-gate-deploy/src/lib.rs
// ============================================================================
// Module: Tenant Gate Deploy Library
// Description: Public API surface for the deployment dispatcher.
// Purpose: Expose payload extraction, remote backends, dispatch, and scripts.
// Dependencies: crate::{backend, dispatcher, payload, permissions, script, token}
// ============================================================================

//! ## Overview
//! The deploy crate turns specification documents into remote configuration
//! calls. Payload extraction is pure and per-type; execution goes through
//! the [`Backend`] seam so the dispatcher state machine is testable without
//! a live tenant. Controls with no safe automated path get a generated
//! administration script instead.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod dispatcher;
pub mod payload;
pub mod permissions;
pub mod script;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::Backend;
pub use backend::DeployError;
pub use backend::HttpBackend;
pub use backend::InvokeSurface;
pub use backend::RemoteCallKind;
pub use dispatcher::BulkOutcome;
pub use dispatcher::DeployOutcome;
pub use dispatcher::Dispatcher;
pub use payload::Command;
pub use payload::Payload;
pub use payload::RestCall;
pub use payload::extract_payload;
pub use permissions::required_permissions;
pub use permissions::required_roles;
pub use script::generate;
pub use token::TokenClaims;
pub use token::decode_claims;
