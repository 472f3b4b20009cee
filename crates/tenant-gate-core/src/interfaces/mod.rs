// crates/tenant-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Integration Interfaces
// Description: Trait seams between the core and its I/O surroundings.
// Purpose: Decouple matching from authentication, spec storage, and progress.
// Dependencies: async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The core never performs I/O. Scanners and dispatchers supply credentials
//! through [`TokenProvider`], specification documents through [`SpecLoader`],
//! and surface progress through [`ProgressSink`]. All three are object-safe
//! so runtimes can inject fakes in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::control::ControlType;
use crate::core::control::MethodFamily;
use crate::core::snapshot::ScanProgress;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Opaque bearer credential for one method family.
///
/// # Invariants
/// - The raw secret never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw bearer secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret for request construction.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Identity of the signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Tenant the operator is signed into, when known.
    pub tenant_id: Option<String>,
    /// Operator email or user principal name, when known.
    pub email: Option<String>,
}

/// Credential acquisition errors.
///
/// # Invariants
/// - Messages never embed raw token material.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No account is signed in.
    #[error("not signed in")]
    NotSignedIn,
    /// Token acquisition failed for a family.
    #[error("token acquisition failed for {family}: {message}")]
    Acquisition {
        /// Family the acquisition targeted.
        family: MethodFamily,
        /// Failure description.
        message: String,
    },
}

/// Supplies bearer credentials per method family.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token for the family, or `None` when the family's scope
    /// was never granted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no account is signed in or acquisition
    /// fails outright.
    async fn token(&self, family: MethodFamily) -> Result<Option<BearerToken>, AuthError>;

    /// Returns the signed-in account, when one exists.
    async fn account(&self) -> Option<AccountInfo>;
}

// ============================================================================
// SECTION: Specification Storage
// ============================================================================

/// Specification document load errors.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    /// No document exists for the reference.
    #[error("specification document `{reference}` not found")]
    NotFound {
        /// Reference that failed to resolve.
        reference: String,
    },
    /// The document could not be read or parsed.
    #[error("specification document `{reference}` unreadable: {message}")]
    Unreadable {
        /// Reference that failed to load.
        reference: String,
        /// Failure description.
        message: String,
    },
}

/// Loads deployment specification documents by reference.
#[async_trait]
pub trait SpecLoader: Send + Sync {
    /// Loads the specification document for a control.
    ///
    /// # Errors
    ///
    /// Returns [`SpecLoadError`] when the reference does not resolve to a
    /// parseable document.
    async fn load(&self, control_type: ControlType, reference: &str)
    -> Result<Value, SpecLoadError>;
}

// ============================================================================
// SECTION: Progress Reporting
// ============================================================================

/// Progress event published during a bulk deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProgress {
    /// Controls dispatched so far.
    pub completed: usize,
    /// Total controls in the batch.
    pub total: usize,
    /// Control currently being dispatched.
    pub current: String,
}

/// Receives progress events from scans and bulk deployments.
///
/// Implementations must be cheap; events are published inline from the
/// operation's own task.
pub trait ProgressSink: Send + Sync {
    /// Called as a scan resolves each source.
    fn on_scan(&self, progress: ScanProgress);

    /// Called as a bulk deployment finishes each control.
    fn on_bulk(&self, progress: BulkProgress);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_scan(&self, _progress: ScanProgress) {}

    fn on_bulk(&self, _progress: BulkProgress) {}
}
