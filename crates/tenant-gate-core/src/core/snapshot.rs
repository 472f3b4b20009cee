// crates/tenant-gate-core/src/core/snapshot.rs
// ============================================================================
// Module: Tenant Snapshots
// Description: Point-in-time reads of tenant configuration state.
// Purpose: Carry per-source scan data, errors, and timing metadata.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! A snapshot is one complete read of tenant configuration across all scan
//! sources. Each source occupies its own slot: list sources hold an ordered
//! item sequence with pagination metadata, singleton sources hold one
//! document, and a failed source holds `None` with its error recorded
//! alongside. Snapshots are replaced whole; there is no merging.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Source Data
// ============================================================================

/// Data fetched from one scan source.
///
/// # Invariants
/// - `has_more` is true only when the page cap truncated a list source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceData {
    /// Ordered items from a paginated list source.
    List {
        /// Items in source order across all fetched pages.
        items: Vec<Value>,
        /// Number of pages fetched.
        pages: u32,
        /// True when the page cap truncated the result.
        has_more: bool,
    },
    /// Single document from a singleton source.
    Singleton(Value),
}

/// Error recorded for a failed scan source.
///
/// # Invariants
/// - A recorded source error never fails the overall scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    /// Source name the error belongs to.
    pub source: String,
    /// Human-readable failure description.
    pub message: String,
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// One complete, timestamped read of tenant configuration.
///
/// # Invariants
/// - Every configured source has a slot; failed sources hold `None`.
/// - `errors` holds one entry per failed source.
/// - Snapshots are overwritten whole by the next scan, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSnapshot {
    /// Per-source data slots.
    pub sources: BTreeMap<String, Option<SourceData>>,
    /// Errors for sources that failed to fetch.
    pub errors: Vec<SourceError>,
    /// Wall-clock duration of the scan.
    pub elapsed: Duration,
    /// Scan completion timestamp.
    pub taken_at: OffsetDateTime,
    /// Tenant the snapshot was read from, when known.
    pub tenant_id: Option<String>,
    /// Operator identity the scan ran under, when known.
    pub scanned_by: Option<String>,
    /// Number of configured sources.
    pub source_count: usize,
    /// Number of sources that fetched successfully.
    pub success_count: usize,
}

impl TenantSnapshot {
    /// Returns the data slot for a source, when the source exists and
    /// fetched successfully.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceData> {
        self.sources.get(name).and_then(Option::as_ref)
    }
}

// ============================================================================
// SECTION: Scan Progress
// ============================================================================

/// Progress event published while a scan resolves its sources.
///
/// # Invariants
/// - `completed <= total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Sources resolved so far.
    pub completed: usize,
    /// Total sources in the scan.
    pub total: usize,
    /// Source currently resolving, or a phase label.
    pub current: String,
}
