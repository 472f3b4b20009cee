// crates/tenant-gate-core/src/core/summary.rs
// ============================================================================
// Module: Match Summary
// Description: Aggregate counts over a full matching run.
// Purpose: Report configured/missing/manual/not-scanned/error totals.
// Dependencies: serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::result::MatchResult;
use crate::core::result::MatchStatus;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Aggregate counts over one matching run.
///
/// # Invariants
/// - `total` equals the sum of the five status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    /// Controls classified configured.
    pub configured: usize,
    /// Controls classified missing.
    pub missing: usize,
    /// Controls requiring manual verification.
    pub manual: usize,
    /// Controls whose scan source was unavailable.
    pub not_scanned: usize,
    /// Controls whose evaluation errored.
    pub error: usize,
    /// Total controls classified.
    pub total: usize,
}

impl MatchSummary {
    /// Tallies a summary from match results.
    #[must_use]
    pub fn tally<'a>(results: impl IntoIterator<Item = &'a MatchResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                MatchStatus::Configured => summary.configured += 1,
                MatchStatus::Missing => summary.missing += 1,
                MatchStatus::Manual => summary.manual += 1,
                MatchStatus::NotScanned => summary.not_scanned += 1,
                MatchStatus::Error => summary.error += 1,
            }
            summary.total += 1;
        }
        summary
    }
}
