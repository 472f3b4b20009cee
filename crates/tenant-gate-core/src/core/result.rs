// crates/tenant-gate-core/src/core/result.rs
// ============================================================================
// Module: Match and Deployment Results
// Description: Per-control classification and deployment state records.
// Purpose: Represent matcher output and the dispatcher state machine.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! A match result classifies one control against one snapshot; results are
//! recomputed from scratch on every run and never persisted. Deployment
//! records track the dispatcher state machine, whose successful terminal
//! states are sticky until explicitly cleared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::control::ControlId;
use crate::core::control::ControlType;
use crate::core::control::DeployMethod;

// ============================================================================
// SECTION: Match Status
// ============================================================================

/// Classification of one control against a snapshot.
///
/// # Invariants
/// - Variants are stable for serialization and downstream filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// The rule's conditions held against the snapshot.
    Configured,
    /// The rule's conditions did not hold.
    Missing,
    /// The control requires out-of-band verification.
    Manual,
    /// The rule's scan source is absent from the snapshot.
    NotScanned,
    /// Evaluation could not complete.
    Error,
}

// ============================================================================
// SECTION: Matched Items
// ============================================================================

/// Evidence item backing a configured classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedItem {
    /// Display label derived from the matched object.
    pub display_name: String,
    /// Object identifier, when the matched object carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl MatchedItem {
    /// Derives an evidence item from a matched object.
    ///
    /// The label falls back through `displayName`, `name`, and `id`; an
    /// object carrying none of them is labelled `(unnamed)`.
    #[must_use]
    pub fn from_object(object: &Value) -> Self {
        let display_name = ["displayName", "name", "id"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .unwrap_or("(unnamed)")
            .to_string();
        let id = object.get("id").and_then(Value::as_str).map(str::to_string);
        Self {
            display_name,
            id,
        }
    }
}

// ============================================================================
// SECTION: Match Result
// ============================================================================

/// Outcome of classifying one control against one snapshot.
///
/// # Invariants
/// - `matched_items` is non-empty only for `Configured` results over list
///   sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Control the result belongs to.
    pub control_id: ControlId,
    /// Product area of the control.
    pub control_type: ControlType,
    /// Classification outcome.
    pub status: MatchStatus,
    /// Resolved deployment method for the control.
    pub method: DeployMethod,
    /// Human-readable explanation of the outcome.
    pub detail: String,
    /// Evidence items for configured list matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_items: Vec<MatchedItem>,
    /// Verification command for manual controls, when the rule carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_command: Option<String>,
}

// ============================================================================
// SECTION: Deployment State
// ============================================================================

/// Dispatcher state for one control.
///
/// # Invariants
/// - `Success`, `Exists`, and `Failed` are terminal for one attempt.
/// - `Success` and `Exists` are sticky: later attempts return the recorded
///   outcome until the record is cleared. `Failed` is re-enterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    /// Deployment calls are in flight.
    Deploying,
    /// Every call for the control succeeded.
    Success,
    /// The backend reported the configuration already present.
    Exists,
    /// A call failed and the remainder were abandoned.
    Failed,
}

impl DeployState {
    /// Returns true when the state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Exists | Self::Failed)
    }
}

/// Timestamped deployment state for one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Current dispatcher state.
    pub state: DeployState,
    /// Human-readable detail for the state.
    pub detail: String,
    /// When the state was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
