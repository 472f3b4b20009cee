// crates/tenant-gate-core/src/core/rule.rs
// ============================================================================
// Module: Match Rules
// Description: Declarative conditions classifying controls against snapshots.
// Purpose: Represent the static rule catalog loaded at process start.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Rules are static and declarative: one rule per control id, loaded once
//! from versioned JSON and never mutated. A rule is either evaluated against
//! scan data or marked manual, in which case it bypasses scanning entirely
//! and carries its own verification command.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::control::ControlId;

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Comparison operator applied to a resolved field value.
///
/// # Invariants
/// - Variants are stable for serialization and catalog matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOp {
    /// Strict equality.
    Equals,
    /// Strict inequality.
    NotEquals,
    /// Array membership, or substring when the candidate is a string.
    #[serde(alias = "includes")]
    Contains,
    /// At least one expected value is contained.
    ContainsAny,
    /// Every expected value is contained.
    ContainsAll,
    /// Absent, zero-length array, or zero-length string.
    IsEmpty,
    /// Negation of `IsEmpty`.
    IsNotEmpty,
    /// Present (absent-check only; emptiness is ignored).
    Exists,
    /// Absent.
    NotExists,
}

impl ConditionOp {
    /// Returns true when the operator takes no expected value.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::IsEmpty | Self::IsNotEmpty | Self::Exists | Self::NotExists)
    }
}

/// One declarative condition within a rule.
///
/// # Invariants
/// - `path` is a dot-separated field locator; missing intermediate segments
///   resolve to absent rather than erroring.
/// - `values` feeds the set operators; `value` feeds the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated field locator evaluated against a candidate object.
    pub path: String,
    /// Comparison operator.
    pub op: ConditionOp,
    /// Expected value for scalar operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Expected values for set operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Strategy for applying a rule's conditions to scan data.
///
/// # Invariants
/// - Variants are stable for serialization and catalog matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Existential over a collection: any item satisfying all conditions.
    Any,
    /// Conjunctive over a singleton document.
    All,
    /// Conjunctive over a singleton document (alias kept for catalogs).
    Direct,
}

/// Marker value for the `status` field of manual rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualMarker {
    /// The only accepted marker value.
    Manual,
}

/// Rule that always requires out-of-band verification.
///
/// # Invariants
/// - Manual rules bypass scanning entirely; no snapshot is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRule {
    /// Discriminator; always `manual`.
    pub status: ManualMarker,
    /// Static explanation shown to the operator.
    pub detail: String,
    /// Command the operator can run to verify the control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_command: Option<String>,
}

/// Rule evaluated against a snapshot source.
///
/// # Invariants
/// - `scan_source` names a slot of the snapshot; conditions are conjunctive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedRule {
    /// Snapshot source the rule reads.
    pub scan_source: String,
    /// Matching strategy.
    pub match_mode: MatchMode,
    /// Conditions that must all hold.
    pub conditions: Vec<Condition>,
}

/// Static rule for one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// Manual-verification rule.
    Manual(ManualRule),
    /// Snapshot-evaluated rule.
    Evaluated(EvaluatedRule),
}

// ============================================================================
// SECTION: Rule Catalog
// ============================================================================

/// Rule catalog load errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RuleCatalogError {
    /// Catalog JSON failed to parse into rules.
    #[error("rule catalog parse error: {0}")]
    Parse(String),
}

/// Immutable catalog of rules indexed by control id.
///
/// # Invariants
/// - Loaded once at startup; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    /// Rules keyed by control id.
    rules: BTreeMap<ControlId, Rule>,
}

impl RuleCatalog {
    /// Builds a catalog from pre-parsed rules.
    #[must_use]
    pub fn new(rules: BTreeMap<ControlId, Rule>) -> Self {
        Self {
            rules,
        }
    }

    /// Parses a catalog from a JSON object keyed by control id.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCatalogError::Parse`] when the document is not an
    /// object or a rule fails to deserialize.
    pub fn from_json(document: &Value) -> Result<Self, RuleCatalogError> {
        let Value::Object(map) = document else {
            return Err(RuleCatalogError::Parse("rule catalog must be a JSON object".to_string()));
        };
        let mut rules = BTreeMap::new();
        for (id, raw) in map {
            let rule: Rule = serde_json::from_value(raw.clone())
                .map_err(|err| RuleCatalogError::Parse(format!("rule {id}: {err}")))?;
            rules.insert(ControlId::new(id.clone()), rule);
        }
        Ok(Self {
            rules,
        })
    }

    /// Looks up the rule for a control id.
    #[must_use]
    pub fn get(&self, id: &ControlId) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Returns the number of rules in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when the catalog holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
