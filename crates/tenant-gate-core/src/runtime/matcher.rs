// crates/tenant-gate-core/src/runtime/matcher.rs
// ============================================================================
// Module: Control Matcher
// Description: Classification of controls against a tenant snapshot.
// Purpose: Produce one match result per control from rules and scan data.
// Dependencies: serde_json, tracing, crate::{core, runtime::evaluator}
// ============================================================================

//! ## Overview
//! The matcher walks the control catalog and classifies each control exactly
//! once. Manual rules bypass scan data entirely. Evaluated rules read one
//! snapshot source: list sources are matched existentially with evidence
//! collection, singleton sources conjunctively. A malformed condition
//! demotes its candidate to non-matching rather than failing the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tracing::warn;

use crate::core::control::Control;
use crate::core::control::DeployMethod;
use crate::core::control::default_method;
use crate::core::result::MatchResult;
use crate::core::result::MatchStatus;
use crate::core::result::MatchedItem;
use crate::core::rule::Condition;
use crate::core::rule::EvaluatedRule;
use crate::core::rule::MatchMode;
use crate::core::rule::Rule;
use crate::core::rule::RuleCatalog;
use crate::core::snapshot::SourceData;
use crate::core::snapshot::TenantSnapshot;
use crate::core::summary::MatchSummary;
use crate::runtime::evaluator::evaluate_condition;

// ============================================================================
// SECTION: Condition Application
// ============================================================================

/// Applies every condition of a rule to one candidate object.
///
/// A malformed condition is logged and treated as unsatisfied for this
/// candidate; it never aborts the matching run.
fn satisfies_all(control: &Control, candidate: &Value, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| {
        match evaluate_condition(candidate, condition) {
            Ok(held) => held,
            Err(err) => {
                warn!(control = %control.id, error = %err, "condition evaluation failed");
                false
            }
        }
    })
}

// ============================================================================
// SECTION: Per-Control Matching
// ============================================================================

/// Classifies one control against a snapshot.
///
/// Manual rules classify without consulting the snapshot. Controls without
/// a rule are manual when their type has no automated path and error
/// otherwise. Evaluated rules require scan data; an absent snapshot or
/// source yields `not_scanned`.
#[must_use]
pub fn match_control(
    control: &Control,
    rule: Option<&Rule>,
    snapshot: Option<&TenantSnapshot>,
) -> MatchResult {
    let method = control.deploy_method();
    match rule {
        None => match_without_rule(control, method),
        Some(Rule::Manual(manual)) => MatchResult {
            control_id: control.id.clone(),
            control_type: control.control_type,
            status: MatchStatus::Manual,
            method,
            detail: manual.detail.clone(),
            matched_items: Vec::new(),
            verify_command: manual.verify_command.clone(),
        },
        Some(Rule::Evaluated(evaluated)) => match_evaluated(control, method, evaluated, snapshot),
    }
}

/// Classifies a control that has no rule in the catalog.
fn match_without_rule(control: &Control, method: DeployMethod) -> MatchResult {
    let (status, detail) = if default_method(control.control_type) == DeployMethod::PsOnly {
        (MatchStatus::Manual, "No automated check for this control type; verify manually".to_string())
    } else {
        (MatchStatus::Error, "No match rule defined for this control".to_string())
    };
    MatchResult {
        control_id: control.id.clone(),
        control_type: control.control_type,
        status,
        method,
        detail,
        matched_items: Vec::new(),
        verify_command: None,
    }
}

/// Classifies a control whose rule reads a snapshot source.
fn match_evaluated(
    control: &Control,
    method: DeployMethod,
    rule: &EvaluatedRule,
    snapshot: Option<&TenantSnapshot>,
) -> MatchResult {
    let mut result = MatchResult {
        control_id: control.id.clone(),
        control_type: control.control_type,
        status: MatchStatus::NotScanned,
        method,
        detail: String::new(),
        matched_items: Vec::new(),
        verify_command: None,
    };

    let Some(snapshot) = snapshot else {
        result.detail = "No scan data available; run a scan first".to_string();
        return result;
    };
    let Some(source) = snapshot.source(&rule.scan_source) else {
        result.detail = format!("Scan source `{}` was not collected", rule.scan_source);
        return result;
    };

    match (source, rule.match_mode) {
        (SourceData::List { items, .. }, MatchMode::Any) => {
            let matched: Vec<MatchedItem> = items
                .iter()
                .filter(|item| satisfies_all(control, item, &rule.conditions))
                .map(MatchedItem::from_object)
                .collect();
            if matched.is_empty() {
                result.status = MatchStatus::Missing;
                result.detail =
                    format!("No item in `{}` satisfies the rule", rule.scan_source);
            } else {
                result.status = MatchStatus::Configured;
                result.detail = format!("{} matching item(s) found", matched.len());
                result.matched_items = matched;
            }
        }
        (SourceData::List { .. }, MatchMode::All | MatchMode::Direct) => {
            result.status = MatchStatus::Error;
            result.detail = format!(
                "Rule match mode requires a singleton source but `{}` is a list",
                rule.scan_source
            );
        }
        (SourceData::Singleton(_), MatchMode::Any) => {
            result.status = MatchStatus::Error;
            result.detail = format!(
                "Rule match mode requires a list source but `{}` is a singleton",
                rule.scan_source
            );
        }
        (SourceData::Singleton(document), MatchMode::All | MatchMode::Direct) => {
            if satisfies_all(control, document, &rule.conditions) {
                result.status = MatchStatus::Configured;
                result.detail = "Tenant setting satisfies the rule".to_string();
            } else {
                result.status = MatchStatus::Missing;
                result.detail = "Tenant setting does not satisfy the rule".to_string();
            }
        }
    }
    result
}

// ============================================================================
// SECTION: Catalog Matching
// ============================================================================

/// Classifies every control in catalog order.
#[must_use]
pub fn match_all(
    controls: &[Control],
    rules: &RuleCatalog,
    snapshot: Option<&TenantSnapshot>,
) -> Vec<MatchResult> {
    controls
        .iter()
        .map(|control| match_control(control, rules.get(&control.id), snapshot))
        .collect()
}

/// Tallies aggregate counts over a matching run.
#[must_use]
pub fn summarize(results: &[MatchResult]) -> MatchSummary {
    MatchSummary::tally(results)
}
