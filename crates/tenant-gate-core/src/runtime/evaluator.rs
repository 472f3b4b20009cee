// crates/tenant-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Condition Evaluator
// Description: Path resolution and condition operators over JSON candidates.
// Purpose: Decide whether one candidate object satisfies one condition.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Evaluation is total over candidate shape: a missing field is an ordinary
//! absent value, never an error. Absence satisfies the negative operators
//! (`notEquals`, `notExists`, `isEmpty`) and fails the positive ones. The
//! only evaluation error is a malformed rule, such as a binary operator
//! missing its expected value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::rule::Condition;
use crate::core::rule::ConditionOp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Condition evaluation errors.
///
/// # Invariants
/// - Raised only for malformed rules, never for candidate shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// A binary operator was given no expected value.
    #[error("condition on `{path}` uses a binary operator without a value")]
    MissingValue {
        /// Path of the offending condition.
        path: String,
    },
    /// A set operator was given no expected value list.
    #[error("condition on `{path}` uses a set operator without values")]
    MissingValues {
        /// Path of the offending condition.
        path: String,
    },
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves a dot-separated path against a JSON object.
///
/// Each segment indexes into an object; traversal through a non-object or a
/// missing key yields `None`. An explicit `null` leaf resolves as present.
#[must_use]
pub fn resolve_path<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = object;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Containment check shared by the `contains` family.
///
/// Arrays contain by value equality; strings contain string expected values
/// as substrings. Any other candidate shape does not contain anything.
fn contains_value(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        Value::String(text) => expected.as_str().is_some_and(|needle| text.contains(needle)),
        _ => false,
    }
}

/// Emptiness check for `isEmpty` and `isNotEmpty`.
///
/// Absent and `null` values are empty; arrays and strings are empty at zero
/// length; every other shape is non-empty.
fn is_empty(resolved: Option<&Value>) -> bool {
    match resolved {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates one condition against a candidate object.
///
/// # Errors
///
/// Returns [`EvalError`] when the condition pairs a binary or set operator
/// with no expected value. Candidate shape never errors.
pub fn evaluate_condition(candidate: &Value, condition: &Condition) -> Result<bool, EvalError> {
    let resolved = resolve_path(candidate, &condition.path);
    match condition.op {
        ConditionOp::Equals => {
            let expected = expect_value(condition)?;
            Ok(resolved.is_some_and(|actual| actual == expected))
        }
        ConditionOp::NotEquals => {
            let expected = expect_value(condition)?;
            Ok(resolved.is_none_or(|actual| actual != expected))
        }
        ConditionOp::Contains => {
            let expected = expect_value(condition)?;
            Ok(resolved.is_some_and(|actual| contains_value(actual, expected)))
        }
        ConditionOp::ContainsAny => {
            let expected = expect_values(condition)?;
            Ok(resolved.is_some_and(|actual| {
                expected.iter().any(|value| contains_value(actual, value))
            }))
        }
        ConditionOp::ContainsAll => {
            let expected = expect_values(condition)?;
            Ok(resolved.is_some_and(|actual| {
                expected.iter().all(|value| contains_value(actual, value))
            }))
        }
        ConditionOp::IsEmpty => Ok(is_empty(resolved)),
        ConditionOp::IsNotEmpty => Ok(!is_empty(resolved)),
        ConditionOp::Exists => Ok(resolved.is_some()),
        ConditionOp::NotExists => Ok(resolved.is_none()),
    }
}

/// Extracts the scalar expected value or reports a malformed rule.
fn expect_value(condition: &Condition) -> Result<&Value, EvalError> {
    condition.value.as_ref().ok_or_else(|| EvalError::MissingValue {
        path: condition.path.clone(),
    })
}

/// Extracts the expected value list or reports a malformed rule.
fn expect_values(condition: &Condition) -> Result<&[Value], EvalError> {
    condition.values.as_deref().ok_or_else(|| EvalError::MissingValues {
        path: condition.path.clone(),
    })
}
