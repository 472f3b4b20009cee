// crates/tenant-gate-core/tests/condition_eval_fuzz.rs
// ============================================================================
// Module: Condition Evaluation Fuzz Tests
// Description: Property tests over arbitrary candidates and paths.
// Purpose: Validate evaluation totality and operator duality.
// Dependencies: tenant-gate-core, proptest, serde_json
// ============================================================================

//! ## Overview
//! Validates that evaluation never errors on candidate shape and that dual
//! operators stay exact negations of each other under arbitrary input.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use tenant_gate_core::Condition;
use tenant_gate_core::ConditionOp;
use tenant_gate_core::evaluate_condition;

// ============================================================================
// SECTION: Strategies
// ============================================================================

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn arb_candidate() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        arb_scalar(),
        proptest::collection::vec(arb_scalar(), 0..4).prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect()))
    })
}

fn arb_path() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,6}", 1..3).prop_map(|segments| segments.join("."))
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn unary_operators_never_error(candidate in arb_candidate(), path in arb_path()) {
        for op in [
            ConditionOp::IsEmpty,
            ConditionOp::IsNotEmpty,
            ConditionOp::Exists,
            ConditionOp::NotExists,
        ] {
            let condition = Condition {
                path: path.clone(),
                op,
                value: None,
                values: None,
            };
            prop_assert!(evaluate_condition(&candidate, &condition).is_ok());
        }
    }

    #[test]
    fn exists_and_not_exists_are_duals(candidate in arb_candidate(), path in arb_path()) {
        let exists = Condition {
            path: path.clone(),
            op: ConditionOp::Exists,
            value: None,
            values: None,
        };
        let not_exists = Condition {
            path,
            op: ConditionOp::NotExists,
            value: None,
            values: None,
        };
        let held = evaluate_condition(&candidate, &exists).unwrap();
        let negated = evaluate_condition(&candidate, &not_exists).unwrap();
        prop_assert_ne!(held, negated);
    }

    #[test]
    fn is_empty_and_is_not_empty_are_duals(candidate in arb_candidate(), path in arb_path()) {
        let empty = Condition {
            path: path.clone(),
            op: ConditionOp::IsEmpty,
            value: None,
            values: None,
        };
        let non_empty = Condition {
            path,
            op: ConditionOp::IsNotEmpty,
            value: None,
            values: None,
        };
        let held = evaluate_condition(&candidate, &empty).unwrap();
        let negated = evaluate_condition(&candidate, &non_empty).unwrap();
        prop_assert_ne!(held, negated);
    }

    #[test]
    fn equals_and_not_equals_are_duals(
        candidate in arb_candidate(),
        path in arb_path(),
        expected in arb_scalar(),
    ) {
        let equals = Condition {
            path: path.clone(),
            op: ConditionOp::Equals,
            value: Some(expected.clone()),
            values: None,
        };
        let not_equals = Condition {
            path,
            op: ConditionOp::NotEquals,
            value: Some(expected),
            values: None,
        };
        let held = evaluate_condition(&candidate, &equals).unwrap();
        let negated = evaluate_condition(&candidate, &not_equals).unwrap();
        prop_assert_ne!(held, negated);
    }

    #[test]
    fn evaluation_is_deterministic(candidate in arb_candidate(), path in arb_path()) {
        let condition = Condition {
            path,
            op: ConditionOp::Contains,
            value: Some(json!("needle")),
            values: None,
        };
        let first = evaluate_condition(&candidate, &condition).unwrap();
        let second = evaluate_condition(&candidate, &condition).unwrap();
        prop_assert_eq!(first, second);
    }
}
