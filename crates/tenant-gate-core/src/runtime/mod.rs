// crates/tenant-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Tenant Gate Runtime
// Description: Rule evaluation and control matching over snapshots.
// Purpose: Turn static rules plus scan data into per-control classifications.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The runtime is pure computation: the evaluator resolves field paths and
//! applies condition operators, and the matcher walks the control catalog
//! producing one classification per control. All I/O happens upstream in
//! the scanner.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod evaluator;
pub mod matcher;
