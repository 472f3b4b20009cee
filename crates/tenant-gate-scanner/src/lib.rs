// crates/tenant-gate-scanner/src/lib.rs
// ============================================================================
// Module: Tenant Gate Scanner Library
// Description: Public API surface for the tenant configuration scanner.
// Purpose: Expose the scan source table, transport seam, and scanner runtime.
// Dependencies: crate::{fetch, scanner, sources, transport}
// ============================================================================

//! ## Overview
//! The scanner reads tenant configuration from a fixed table of sources in
//! parallel and assembles one whole snapshot per run. Network access goes
//! through the [`SnapshotTransport`] seam so the runtime is testable without
//! a live tenant.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod fetch;
pub mod scanner;
pub mod sources;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use scanner::ScanError;
pub use scanner::TenantScanner;
pub use sources::GRAPH_BASE;
pub use sources::SCAN_SOURCES;
pub use sources::ScanSource;
pub use sources::SourceShape;
pub use transport::GraphTransport;
pub use transport::SnapshotTransport;
pub use transport::TransportError;
