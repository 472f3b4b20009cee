// crates/tenant-gate-scanner/src/scanner.rs
// ============================================================================
// Module: Tenant Scanner Runtime
// Description: Parallel source collection into whole tenant snapshots.
// Purpose: Run single-flight scans and cache the latest snapshot.
// Dependencies: thiserror, time, tokio, tracing, crate::{fetch, sources, transport}
// ============================================================================

//! ## Overview
//! A scan fans out one task per source and waits for all of them; a failed
//! source is contained as an empty slot plus an error entry, never a failed
//! scan. Only credential absence fails the run, and it does so before any
//! request leaves the process. At most one scan runs at a time; the cached
//! snapshot is replaced whole when a run completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Instant;

use tenant_gate_core::AuthError;
use tenant_gate_core::BearerToken;
use tenant_gate_core::MethodFamily;
use tenant_gate_core::ProgressSink;
use tenant_gate_core::ScanProgress;
use tenant_gate_core::SourceData;
use tenant_gate_core::SourceError;
use tenant_gate_core::TenantSnapshot;
use tenant_gate_core::TokenProvider;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

use crate::fetch::fetch_source;
use crate::sources::SCAN_SOURCES;
use crate::transport::SnapshotTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scan run errors.
///
/// # Invariants
/// - Per-source fetch failures never surface here; they are contained in
///   the snapshot's error list.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Another scan holds the single-flight guard.
    #[error("a scan is already in progress")]
    AlreadyRunning,
    /// Credential lookup failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The directory credential was never granted.
    #[error("directory token unavailable; re-authenticate and retry")]
    TokenUnavailable,
}

// ============================================================================
// SECTION: Scanner
// ============================================================================

/// Single-flight tenant scanner with a cached latest snapshot.
///
/// # Invariants
/// - At most one scan runs at a time; concurrent callers get
///   [`ScanError::AlreadyRunning`] instead of queueing.
/// - The cache is overwritten whole by each completed run.
pub struct TenantScanner<T>
where
    T: SnapshotTransport + 'static,
{
    transport: Arc<T>,
    tokens: Arc<dyn TokenProvider>,
    progress: Arc<dyn ProgressSink>,
    cache: Mutex<Option<TenantSnapshot>>,
    running: tokio::sync::Mutex<()>,
}

impl<T> TenantScanner<T>
where
    T: SnapshotTransport + 'static,
{
    /// Creates a scanner over a transport, credential source, and sink.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        tokens: Arc<dyn TokenProvider>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            transport,
            tokens,
            progress,
            cache: Mutex::new(None),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one full scan and caches the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] when a scan is already running or no directory
    /// credential is available. No request is issued in either case.
    pub async fn scan(&self) -> Result<TenantSnapshot, ScanError> {
        let _guard = self.running.try_lock().map_err(|_| ScanError::AlreadyRunning)?;

        let token = self
            .tokens
            .token(MethodFamily::Graph)
            .await?
            .ok_or(ScanError::TokenUnavailable)?;

        let total = SCAN_SOURCES.len();
        self.progress.on_scan(ScanProgress {
            completed: 0,
            total,
            current: "Initializing scan".to_string(),
        });

        let started = Instant::now();
        let mut tasks: JoinSet<(&'static str, Result<SourceData, TransportError>)> =
            JoinSet::new();
        for source in SCAN_SOURCES {
            let transport = Arc::clone(&self.transport);
            let token: BearerToken = token.clone();
            tasks.spawn(async move {
                (source.name, fetch_source(transport.as_ref(), &source, &token).await)
            });
        }

        let mut sources: BTreeMap<String, Option<SourceData>> =
            SCAN_SOURCES.iter().map(|source| (source.name.to_string(), None)).collect();
        let mut errors: Vec<SourceError> = Vec::new();
        let mut completed = 0_usize;

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((name, Ok(data))) => {
                    self.publish_progress(completed, total, name);
                    sources.insert(name.to_string(), Some(data));
                }
                Ok((name, Err(err))) => {
                    self.publish_progress(completed, total, name);
                    warn!(source = name, error = %err, "scan source failed");
                    errors.push(SourceError {
                        source: name.to_string(),
                        message: err.to_string(),
                    });
                }
                Err(join_err) => {
                    self.publish_progress(completed, total, "scan");
                    warn!(error = %join_err, "scan task aborted");
                    errors.push(SourceError {
                        source: "scan".to_string(),
                        message: format!("scan task aborted: {join_err}"),
                    });
                }
            }
        }

        let account = self.tokens.account().await;
        let success_count = sources.values().filter(|slot| slot.is_some()).count();
        let snapshot = TenantSnapshot {
            sources,
            errors,
            elapsed: started.elapsed(),
            taken_at: OffsetDateTime::now_utc(),
            tenant_id: account.as_ref().and_then(|info| info.tenant_id.clone()),
            scanned_by: account.as_ref().and_then(|info| info.email.clone()),
            source_count: total,
            success_count,
        };

        if snapshot.errors.is_empty() {
            info!(
                sources = snapshot.source_count,
                elapsed_ms = snapshot.elapsed.as_millis() as u64,
                "tenant scan completed"
            );
        } else {
            warn!(
                sources = snapshot.source_count,
                failed = snapshot.errors.len(),
                elapsed_ms = snapshot.elapsed.as_millis() as u64,
                "tenant scan completed with errors"
            );
        }

        self.store(Some(snapshot.clone()));
        self.progress.on_scan(ScanProgress {
            completed: total,
            total,
            current: "Complete".to_string(),
        });
        Ok(snapshot)
    }

    fn publish_progress(&self, completed: usize, total: usize, current: &str) {
        self.progress.on_scan(ScanProgress {
            completed,
            total,
            current: current.to_string(),
        });
    }

    fn store(&self, snapshot: Option<TenantSnapshot>) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Returns a copy of the latest completed snapshot, when one exists.
    #[must_use]
    pub fn latest(&self) -> Option<TenantSnapshot> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns true when a completed snapshot is cached.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Returns true while a scan holds the single-flight guard.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Drops the cached snapshot.
    pub fn clear(&self) {
        self.store(None);
    }
}
