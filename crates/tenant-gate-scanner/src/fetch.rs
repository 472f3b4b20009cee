// crates/tenant-gate-scanner/src/fetch.rs
// ============================================================================
// Module: Source Fetching
// Description: Per-source fetch with list pagination and a page cap.
// Purpose: Turn one source table entry into one snapshot data slot.
// Dependencies: serde_json, tracing, url, crate::{sources, transport}
// ============================================================================

//! ## Overview
//! List sources follow the `@odata.nextLink` continuation up to a fixed page
//! cap; a continuation left over after the cap marks the slot truncated
//! rather than fetching unboundedly. Continuation links must stay on HTTPS
//! or pagination stops where it is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tenant_gate_core::BearerToken;
use tenant_gate_core::SourceData;
use tracing::warn;
use url::Url;

use crate::sources::ScanSource;
use crate::sources::SourceShape;
use crate::transport::SnapshotTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum pages followed per list source.
pub(crate) const MAX_PAGES: u32 = 3;

// ============================================================================
// SECTION: Fetching
// ============================================================================

/// Fetches one source into its snapshot data slot.
///
/// # Errors
///
/// Returns [`TransportError`] when any page request fails; partial pages are
/// discarded with the slot.
pub(crate) async fn fetch_source<T>(
    transport: &T,
    source: &ScanSource,
    token: &BearerToken,
) -> Result<SourceData, TransportError>
where
    T: SnapshotTransport + ?Sized,
{
    match source.shape {
        SourceShape::Singleton => {
            let body = transport.get(&source.url(), token).await?;
            Ok(SourceData::Singleton(body))
        }
        SourceShape::List => fetch_list(transport, source, token).await,
    }
}

/// Fetches a paginated list source, following continuations up to the cap.
async fn fetch_list<T>(
    transport: &T,
    source: &ScanSource,
    token: &BearerToken,
) -> Result<SourceData, TransportError>
where
    T: SnapshotTransport + ?Sized,
{
    let mut items: Vec<Value> = Vec::new();
    let mut next: Option<String> = Some(source.url());
    let mut pages = 0_u32;

    while let Some(url) = next.take() {
        if pages >= MAX_PAGES {
            next = Some(url);
            break;
        }
        let body = transport.get(&url, token).await?;
        if let Some(Value::Array(page_items)) = body.get("value") {
            items.extend(page_items.iter().cloned());
        }
        pages += 1;
        next = continuation(source, &body);
    }

    Ok(SourceData::List {
        items,
        pages,
        has_more: next.is_some(),
    })
}

/// Extracts and validates the continuation link of a list page.
fn continuation(source: &ScanSource, body: &Value) -> Option<String> {
    let link = body.get("@odata.nextLink").and_then(Value::as_str)?;
    match Url::parse(link) {
        Ok(parsed) if parsed.scheme() == "https" => Some(link.to_string()),
        Ok(_) | Err(_) => {
            warn!(source = source.name, "discarding malformed continuation link");
            None
        }
    }
}
