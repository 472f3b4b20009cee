// crates/tenant-gate-scanner/src/transport.rs
// ============================================================================
// Module: Snapshot Transport
// Description: HTTP seam between the scanner and the directory API.
// Purpose: Isolate network access behind a trait so scans are testable.
// Dependencies: async-trait, reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The scanner never touches `reqwest` directly; it issues GET requests
//! through [`SnapshotTransport`]. The production implementation applies the
//! per-request timeout, the bearer credential, and the eventual-consistency
//! header, and lifts API error bodies into readable messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tenant_gate_core::BearerToken;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Per-request timeout applied by the production transport.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level request errors.
///
/// # Invariants
/// - Messages never embed raw token material.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request exceeded the per-request timeout.
    #[error("request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    /// The API answered with a non-success status.
    #[error("HTTP {status}{}", fmt_detail(.message))]
    Http {
        /// Response status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },
    /// The request failed below HTTP (DNS, TLS, connect).
    #[error("network error: {0}")]
    Network(String),
    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Body(String),
}

fn fmt_detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Issues authenticated GET requests for the scanner.
#[async_trait]
pub trait SnapshotTransport: Send + Sync {
    /// Fetches a URL and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on timeout, network failure, non-success
    /// status, or an unparseable body.
    async fn get(&self, url: &str, token: &BearerToken) -> Result<Value, TransportError>;
}

// ============================================================================
// SECTION: Production Transport
// ============================================================================

/// Transport backed by a pooled HTTP client.
#[derive(Debug, Clone)]
pub struct GraphTransport {
    client: reqwest::Client,
}

impl GraphTransport {
    /// Builds a transport with the standard per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] when the client cannot be
    /// constructed, such as when no TLS backend is available.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Extracts the API error message from an error response body.
    ///
    /// Bodies follow the `{"error": {"message": ...}}` convention; anything
    /// else is passed through verbatim.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|parsed| {
                parsed
                    .get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl SnapshotTransport for GraphTransport {
    async fn get(&self, url: &str, token: &BearerToken) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token.secret()))
            .header("Content-Type", "application/json")
            .header("ConsistencyLevel", "eventual")
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(err.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|err| TransportError::Body(err.to_string()))
    }
}
