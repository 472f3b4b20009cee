// crates/tenant-gate-deploy/src/token.rs
// ============================================================================
// Module: Token Claims
// Description: Best-effort JWT payload decode for permission diagnostics.
// Purpose: Surface audience and scopes when a call is rejected.
// Dependencies: base64, serde_json
// ============================================================================

//! ## Overview
//! Rejected calls are far easier to diagnose with the token's audience and
//! granted scopes in hand. The decode is best-effort and unverified; it
//! reads claims for display only and is never used for authorization. The
//! raw token itself must never reach a log line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;
use tenant_gate_core::BearerToken;

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Display-only claims read from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Token audience.
    pub aud: String,
    /// Space-separated delegated scopes, or `(none)`.
    pub scp: String,
    /// Application role claims.
    pub roles: Vec<String>,
    /// Application id, falling back to the authorized-party claim.
    pub app_id: String,
}

/// Decodes the payload segment of a JWT for diagnostics.
///
/// Returns `None` when the token is not a three-segment JWT or the payload
/// is not valid base64url JSON.
#[must_use]
pub fn decode_claims(token: &BearerToken) -> Option<TokenClaims> {
    let payload = token.secret().split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    let scp = claims
        .get("scp")
        .and_then(Value::as_str)
        .unwrap_or("(none)")
        .to_string();
    let aud = claims.get("aud").and_then(Value::as_str).unwrap_or_default().to_string();
    let roles = claims
        .get("roles")
        .and_then(Value::as_array)
        .map(|values| {
            values.iter().filter_map(Value::as_str).map(str::to_string).collect()
        })
        .unwrap_or_default();
    let app_id = claims
        .get("appid")
        .or_else(|| claims.get("azp"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(TokenClaims {
        aud,
        scp,
        roles,
        app_id,
    })
}

/// Formats the audience/scope suffix appended to rejection messages.
#[must_use]
pub(crate) fn diagnostic_suffix(token: &BearerToken) -> String {
    match decode_claims(token) {
        Some(claims) => format!(" [aud: {} | scp: {}]", claims.aud, claims.scp),
        None => String::new(),
    }
}
