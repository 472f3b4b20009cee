// crates/tenant-gate-deploy/src/backend.rs
// ============================================================================
// Module: Deployment Backend
// Description: Remote execution seam for REST calls and remote commands.
// Purpose: Map wire responses onto the deployment error taxonomy.
// Dependencies: async-trait, reqwest, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! The dispatcher executes through [`Backend`] so its state machine never
//! touches the network in tests. The production backend maps conflict,
//! throttling, and permission rejections onto distinct error kinds, and
//! inspects nominally-successful remote-command responses for in-band
//! error records. Permission rejections carry decoded audience/scope
//! diagnostics; the raw token never appears in errors or logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tenant_gate_core::AuthError;
use tenant_gate_core::BearerToken;
use tenant_gate_core::MethodFamily;
use tenant_gate_core::SpecLoadError;
use tenant_gate_core::TokenProvider;
use thiserror::Error;
use tracing::error;

use crate::payload::Command;
use crate::payload::RestCall;
use crate::token::decode_claims;
use crate::token::diagnostic_suffix;

// ============================================================================
// SECTION: Constants
// ============================================================================

const GRAPH_BASE: &str = "https://graph.microsoft.com";
const EXCHANGE_INVOKE_BASE: &str = "https://outlook.office365.com/adminapi/beta/";
const COMPLIANCE_INVOKE_BASE: &str = "https://ps.compliance.protection.outlook.com/adminapi/beta/";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Classification of a rejected remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCallKind {
    /// The configuration already exists in the tenant.
    Conflict,
    /// The backend throttled the call; retry later.
    RateLimited,
    /// The credential lacks the required permission.
    Forbidden,
    /// Any other rejection.
    Other,
}

/// Deployment errors.
///
/// # Invariants
/// - Messages never embed raw token material.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The control has no automated path; generate a script instead.
    #[error("script-only control; generate an administration script instead")]
    ScriptOnly,
    /// The method family's preflight probe failed.
    #[error("preflight failed for {family}: {message}")]
    Preflight {
        /// Family whose probe failed.
        family: MethodFamily,
        /// Probe failure description.
        message: String,
    },
    /// The specification document yielded nothing deployable.
    #[error("no deployable payload found")]
    NoPayload,
    /// Credential lookup failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The family's credential was never granted.
    #[error("no {family} token; ensure permissions are granted and re-sign in")]
    TokenUnavailable {
        /// Family the call targeted.
        family: MethodFamily,
    },
    /// The signed-in account carries no tenant id.
    #[error("no tenant id; sign in before deploying")]
    TenantUnknown,
    /// The backend rejected a call.
    #[error("remote call rejected ({status}): {message}")]
    RemoteCall {
        /// Rejection classification.
        kind: RemoteCallKind,
        /// HTTP status of the rejection.
        status: u16,
        /// Rejection message, enriched with claim diagnostics when relevant.
        message: String,
    },
    /// A remote command reported failure inside an HTTP 200 response.
    #[error("{cmdlet}: {message}")]
    InBandCommand {
        /// Cmdlet that failed.
        cmdlet: String,
        /// Error record message.
        message: String,
    },
    /// The request failed below HTTP.
    #[error("network error: {0}")]
    Network(String),
    /// The specification document could not be loaded.
    #[error(transparent)]
    SpecLoad(#[from] SpecLoadError),
}

impl DeployError {
    /// Returns true when the error means the configuration already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RemoteCall {
                kind: RemoteCallKind::Conflict,
                ..
            }
        )
    }
}

// ============================================================================
// SECTION: Backend Trait
// ============================================================================

/// Remote-command endpoint surface.
///
/// Only the mail and compliance families expose the invoke endpoint; the
/// directory family deploys through plain REST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeSurface {
    /// Mail admin invoke endpoint.
    Exchange,
    /// Compliance invoke endpoint.
    Compliance,
}

impl InvokeSurface {
    /// Returns the credential family backing this surface.
    #[must_use]
    pub const fn family(self) -> MethodFamily {
        match self {
            Self::Exchange => MethodFamily::Exchange,
            Self::Compliance => MethodFamily::Compliance,
        }
    }

    const fn base(self) -> &'static str {
        match self {
            Self::Exchange => EXCHANGE_INVOKE_BASE,
            Self::Compliance => COMPLIANCE_INVOKE_BASE,
        }
    }
}

/// Executes deployment calls against a tenant.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Executes one REST call with the directory credential.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] on rejection, throttling, conflict, missing
    /// credentials, or transport failure.
    async fn call_rest(&self, call: &RestCall) -> Result<Value, DeployError>;

    /// Executes one remote command against an invoke surface.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] on rejection, an in-band error record,
    /// missing credentials, or transport failure.
    async fn invoke_command(
        &self,
        surface: InvokeSurface,
        command: &Command,
    ) -> Result<Value, DeployError>;
}

// ============================================================================
// SECTION: Production Backend
// ============================================================================

/// Backend executing over a pooled HTTP client.
pub struct HttpBackend {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpBackend {
    /// Builds a backend over a credential source.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Network`] when the client cannot be
    /// constructed, such as when no TLS backend is available.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, DeployError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| DeployError::Network(err.to_string()))?;
        Ok(Self {
            client,
            tokens,
        })
    }

    async fn family_token(&self, family: MethodFamily) -> Result<BearerToken, DeployError> {
        self.tokens
            .token(family)
            .await?
            .ok_or(DeployError::TokenUnavailable {
                family,
            })
    }

    /// Logs claim diagnostics for a permission rejection.
    fn log_rejection(token: &BearerToken, status: u16, context: &str) {
        if let Some(claims) = decode_claims(token) {
            error!(
                status,
                aud = %claims.aud,
                scp = %claims.scp,
                app_id = %claims.app_id,
                context,
                "call rejected for missing permissions"
            );
        }
    }

    fn body_error_message(data: Option<&Value>, text: &str) -> String {
        data.and_then(|parsed| {
            parsed
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string())
    }

    fn error_code(data: Option<&Value>) -> Option<&str> {
        data?.get("error")?.get("code")?.as_str()
    }

    /// Classifies a non-2xx REST response into the error taxonomy.
    ///
    /// A conflict detected through the error code on a non-409 status is
    /// normalized to 409 so the `exists` path sees one stable shape.
    fn rest_failure(
        token: &BearerToken,
        status: u16,
        data: Option<&Value>,
        text: &str,
        context: &str,
    ) -> DeployError {
        if status == 409
            || Self::error_code(data) == Some("ConditionalAccessPolicyAlreadyExists")
        {
            return DeployError::RemoteCall {
                kind: RemoteCallKind::Conflict,
                status: 409,
                message: "configuration already exists".to_string(),
            };
        }
        if status == 429 {
            return DeployError::RemoteCall {
                kind: RemoteCallKind::RateLimited,
                status,
                message: "rate limited; try again shortly".to_string(),
            };
        }

        let message = Self::body_error_message(data, text);
        if status == 401 || status == 403 || message.to_lowercase().contains("scope") {
            Self::log_rejection(token, status, context);
            return DeployError::RemoteCall {
                kind: RemoteCallKind::Forbidden,
                status,
                message: format!("{message}{}", diagnostic_suffix(token)),
            };
        }
        DeployError::RemoteCall {
            kind: RemoteCallKind::Other,
            status,
            message,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call_rest(&self, call: &RestCall) -> Result<Value, DeployError> {
        let token = self.family_token(MethodFamily::Graph).await?;
        let url = if call.endpoint.starts_with("http") {
            call.endpoint.clone()
        } else {
            format!("{GRAPH_BASE}{}", call.endpoint)
        };

        let method = reqwest::Method::from_bytes(call.method.as_bytes())
            .map_err(|_| DeployError::Network(format!("invalid method `{}`", call.method)))?;
        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", token.secret()))
            .header("Content-Type", "application/json");
        if let Some(body) = &call.body {
            if call.method != "GET" {
                request = request.body(body.to_string());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|err| DeployError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| DeployError::Network(err.to_string()))?;
        let data: Option<Value> = serde_json::from_str(&text).ok();

        if (200..300).contains(&status) {
            return Ok(data.unwrap_or(Value::Null));
        }
        Err(Self::rest_failure(&token, status, data.as_ref(), &text, &call.endpoint))
    }

    async fn invoke_command(
        &self,
        surface: InvokeSurface,
        command: &Command,
    ) -> Result<Value, DeployError> {
        let token = self.family_token(surface.family()).await?;
        let tenant_id = self
            .tokens
            .account()
            .await
            .and_then(|account| account.tenant_id)
            .ok_or(DeployError::TenantUnknown)?;

        let url = format!("{}{}/InvokeCommand", surface.base(), tenant_id);
        let envelope = json!({
            "CmdletInput": {
                "CmdletName": command.cmdlet,
                "Parameters": command.parameters,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token.secret()))
            .header("Content-Type", "application/json;odata.metadata=minimal")
            .header("X-ResponseFormat", "json")
            .body(envelope.to_string())
            .send()
            .await
            .map_err(|err| DeployError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| DeployError::Network(err.to_string()))?;
        let data: Option<Value> = serde_json::from_str(&text).ok();

        if (200..300).contains(&status) {
            // The invoke endpoint answers HTTP 200 even when the command
            // fails; error records travel in the body.
            if let Some(message) = in_band_error(data.as_ref()) {
                return Err(DeployError::InBandCommand {
                    cmdlet: command.cmdlet.clone(),
                    message,
                });
            }
            return Ok(data.unwrap_or(Value::Null));
        }

        let message = Self::body_error_message(data.as_ref(), &text);
        if status == 401 || status == 403 {
            Self::log_rejection(&token, status, &command.cmdlet);
            return Err(DeployError::RemoteCall {
                kind: RemoteCallKind::Forbidden,
                status,
                message: format!("{message}{}", diagnostic_suffix(&token)),
            });
        }
        Err(DeployError::RemoteCall {
            kind: RemoteCallKind::Other,
            status,
            message,
        })
    }
}

// ============================================================================
// SECTION: In-Band Error Detection
// ============================================================================

/// Extracts the failure message from a nominally-successful invoke body.
pub(crate) fn in_band_error(data: Option<&Value>) -> Option<String> {
    let data = data?;
    if let Some(records) = data.get("ErrorRecords").and_then(Value::as_array) {
        if let Some(record) = records.first() {
            let message = record
                .get("ErrorRecord")
                .and_then(|inner| inner.get("Exception"))
                .and_then(|exception| exception.get("Message"))
                .and_then(Value::as_str)
                .or_else(|| record.get("Message").and_then(Value::as_str))
                .map_or_else(
                    || record.to_string().chars().take(200).collect(),
                    str::to_string,
                );
            return Some(message);
        }
    }
    data.get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
