// crates/tenant-gate-deploy/src/payload.rs
// ============================================================================
// Module: Payload Extraction
// Description: Per-type extraction of deployable calls from spec documents.
// Purpose: Turn one specification document into an ordered call sequence.
// Dependencies: serde_json, tenant-gate-core
// ============================================================================

//! ## Overview
//! Extraction is pure: one strategy per control type, selected after
//! per-control method overrides. Specification documents carry
//! underscore-prefixed annotation keys for human readers; those are
//! stripped, and request bodies are pruned of nulls and empty collections
//! before anything goes on the wire. The output is either a REST call
//! sequence or a remote-command sequence, never a mix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tenant_gate_core::Control;
use tenant_gate_core::ControlType;
use tenant_gate_core::DeployMethod;

// ============================================================================
// SECTION: Call Types
// ============================================================================

/// One REST call of a deployment sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestCall {
    /// Endpoint path, or an absolute URL for cross-host calls.
    pub endpoint: String,
    /// HTTP method, uppercase.
    pub method: String,
    /// Request body, when the method carries one.
    pub body: Option<Value>,
    /// Human-readable call description.
    pub description: String,
}

/// One remote command of a deployment sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Cmdlet name.
    pub cmdlet: String,
    /// Named parameters, annotation keys already stripped.
    pub parameters: Map<String, Value>,
    /// Human-readable command description.
    pub description: String,
}

/// Extracted deployment payload for one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Sequence of REST calls.
    Rest(Vec<RestCall>),
    /// Sequence of remote commands.
    Commands(Vec<Command>),
}

impl Payload {
    /// Returns true when the payload carries nothing deployable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Rest(calls) => calls.is_empty(),
            Self::Commands(commands) => commands.is_empty(),
        }
    }
}

// ============================================================================
// SECTION: Document Cleaning
// ============================================================================

const META_KEYS: [&str; 5] = ["_metadata", "_notes", "_explanation", "_note", "_modeOptions"];

/// Removes top-level annotation keys from a document.
#[must_use]
pub fn strip_meta(document: &Value) -> Value {
    let mut clone = document.clone();
    if let Value::Object(map) = &mut clone {
        for key in META_KEYS {
            map.remove(key);
        }
    }
    clone
}

/// Recursively prunes nulls, empty arrays, and emptied objects.
///
/// Arrays are mapped element-wise; only object fields are dropped.
#[must_use]
pub fn clean_payload(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(clean_payload).collect()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, field) in map {
                match field {
                    Value::Null => {}
                    Value::Array(items) if items.is_empty() => {}
                    Value::Object(_) => {
                        let cleaned = clean_payload(field);
                        if cleaned.as_object().is_some_and(|inner| !inner.is_empty()) {
                            out.insert(key.clone(), cleaned);
                        }
                    }
                    other => {
                        out.insert(key.clone(), clean_payload(other));
                    }
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Drops underscore-prefixed annotation keys from a parameter object.
fn clean_params(parameters: Option<&Value>) -> Map<String, Value> {
    let Some(Value::Object(map)) = parameters else {
        return Map::new();
    };
    map.iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn display_name(body: &Value) -> &str {
    body.get("displayName").and_then(Value::as_str).unwrap_or("")
}

// ============================================================================
// SECTION: REST Extractors
// ============================================================================

fn conditional_access(document: &Value) -> Vec<RestCall> {
    let body = clean_payload(&strip_meta(document));
    let description = format!("Create CA policy: {}", display_name(&body));
    vec![RestCall {
        endpoint: "/v1.0/identity/conditionalAccess/policies".to_string(),
        method: "POST".to_string(),
        body: Some(body),
        description,
    }]
}

/// Default remediation schedule injected into compliance policies that
/// define none; the API rejects compliance policies without one.
fn default_scheduled_actions() -> Value {
    json!([{
        "ruleName": "DefaultRule",
        "scheduledActionConfigurations": [{
            "actionType": "block",
            "gracePeriodHours": 0,
            "notificationTemplateId": "",
            "notificationMessageCCList": [],
        }],
    }])
}

fn intune(document: &Value) -> Vec<RestCall> {
    let mut body = strip_meta(document);
    let odata = body
        .get("@odata.type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_ascii_lowercase();

    let endpoint = if odata.contains("compliancepolicy") {
        let needs_default = body
            .get("scheduledActionsForRule")
            .and_then(Value::as_array)
            .is_none_or(Vec::is_empty);
        if needs_default {
            if let Value::Object(map) = &mut body {
                map.insert("scheduledActionsForRule".to_string(), default_scheduled_actions());
            }
        }
        "/v1.0/deviceManagement/deviceCompliancePolicies"
    } else {
        "/v1.0/deviceManagement/deviceConfigurations"
    };

    let description = format!("Create Intune policy: {}", display_name(&body));
    vec![RestCall {
        endpoint: endpoint.to_string(),
        method: "POST".to_string(),
        body: Some(body),
        description,
    }]
}

fn entra(document: &Value, tenant_id: Option<&str>) -> Vec<RestCall> {
    let Some(api_calls) = document.get("graphApiCalls").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut calls: Vec<(i64, RestCall)> = Vec::new();
    for api_call in api_calls {
        let method = api_call
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("PATCH")
            .to_ascii_uppercase();
        if method == "GET" {
            continue;
        }
        let mut endpoint = api_call
            .get("endpoint")
            .and_then(Value::as_str)
            .unwrap_or("")
            .replace("https://graph.microsoft.com", "");
        if let Some(tenant) = tenant_id {
            endpoint = endpoint.replace("<TENANT-ID>", tenant);
        }
        let step_order = api_call.get("stepOrder").and_then(Value::as_i64).unwrap_or(0);
        calls.push((
            step_order,
            RestCall {
                endpoint,
                method,
                body: api_call.get("body").cloned(),
                description: api_call
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            },
        ));
    }
    calls.sort_by_key(|(step_order, _)| *step_order);
    calls.into_iter().map(|(_, call)| call).collect()
}

/// Profile document keys tried in order for endpoint security controls.
const DEFENDER_ENDPOINT_KEYS: [(&str, &str, &str); 4] = [
    ("endpointSecurityPolicy", "/beta/deviceManagement/configurationPolicies", "Create endpoint security policy"),
    ("intuneProfile", "/v1.0/deviceManagement/deviceConfigurations", "Create device config"),
    ("intuneOmaUriPolicy", "/v1.0/deviceManagement/deviceConfigurations", "Create OMA-URI config"),
    ("intuneEndpointSecurityPolicy", "/beta/deviceManagement/configurationPolicies", "Create endpoint security policy"),
];

fn defender_endpoint(document: &Value) -> Vec<RestCall> {
    for (key, endpoint, label) in DEFENDER_ENDPOINT_KEYS {
        if let Some(body) = document.get(key) {
            let name = body
                .get("name")
                .or_else(|| body.get("displayName"))
                .and_then(Value::as_str)
                .unwrap_or("");
            return vec![RestCall {
                endpoint: endpoint.to_string(),
                method: "POST".to_string(),
                body: Some(body.clone()),
                description: format!("{label}: {name}"),
            }];
        }
    }
    Vec::new()
}

// ============================================================================
// SECTION: Collaboration REST Subset
// ============================================================================

/// Converts an `HH:MM:SS` timespan into seconds; malformed parts count zero.
fn timespan_seconds(timespan: &str) -> u64 {
    let mut parts = timespan.split(':');
    let mut next = || {
        parts
            .next()
            .and_then(|part| part.parse::<u64>().ok())
            .unwrap_or(0)
    };
    next() * 3600 + next() * 60 + next()
}

/// First parameter object of a step-form or flat-form document.
fn first_parameters(document: &Value) -> Value {
    document
        .get("steps")
        .and_then(Value::as_array)
        .and_then(|steps| steps.first())
        .and_then(|step| step.get("parameters"))
        .or_else(|| document.get("parameters"))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

fn spo_settings_body(id: &str, document: &Value) -> Option<Value> {
    match id {
        "SPO07" => Some(json!({
            "sharingCapability": "externalUserSharingOnly",
            "isRequireAcceptingUserToMatchInvitedUserEnabled": true,
        })),
        "SPO09" => Some(json!({"isLegacyAuthProtocolsEnabled": false})),
        "SPO13" => {
            let params = first_parameters(document);
            let domain_list = params
                .get("SharingAllowedDomainList")
                .and_then(Value::as_str)
                .unwrap_or("partner1.com partner2.com");
            let domains: Vec<&str> = domain_list
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|domain| !domain.is_empty())
                .collect();
            Some(json!({
                "sharingDomainRestrictionMode": "allowList",
                "sharingAllowedDomainList": domains,
            }))
        }
        "SPO15" => {
            let params = first_parameters(document);
            let warn_after = params
                .get("WarnAfter")
                .and_then(Value::as_str)
                .unwrap_or("00:55:00");
            let sign_out_after = params
                .get("SignOutAfter")
                .and_then(Value::as_str)
                .unwrap_or("01:00:00");
            Some(json!({
                "idleSessionSignOut": {
                    "isEnabled": true,
                    "warnAfterInSeconds": timespan_seconds(warn_after),
                    "signOutAfterInSeconds": timespan_seconds(sign_out_after),
                },
            }))
        }
        "SPO19" => Some(json!({"isResharingByExternalUsersEnabled": false})),
        _ => None,
    }
}

fn spo_graph(id: &str, document: &Value) -> Vec<RestCall> {
    let Some(body) = spo_settings_body(id, document) else {
        return Vec::new();
    };
    vec![RestCall {
        endpoint: "/v1.0/admin/sharepoint/settings".to_string(),
        method: "PATCH".to_string(),
        body: Some(body),
        description: format!("Update SharePoint tenant settings for {id}"),
    }]
}

// ============================================================================
// SECTION: Remote-Command Extractors
// ============================================================================

/// Normalizes `steps[]` entries into commands.
fn step_commands(document: &Value, describe_with_notes: bool) -> Vec<Command> {
    let Some(steps) = document.get("steps").and_then(Value::as_array) else {
        return Vec::new();
    };
    steps
        .iter()
        .filter_map(|step| {
            let cmdlet = step.get("cmdlet").and_then(Value::as_str)?;
            let description = if describe_with_notes {
                step.get("_notes")
                    .and_then(Value::as_str)
                    .unwrap_or(cmdlet)
                    .to_string()
            } else {
                cmdlet.to_string()
            };
            Some(Command {
                cmdlet: cmdlet.to_string(),
                parameters: clean_params(step.get("parameters")),
                description,
            })
        })
        .collect()
}

/// Normalizes the flat `{cmdlet, parameters}` form into a command.
fn flat_command(document: &Value) -> Option<Command> {
    let cmdlet = document.get("cmdlet").and_then(Value::as_str)?;
    document.get("parameters")?;
    Some(Command {
        cmdlet: cmdlet.to_string(),
        parameters: clean_params(document.get("parameters")),
        description: cmdlet.to_string(),
    })
}

fn steps_or_flat(document: &Value, describe_with_notes: bool) -> Vec<Command> {
    let commands = step_commands(document, describe_with_notes);
    if commands.is_empty() {
        flat_command(document).into_iter().collect()
    } else {
        commands
    }
}

fn defender_commands(document: &Value) -> Vec<Command> {
    steps_or_flat(document, false)
}

fn exchange_commands(id: &str, document: &Value) -> Vec<Command> {
    // EXO02 verifies a DNS record; there is nothing to deploy remotely.
    if id == "EXO02" {
        return Vec::new();
    }
    steps_or_flat(document, true)
}

/// Purview documents key commands semantically under `powershellCommands`;
/// values are single command objects or arrays thereof. `steps[]` entries
/// are appended after the keyed commands.
fn purview_commands(document: &Value) -> Vec<Command> {
    let mut commands = Vec::new();
    if let Some(Value::Object(keyed)) = document.get("powershellCommands") {
        for (key, entry) in keyed {
            match entry {
                Value::Array(items) => {
                    for item in items {
                        if let Some(cmdlet) = item.get("cmdlet").and_then(Value::as_str) {
                            commands.push(Command {
                                cmdlet: cmdlet.to_string(),
                                parameters: clean_params(item.get("parameters")),
                                description: format!("{key}: {cmdlet}"),
                            });
                        }
                    }
                }
                Value::Object(_) => {
                    if let Some(cmdlet) = entry.get("cmdlet").and_then(Value::as_str) {
                        commands.push(Command {
                            cmdlet: cmdlet.to_string(),
                            parameters: clean_params(entry.get("parameters")),
                            description: format!("{key}: {cmdlet}"),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    commands.extend(step_commands(document, false));
    commands
}

// ============================================================================
// SECTION: Extraction Entry Point
// ============================================================================

/// Extracts the deployment payload for one control.
///
/// The strategy follows the control's resolved deployment method; a
/// script-only control always yields an empty command sequence.
#[must_use]
pub fn extract_payload(control: &Control, document: &Value, tenant_id: Option<&str>) -> Payload {
    match control.deploy_method() {
        DeployMethod::Graph => Payload::Rest(match control.control_type {
            ControlType::ConditionalAccess => conditional_access(document),
            ControlType::Intune => intune(document),
            ControlType::Entra => entra(document, tenant_id),
            ControlType::DefenderEndpoint => defender_endpoint(document),
            _ => Vec::new(),
        }),
        DeployMethod::SpoGraph => Payload::Rest(spo_graph(control.id.as_str(), document)),
        DeployMethod::ExoInvoke => Payload::Commands(match control.control_type {
            ControlType::Defender => defender_commands(document),
            _ => exchange_commands(control.id.as_str(), document),
        }),
        DeployMethod::CcInvoke => Payload::Commands(purview_commands(document)),
        DeployMethod::PsOnly => Payload::Commands(Vec::new()),
    }
}
