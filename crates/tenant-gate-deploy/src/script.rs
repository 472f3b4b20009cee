// crates/tenant-gate-deploy/src/script.rs
// ============================================================================
// Module: Script Generation
// Description: PowerShell administration scripts for script-only controls.
// Purpose: Render one runnable script per specification document.
// Dependencies: serde_json, tenant-gate-core
// ============================================================================

//! ## Overview
//! Generation is pure text assembly: a banner header from the document's
//! metadata, the module requirement and connect directive for the control's
//! management surface, one parameter splat per command, and any
//! post-deployment verification lines appended verbatim. The caller may
//! pass a date label for the header; omitting it keeps output
//! deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde_json::Value;
use tenant_gate_core::ControlType;

// ============================================================================
// SECTION: Value Formatting
// ============================================================================

/// Formats a JSON value as a PowerShell literal.
///
/// Nulls, booleans, and numbers map to their PowerShell spellings; arrays
/// and objects become `@(...)` and `@{...}`; strings are quoted with
/// backtick-escaped embedded quotes.
#[must_use]
pub fn format_ps_value(value: &Value) -> String {
    match value {
        Value::Null => "$null".to_string(),
        Value::Bool(true) => "$true".to_string(),
        Value::Bool(false) => "$false".to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => {
            if items.is_empty() {
                "@()".to_string()
            } else {
                let rendered: Vec<String> = items.iter().map(format_ps_value).collect();
                format!("@({})", rendered.join(", "))
            }
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(key, field)| format!("    {key} = {}", format_ps_value(field)))
                .collect();
            format!("@{{\n{}\n}}", entries.join("\n"))
        }
        Value::String(text) => format!("\"{}\"", text.replace('"', "`\"")),
    }
}

// ============================================================================
// SECTION: Script Assembly
// ============================================================================

fn meta_str<'a>(meta: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|key| meta.get(*key).and_then(Value::as_str))
        .unwrap_or("")
}

fn header(document: &Value, module: &str, date_label: Option<&str>) -> String {
    let meta = document.get("_metadata").cloned().unwrap_or(Value::Null);
    let id = meta_str(&meta, &["id", "policyNumber"]);
    let title = meta_str(&meta, &["title", "displayName"]);
    let description = meta_str(&meta, &["description"]);

    let rule = "#".to_string() + &"=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "# {id} - {title}");
    if !description.is_empty() {
        let truncated: String = description.chars().take(120).collect();
        let ellipsis = if description.chars().count() > 120 { "..." } else { "" };
        let _ = writeln!(out, "# {truncated}{ellipsis}");
    }
    let _ = writeln!(out, "# Generated by Tenant Gate");
    if let Some(label) = date_label {
        let _ = writeln!(out, "# {label}");
    }
    let _ = writeln!(out, "{rule}");
    out.push('\n');
    let _ = writeln!(out, "#Requires -Module {module}");
    out.push('\n');
    out
}

/// Writes one `$params` splat and its invocation.
fn write_splat(out: &mut String, cmdlet: &str, parameters: &Value, skip_annotations: bool) {
    out.push_str("$params = @{\n");
    if let Value::Object(map) = parameters {
        for (key, field) in map {
            if skip_annotations && key.starts_with('_') {
                continue;
            }
            let _ = writeln!(out, "    {key} = {}", format_ps_value(field));
        }
    }
    out.push_str("}\n");
    let _ = writeln!(out, "{cmdlet} @params");
    out.push('\n');
}

fn step_cmdlet(step: &Value) -> Option<&str> {
    step.get("cmdlet").and_then(Value::as_str)
}

fn step_parameters(step: &Value) -> Value {
    step.get("parameters").cloned().unwrap_or(Value::Null)
}

fn write_steps(out: &mut String, document: &Value, comment: StepComment) {
    let Some(steps) = document.get("steps").and_then(Value::as_array) else {
        return;
    };
    for step in steps {
        let Some(cmdlet) = step_cmdlet(step) else {
            continue;
        };
        match comment {
            StepComment::Cmdlet => {
                let _ = writeln!(out, "# {cmdlet}");
            }
            StepComment::Notes => {
                if let Some(notes) = step.get("_notes").and_then(Value::as_str) {
                    let truncated: String = notes.chars().take(120).collect();
                    let _ = writeln!(out, "# {truncated}");
                }
            }
            StepComment::None => {}
        }
        write_splat(out, cmdlet, &step_parameters(step), false);
    }
}

fn has_steps(document: &Value) -> bool {
    document
        .get("steps")
        .and_then(Value::as_array)
        .is_some_and(|steps| !steps.is_empty())
}

fn write_flat(out: &mut String, document: &Value) {
    if let (Some(cmdlet), Some(parameters)) = (
        document.get("cmdlet").and_then(Value::as_str),
        document.get("parameters"),
    ) {
        write_splat(out, cmdlet, parameters, false);
    }
}

fn write_post_deployment(out: &mut String, document: &Value) {
    let Some(commands) = document.get("postDeployment").and_then(Value::as_array) else {
        return;
    };
    out.push_str("# --- Post-Deployment Verification ---\n");
    for command in commands {
        if let Some(line) = command.as_str() {
            let _ = writeln!(out, "{line}");
        }
    }
}

#[derive(Clone, Copy)]
enum StepComment {
    Cmdlet,
    Notes,
    None,
}

// ============================================================================
// SECTION: Per-Surface Generators
// ============================================================================

fn defender_script(document: &Value, date_label: Option<&str>) -> String {
    let mut out = header(document, "ExchangeOnlineManagement", date_label);
    out.push_str("# Connect to Exchange Online (required for Defender for O365 cmdlets)\n");
    out.push_str("Connect-ExchangeOnline\n\n");
    write_steps(&mut out, document, StepComment::Cmdlet);
    if !has_steps(document) {
        write_flat(&mut out, document);
    }
    write_post_deployment(&mut out, document);
    out
}

fn exchange_script(document: &Value, date_label: Option<&str>) -> String {
    let mut out = header(document, "ExchangeOnlineManagement", date_label);
    out.push_str("# Connect to Exchange Online\n");
    out.push_str("Connect-ExchangeOnline\n\n");
    write_steps(&mut out, document, StepComment::Notes);
    if !has_steps(document) {
        write_flat(&mut out, document);
    }
    write_post_deployment(&mut out, document);
    out
}

fn sharepoint_script(document: &Value, date_label: Option<&str>) -> String {
    let mut out = header(document, "PnP.PowerShell", date_label);
    out.push_str("# Connect to SharePoint Online Admin\n");
    out.push_str("# Replace <tenant> with your tenant name\n");
    out.push_str("Connect-PnPOnline -Url \"https://<tenant>-admin.sharepoint.com\" -Interactive\n\n");
    write_flat(&mut out, document);
    write_steps(&mut out, document, StepComment::Notes);
    write_post_deployment(&mut out, document);
    out
}

fn teams_script(document: &Value, date_label: Option<&str>) -> String {
    let mut out = header(document, "MicrosoftTeams", date_label);
    out.push_str("# Connect to Microsoft Teams\n");
    out.push_str("Connect-MicrosoftTeams\n\n");
    write_flat(&mut out, document);
    write_steps(&mut out, document, StepComment::None);
    write_post_deployment(&mut out, document);
    out
}

fn purview_script(document: &Value, date_label: Option<&str>) -> String {
    let mut out = header(document, "ExchangeOnlineManagement", date_label);
    out.push_str("# Connect to Security & Compliance Center\n");
    out.push_str("Connect-IPPSSession\n\n");

    if let Some(Value::Object(keyed)) = document.get("powershellCommands") {
        for (key, entry) in keyed {
            match entry {
                Value::Array(items) => {
                    let _ = writeln!(out, "# --- {key} ---");
                    for item in items {
                        if let Some(cmdlet) = item.get("cmdlet").and_then(Value::as_str) {
                            let _ = writeln!(out, "# {cmdlet}");
                            write_splat(
                                &mut out,
                                cmdlet,
                                &item.get("parameters").cloned().unwrap_or(Value::Null),
                                true,
                            );
                        }
                    }
                }
                Value::Object(_) => {
                    if let Some(cmdlet) = entry.get("cmdlet").and_then(Value::as_str) {
                        let _ = writeln!(out, "# {key}");
                        write_splat(
                            &mut out,
                            cmdlet,
                            &entry.get("parameters").cloned().unwrap_or(Value::Null),
                            true,
                        );
                    }
                }
                _ => {}
            }
        }
    }
    write_steps(&mut out, document, StepComment::None);
    write_post_deployment(&mut out, document);
    out
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Generates the administration script for a specification document.
///
/// Control types deployed purely through REST have no script; they yield a
/// single explanatory comment line.
#[must_use]
pub fn generate(document: &Value, control_type: ControlType, date_label: Option<&str>) -> String {
    match control_type {
        ControlType::Defender => defender_script(document, date_label),
        ControlType::Exchange => exchange_script(document, date_label),
        ControlType::Sharepoint => sharepoint_script(document, date_label),
        ControlType::Teams => teams_script(document, date_label),
        ControlType::Purview => purview_script(document, date_label),
        ControlType::ConditionalAccess
        | ControlType::Intune
        | ControlType::Entra
        | ControlType::DefenderEndpoint => {
            "# No PowerShell script available for this control type\n".to_string()
        }
    }
}
