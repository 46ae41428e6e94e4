//! Output interpretation for external command results
//!
//! Two canonical modes, chosen by operation kind:
//!
//! - **Sentinel scan** for action operations: every generated script
//!   prints `SUCCESS:`/`ERROR:` (or a bare `OK`) on each exit path, so
//!   results classify without trusting exit codes, which are unreliable
//!   across `Invoke-Command`/remote paths.
//! - **JSON decode with salvage** for query operations: PowerShell
//!   warnings and progress text routinely pollute stdout around the
//!   `ConvertTo-Json` document, so a failed direct parse retries on the
//!   substring between the first `[`/`{` and the last `]`/`}`.

use crate::utils::AdError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Sentinel printed by generated scripts on the success path.
pub const SUCCESS_SENTINEL: &str = "SUCCESS:";

/// Sentinel printed by generated scripts on every failure path.
pub const ERROR_SENTINEL: &str = "ERROR:";

/// Prefix for per-step outcome lines emitted by multi-step scripts.
const STEP_PREFIX: &str = "STEP:";

/// Outcome of one sub-step of a multi-step operation
///
/// Multi-step scripts (create-with-memberships, password reset with flag
/// save/restore) report each best-effort step on its own line so partial
/// failure stays visible instead of collapsing into one boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Classified action output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub steps: Vec<StepOutcome>,
}

/// Classify action output by sentinel scan.
///
/// The first line starting with `ERROR:` wins; later failure lines are
/// dropped. Otherwise the first `SUCCESS:` occurrence (or a bare `OK`
/// line) means success. Output with no sentinel at all is a failure —
/// the raw text becomes the error so executor stderr still surfaces.
pub fn classify(output: &str) -> Classification {
    let steps = collect_steps(output);

    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(ERROR_SENTINEL) {
            return Classification {
                success: false,
                message: None,
                error: Some(rest.trim().to_string()),
                steps,
            };
        }
    }

    if let Some(idx) = output.find(SUCCESS_SENTINEL) {
        let rest = &output[idx + SUCCESS_SENTINEL.len()..];
        let message = rest.lines().next().unwrap_or("").trim().to_string();
        return Classification {
            success: true,
            message: Some(message),
            error: None,
            steps,
        };
    }

    if output.lines().any(|l| l.trim() == "OK") {
        return Classification {
            success: true,
            message: None,
            error: None,
            steps,
        };
    }

    let trimmed = output.trim();
    let error = if trimmed.is_empty() {
        "Command produced no recognizable status output".to_string()
    } else {
        trimmed.to_string()
    };
    Classification {
        success: false,
        message: None,
        error: Some(error),
        steps,
    }
}

fn collect_steps(output: &str) -> Vec<StepOutcome> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix(STEP_PREFIX)?;
            let (verdict, tail) = rest.split_once(' ')?;
            let success = match verdict {
                "ok" => true,
                "fail" => false,
                _ => return None,
            };
            let (step, detail) = match tail.split_once(' ') {
                Some((name, detail)) => (name.to_string(), Some(detail.trim().to_string())),
                None => (tail.to_string(), None),
            };
            Some(StepOutcome {
                step,
                success,
                detail,
            })
        })
        .collect()
}

/// Decode query output into a list of JSON values.
///
/// Empty output yields `[]` (list-returning cmdlets print nothing for an
/// empty result set). A single object is normalized into a one-element
/// list, because `ConvertTo-Json` unwraps one-element pipelines.
pub fn parse_records(output: &str) -> Result<Vec<Value>, AdError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value = decode_with_salvage(trimmed)?;
    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

/// Decode query output into typed records via [`parse_records`].
pub fn parse_typed<T: DeserializeOwned>(output: &str) -> Result<Vec<T>, AdError> {
    parse_records(output)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|e| AdError::Parse(format!("Record shape mismatch: {}", e)))
        })
        .collect()
}

fn decode_with_salvage(trimmed: &str) -> Result<Value, AdError> {
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let salvaged = salvage_slice(trimmed).ok_or_else(|| {
                AdError::Parse(parse_error_with_snippet(direct_err, trimmed))
            })?;
            serde_json::from_str(salvaged)
                .map_err(|e| AdError::Parse(parse_error_with_snippet(e, trimmed)))
        }
    }
}

/// Slice from the first `[`/`{` to the last `]`/`}`.
///
/// Handles warning/progress noise before and after the JSON document.
/// Returns None when no plausible document boundary exists.
fn salvage_slice(raw: &str) -> Option<&str> {
    let start = raw.find(['[', '{'])?;
    let end = raw.rfind([']', '}'])?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse failure message carrying a bounded preview of the raw output,
/// which usually reveals the stray warning or truncation at fault.
fn parse_error_with_snippet(err: serde_json::Error, raw: &str) -> String {
    let preview: String = raw.chars().take(400).collect();
    format!("Failed to parse command output: {} (raw: {})", err, preview)
}
