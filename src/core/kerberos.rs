//! Kerberos ticket precondition gate
//!
//! When the session is configured Kerberos-only, every privileged
//! operation first verifies a local ticket-granting ticket exists by
//! running `klist` and scanning for `krbtgt`. The gate fails closed:
//! a missing binary, a timeout, or no match all reject the operation
//! before any directory-mutating script is built.

use crate::constants::KLIST_TIMEOUT;
use crate::core::runner::ScriptRunner;
use crate::utils::AdError;
use regex::Regex;
use std::sync::OnceLock;

fn krbtgt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // klist prints the service principal as krbtgt/REALM@REALM; matching
    // the bare name case-insensitively covers localized klist builds.
    PATTERN.get_or_init(|| Regex::new(r"(?i)krbtgt").expect("static pattern"))
}

/// True when the captured `klist` output shows a TGT.
pub fn has_ticket_granting_ticket(klist_output: &str) -> bool {
    krbtgt_pattern().is_match(klist_output)
}

/// Verify a usable TGT exists, rejecting the operation otherwise.
pub async fn ensure_ticket(runner: &dyn ScriptRunner) -> Result<(), AdError> {
    let output = runner
        .run_tool("klist", &[], KLIST_TIMEOUT)
        .await
        .map_err(|e| AdError::Precondition(format!("Kerberos ticket check failed: {}", e)))?;

    if has_ticket_granting_ticket(&output) {
        Ok(())
    } else {
        Err(AdError::Precondition(
            "No Kerberos ticket-granting ticket found; log on to the domain or run kinit"
                .to_string(),
        ))
    }
}
