//! Real process executor
//!
//! Spawns `powershell.exe` (or `pwsh` off-Windows) and the classic admin
//! tools, enforcing one wall-clock timeout per invocation. Connection
//! parameters and secrets travel over stdin as a JSON payload consumed
//! by a fixed bootstrap, so the password never appears in process
//! arguments or script text; the operation script itself rides the
//! payload Base64-encoded to survive quoting.

use crate::core::runner::{outcome_from_output, ScriptRunner};
use crate::utils::ExecError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

#[cfg(windows)]
use crate::constants::CREATE_NO_WINDOW;

/// Bootstrap executed by every script invocation.
///
/// Reads the stdin payload, builds the PSCredential (when explicit
/// credentials are supplied), binds `$adArgs` — the `-Server` /
/// `-Credential` splat shared by every AD cmdlet — and invokes the
/// decoded operation script with `$payload`, `$cred` and `$adArgs` in
/// scope.
const BOOTSTRAP: &str = r#"$ErrorActionPreference = 'Stop'
try {
    $raw = [Console]::In.ReadToEnd()
    if ([string]::IsNullOrWhiteSpace($raw)) { throw 'No payload received' }
    $payload = $raw | ConvertFrom-Json

    $cred = $null
    if ($payload.username) {
        $pwSecure = New-Object System.Security.SecureString
        ([string]$payload.password).ToCharArray() | ForEach-Object { $pwSecure.AppendChar($_) }
        $cred = New-Object System.Management.Automation.PSCredential([string]$payload.username, $pwSecure)
    }

    $adArgs = @{}
    if ($payload.server) { $adArgs.Server = [string]$payload.server }
    if ($cred) { $adArgs.Credential = $cred }

    $scriptBytes = [System.Convert]::FromBase64String([string]$payload.script_b64)
    $scriptText = [System.Text.Encoding]::UTF8.GetString($scriptBytes)
    $sb = [ScriptBlock]::Create($scriptText)
    & $sb
} catch {
    Write-Error $_.Exception.Message
    exit 1
}"#;

fn powershell_binary() -> &'static str {
    if cfg!(windows) {
        "powershell.exe"
    } else {
        "pwsh"
    }
}

/// Production [`ScriptRunner`] backed by real subprocesses
#[derive(Default)]
pub struct PowerShellRunner;

impl PowerShellRunner {
    pub fn new() -> Self {
        PowerShellRunner
    }

    async fn run_bounded(
        mut cmd: Command,
        program: &str,
        stdin_payload: Option<&str>,
        bound: Duration,
    ) -> Result<String, ExecError> {
        cmd.stdin(if stdin_payload.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // On timeout the wait future is dropped; this makes the drop
        // kill the child instead of leaking it.
        .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if let Some(payload) = stdin_payload {
            let mut stdin = child.stdin.take().ok_or_else(|| ExecError::Spawn {
                program: program.to_string(),
                source: std::io::Error::other("failed to open stdin"),
            })?;
            stdin
                .write_all(payload.as_bytes())
                .await
                .map_err(|source| ExecError::Spawn {
                    program: program.to_string(),
                    source,
                })?;
            // Dropping stdin closes the pipe so ReadToEnd completes.
        }

        let output = timeout(bound, child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout(bound))?
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        outcome_from_output(
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

#[async_trait::async_trait]
impl ScriptRunner for PowerShellRunner {
    async fn run_script(
        &self,
        script: &str,
        payload: &str,
        bound: Duration,
    ) -> Result<String, ExecError> {
        tracing::debug!(bytes = script.len(), "dispatching script");

        let mut cmd = Command::new(powershell_binary());
        cmd.args([
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            BOOTSTRAP,
        ]);

        let result =
            Self::run_bounded(cmd, powershell_binary(), Some(payload), bound).await;
        match result {
            Ok(stdout) => Ok(stdout),
            Err(ExecError::NonZeroExit { code, message }) => {
                let redacted = redact_secret(&message, payload_password(payload).as_deref());
                tracing::warn!(?code, error = %redacted, "script failed");
                Err(ExecError::NonZeroExit {
                    code,
                    message: with_hint(&redacted),
                })
            }
            Err(other) => {
                tracing::warn!(error = %other, "script execution error");
                Err(other)
            }
        }
    }

    async fn run_tool(
        &self,
        program: &str,
        args: &[String],
        bound: Duration,
    ) -> Result<String, ExecError> {
        tracing::debug!(program, ?args, "running tool");
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::run_bounded(cmd, program, None, bound).await
    }

    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<(), ExecError> {
        tracing::debug!(program, ?args, "spawning detached");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        // The tool hands off and exits on its own; success is the spawn.
        cmd.spawn()
            .map(|_child| ())
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })
    }
}

/// Pull the password out of the stdin payload for redaction.
fn payload_password(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value
        .get("password")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Replace any echoed password in error output.
fn redact_secret(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) => text.replace(secret, "<redacted>"),
        None => text.to_string(),
    }
}

/// Append a troubleshooting hint for a handful of well-known failure
/// patterns. The raw (redacted) tool text stays intact.
fn with_hint(error: &str) -> String {
    let lower = error.to_lowercase();
    let hint = if lower.contains("trustedhosts") || lower.contains("authentication scheme") {
        Some("The target must be in TrustedHosts: Set-Item WSMan:\\localhost\\Client\\TrustedHosts -Value '*' -Force")
    } else if lower.contains("access is denied") || lower.contains("access denied") {
        Some("Check that the account has admin rights on the target.")
    } else if lower.contains("cannot find the computer") || lower.contains("cannot be resolved") {
        Some("Check the hostname is correct and resolvable.")
    } else if lower.contains("winrm cannot complete the operation")
        || lower.contains("actively refused")
    {
        Some("Ensure WinRM is enabled on the target (Enable-PSRemoting).")
    } else {
        None
    };

    match hint {
        Some(hint) => format!("{}\nHint: {}", error, hint),
        None => error.to_string(),
    }
}
