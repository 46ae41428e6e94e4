//! External command execution seam
//!
//! Every operation reaches the operating system through the
//! [`ScriptRunner`] trait, which allows testing the whole orchestration
//! layer against a scripted mock without spawning real processes.
//! The production implementation is `platform::PowerShellRunner`.

use crate::utils::ExecError;
use std::time::Duration;

/// Abstraction over external process execution
///
/// Implementations must uphold the executor contract:
/// - resolve with **trimmed stdout** on exit code 0;
/// - fail with stderr text (preferred), stdout text, or `"exit code N"`
///   on a non-zero exit — see [`outcome_from_output`];
/// - kill the child and fail with [`ExecError::Timeout`] when the
///   wall-clock bound expires. No retries: one attempt, one outcome.
#[async_trait::async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run a PowerShell script through the credential bootstrap.
    ///
    /// `payload` is the JSON document shipped over stdin; it carries the
    /// connection parameters, the Base64-encoded script text, and any
    /// operation secrets. Secrets never appear in process arguments.
    async fn run_script(
        &self,
        script: &str,
        payload: &str,
        timeout: Duration,
    ) -> Result<String, ExecError>;

    /// Run a plain external tool (`klist`, `net`, `sc`, `psexec`).
    async fn run_tool(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, ExecError>;

    /// Spawn a detaching GUI tool (`explorer`, `mstsc`).
    ///
    /// Such tools hand off to an existing shell process and exit
    /// immediately, so success is declared optimistically on spawn.
    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<(), ExecError>;
}

/// Build the contractual outcome from a finished process.
///
/// Shared by the real executor and the test mock so both honor the same
/// stderr-preferred error selection.
pub fn outcome_from_output(
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<String, ExecError> {
    if code == Some(0) {
        return Ok(stdout.trim().to_string());
    }

    let message = if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else if !stdout.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        match code {
            Some(n) => format!("exit code {}", n),
            None => "process terminated by signal".to_string(),
        }
    };

    Err(ExecError::NonZeroExit { code, message })
}
