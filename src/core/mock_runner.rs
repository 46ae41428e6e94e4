//! Mock script runner for testing without spawning processes
//!
//! Scripted responses are matched by substring against the invocation
//! text (the script body, or the program name plus arguments), and every
//! invocation is recorded so tests can assert what was — or was not —
//! dispatched.

use super::runner::{outcome_from_output, ScriptRunner};
use crate::utils::ExecError;
use std::sync::Mutex;
use std::time::Duration;

/// Canned response for a matched invocation
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Exit 0 with this stdout
    Output(String),
    /// Arbitrary exit outcome, run through the shared contract
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Simulated wall-clock timeout
    Timeout(Duration),
    /// Simulated spawn failure (binary unavailable)
    SpawnFailure,
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Script,
    Tool,
    Detached,
}

struct Rule {
    needle: String,
    response: MockResponse,
}

/// Scripted mock implementing [`ScriptRunner`]
#[derive(Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` whenever the invocation text contains
    /// `needle`. Earlier rules win. An empty needle matches everything.
    pub fn on(self, needle: &str, response: MockResponse) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            response,
        });
        self
    }

    /// Convenience: respond with exit 0 stdout.
    pub fn on_output(self, needle: &str, stdout: &str) -> Self {
        self.on(needle, MockResponse::Output(stdout.to_string()))
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded PowerShell script invocations.
    pub fn script_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.kind == CallKind::Script)
            .count()
    }

    fn respond(&self, kind: CallKind, text: String) -> Result<String, ExecError> {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            text: text.clone(),
        });

        let rules = self.rules.lock().unwrap();
        let rule = rules.iter().find(|r| text.contains(&r.needle));
        match rule.map(|r| r.response.clone()) {
            Some(MockResponse::Output(stdout)) => Ok(stdout.trim().to_string()),
            Some(MockResponse::Exit {
                code,
                stdout,
                stderr,
            }) => outcome_from_output(Some(code), &stdout, &stderr),
            Some(MockResponse::Timeout(bound)) => Err(ExecError::Timeout(bound)),
            Some(MockResponse::SpawnFailure) => Err(ExecError::Spawn {
                program: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "binary unavailable"),
            }),
            None => Err(ExecError::NonZeroExit {
                code: Some(1),
                message: format!("no mock response configured for: {}", text),
            }),
        }
    }
}

#[async_trait::async_trait]
impl ScriptRunner for MockRunner {
    async fn run_script(
        &self,
        script: &str,
        _payload: &str,
        _timeout: Duration,
    ) -> Result<String, ExecError> {
        self.respond(CallKind::Script, script.to_string())
    }

    async fn run_tool(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<String, ExecError> {
        let text = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.respond(CallKind::Tool, text)
    }

    fn spawn_detached(&self, program: &str, args: &[String]) -> Result<(), ExecError> {
        self.calls.lock().unwrap().push(RecordedCall {
            kind: CallKind::Detached,
            text: format!("{} {}", program, args.join(" ")),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let mock = MockRunner::new()
            .on_output("Get-ADUser", "specific")
            .on_output("", "fallback");

        let out = mock
            .run_script("Get-ADUser -Filter *", "{}", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, "specific");

        let out = mock
            .run_script("Get-ADGroup -Filter *", "{}", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, "fallback");
    }

    #[tokio::test]
    async fn unmatched_invocation_fails() {
        let mock = MockRunner::new();
        let err = mock
            .run_tool("klist", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no mock response configured"));
    }

    #[tokio::test]
    async fn invocations_are_recorded() {
        let mock = MockRunner::new().on_output("", "ok");
        let _ = mock
            .run_script("Get-ADDomain @adArgs", "{}", Duration::from_secs(1))
            .await;
        let _ = mock.run_tool("klist", &[], Duration::from_secs(1)).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, CallKind::Script);
        assert_eq!(calls[1].kind, CallKind::Tool);
        assert_eq!(mock.script_calls(), 1);
    }
}
