//! Directory operation layer
//!
//! [`AdSession`] is the explicit context object every operation hangs
//! off: it owns the connection configuration and the [`ScriptRunner`]
//! seam, and is read-only for its lifetime — reconfiguring means
//! building a new session. Operation flow is uniform:
//!
//! validate inputs → Kerberos gate → build script → run → interpret.
//!
//! The gate sits as a guard clause at the top of every privileged
//! operation so a Kerberos-only session rejects before any script text
//! is even constructed.
//!
//! Operations are independent futures; nothing is queued or serialized,
//! and there is no ordering guarantee between a mutation and a
//! subsequent read (directory replication is not accounted for).

pub mod computers;
pub mod domain;
pub mod groups;
pub mod machine;
pub mod users;

use crate::core::interpret::{Classification, StepOutcome};
use crate::core::kerberos;
use crate::core::runner::ScriptRunner;
use crate::models::ConnectionConfig;
use crate::utils::{AdError, ExecError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Uniform result object returned to the UI
///
/// Every failure, from validation to timeout to an in-script `ERROR:`
/// sentinel, flattens into `{ success: false, error }`. Multi-step
/// operations additionally enumerate their sub-step outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepOutcome>,
}

impl CommandResult {
    pub fn from_classification(c: Classification) -> Self {
        CommandResult {
            success: c.success,
            message: c.message,
            error: c.error,
            data: None,
            steps: c.steps,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        CommandResult {
            success: false,
            message: None,
            error: Some(error.into()),
            data: None,
            steps: Vec::new(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        CommandResult {
            success: true,
            message: Some(message.into()),
            error: None,
            data: None,
            steps: Vec::new(),
        }
    }
}

impl From<&AdError> for CommandResult {
    fn from(err: &AdError) -> Self {
        CommandResult::failure(err.to_string())
    }
}

/// Directory session: connection configuration plus the execution seam
pub struct AdSession {
    config: ConnectionConfig,
    runner: Arc<dyn ScriptRunner>,
}

impl AdSession {
    /// Build a session after caller-side validation of the configuration.
    pub fn new(config: ConnectionConfig, runner: Arc<dyn ScriptRunner>) -> Result<Self, AdError> {
        config.validate()?;
        Ok(AdSession { config, runner })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub(crate) fn runner(&self) -> &dyn ScriptRunner {
        self.runner.as_ref()
    }

    /// Kerberos-only precondition gate, applied ahead of every
    /// privileged operation. Fails closed before any script is built
    /// or any directory-touching process spawned.
    pub(crate) async fn guard(&self) -> Result<(), AdError> {
        if self.config.kerberos_only {
            kerberos::ensure_ticket(self.runner.as_ref()).await?;
        }
        Ok(())
    }

    /// `-Server` value for the payload: host, or host:port when a
    /// non-default port is configured (the AD cmdlets accept both).
    fn server_binding(&self) -> String {
        if self.config.port != 0 {
            format!("{}:{}", self.config.server, self.config.port)
        } else {
            self.config.server.clone()
        }
    }

    /// Assemble the stdin payload: connection parameters, the Base64
    /// script text, and any operation extras (secrets ride here, never
    /// in script text or process arguments).
    fn build_payload(&self, script: &str, extras: Value) -> Result<String, AdError> {
        let mut payload = serde_json::Map::new();
        payload.insert("server".to_string(), json!(self.server_binding()));
        if !self.config.use_kerberos {
            payload.insert("username".to_string(), json!(self.config.username));
            payload.insert(
                "password".to_string(),
                json!(self.config.password.as_str()),
            );
        }
        payload.insert("script_b64".to_string(), json!(BASE64.encode(script)));
        if let Value::Object(extra) = extras {
            payload.extend(extra);
        }
        serde_json::to_string(&Value::Object(payload))
            .map_err(|e| AdError::Parse(format!("Failed to serialize payload: {}", e)))
    }

    /// Run an action script and classify its sentinel output.
    ///
    /// Callers validate and [`guard`](Self::guard) first; by the time a
    /// script string exists the Kerberos precondition has already passed.
    pub(crate) async fn run_action(
        &self,
        script: String,
        timeout: Duration,
    ) -> Result<Classification, AdError> {
        self.run_action_with(script, json!({}), timeout).await
    }

    /// Run an action script with payload extras.
    pub(crate) async fn run_action_with(
        &self,
        script: String,
        extras: Value,
        timeout: Duration,
    ) -> Result<Classification, AdError> {
        let payload = self.build_payload(&script, extras)?;
        let text = match self.runner.run_script(&script, &payload, timeout).await {
            Ok(stdout) => stdout,
            // A script that printed its ERROR: sentinel also exits 1;
            // the sentinel (or raw stderr) lives in the error message.
            Err(ExecError::NonZeroExit { message, .. }) => message,
            Err(other) => return Err(other.into()),
        };
        let classification = crate::core::interpret::classify(&text);
        if !classification.success {
            tracing::warn!(
                error = classification.error.as_deref().unwrap_or(""),
                "action failed"
            );
        }
        Ok(classification)
    }

    /// Run a query script and return its raw stdout for decoding.
    pub(crate) async fn run_query(
        &self,
        script: String,
        timeout: Duration,
    ) -> Result<String, AdError> {
        let payload = self.build_payload(&script, json!({}))?;
        Ok(self.runner.run_script(&script, &payload, timeout).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::mock_runner::{CallKind, MockRunner};

    #[tokio::test]
    async fn payload_carries_credentials_for_explicit_sessions() {
        let (session, _mock) = credential_session(MockRunner::new());
        let payload = session.build_payload("Get-ADDomain @adArgs", json!({})).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["username"], "CORP\\admin");
        assert_eq!(value["password"], "hunter2!");
        assert!(value["script_b64"].is_string());
    }

    #[tokio::test]
    async fn payload_omits_credentials_in_kerberos_mode() {
        let (session, _mock) = kerberos_session(MockRunner::new());
        let payload = session.build_payload("Get-ADDomain @adArgs", json!({})).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert!(value.get("username").is_none());
        assert!(value.get("password").is_none());
    }

    #[tokio::test]
    async fn payload_extras_are_merged() {
        let (session, _mock) = kerberos_session(MockRunner::new());
        let payload = session
            .build_payload("x", json!({ "new_password": "Secret123!" }))
            .unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["new_password"], "Secret123!");
    }

    #[tokio::test]
    async fn server_binding_includes_explicit_port() {
        let (session, _mock) = kerberos_session(MockRunner::new());
        assert_eq!(session.server_binding(), "dc01.corp.example.com");

        let mut config = session.config().clone();
        config.port = 636;
        let runner = Arc::new(MockRunner::new());
        let session = AdSession::new(config, runner).unwrap();
        assert_eq!(session.server_binding(), "dc01.corp.example.com:636");
    }

    #[tokio::test]
    async fn gate_rejects_without_ticket_before_any_script() {
        let mock = MockRunner::new().on_output("klist", KLIST_WITHOUT_TGT);
        let (session, runner) = kerberos_only_session(mock);

        let result = session.delete_user("jdoe").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("ticket"));

        // The klist probe ran; no PowerShell script ever did.
        assert_eq!(runner.script_calls(), 0);
        assert!(runner
            .calls()
            .iter()
            .any(|c| c.kind == CallKind::Tool && c.text.contains("klist")));
    }

    #[tokio::test]
    async fn gate_fails_closed_when_klist_is_unavailable() {
        let mock = MockRunner::new().on(
            "klist",
            crate::core::mock_runner::MockResponse::SpawnFailure,
        );
        let (session, runner) = kerberos_only_session(mock);

        let result = session.delete_user("jdoe").await;
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("Kerberos ticket check failed"));
        assert_eq!(runner.script_calls(), 0);
    }

    #[tokio::test]
    async fn gate_passes_with_ticket() {
        let mock = MockRunner::new()
            .on_output("klist", KLIST_WITH_TGT)
            .on_output("Remove-ADUser", "SUCCESS: User jdoe deleted");
        let (session, runner) = kerberos_only_session(mock);

        let result = session.delete_user("jdoe").await;
        assert!(result.success);
        assert_eq!(runner.script_calls(), 1);
    }

    #[tokio::test]
    async fn sessions_without_gate_skip_klist() {
        let mock = MockRunner::new().on_output("Remove-ADUser", "SUCCESS: User jdoe deleted");
        let (session, runner) = kerberos_session(mock);

        let result = session.delete_user("jdoe").await;
        assert!(result.success);
        assert!(!runner.calls().iter().any(|c| c.text.contains("klist")));
    }

    #[tokio::test]
    async fn command_result_flattens_errors() {
        let err = AdError::Validation("Server is required".to_string());
        let result = CommandResult::from(&err);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Server is required"));
    }
}
