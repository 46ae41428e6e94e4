//! Remote machine operations (WMI/CIM queries, service control, tools)
//!
//! These target one computer by name over WinRM or the classic admin
//! tools (`sc`, `net`, `psexec`, `mstsc`, `explorer`). Mutating
//! operations (reboot, WinRM enablement) are fire-and-forget: there is
//! no confirmation loop beyond the immediate response text.

use super::computers::require_identity;
use super::{AdSession, CommandResult};
use crate::constants::{
    AD_OPERATION_TIMEOUT, CONNECTIVITY_TIMEOUT, PRINTER_INSTALL_TIMEOUT, SHARE_OPEN_TIMEOUT,
};
use crate::core::interpret;
use crate::core::script;
use crate::models::{DiskRecord, MachineSummary, ServiceRecord, UserProfileRecord};
use crate::utils::AdError;

/// Service control action mapped onto `sc.exe` verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
}

impl ServiceAction {
    fn sc_verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
        }
    }
}

impl AdSession {
    /// OS summary of a remote machine (Win32_OperatingSystem).
    pub async fn system_summary(&self, target: &str) -> Result<MachineSummary, AdError> {
        require_identity(target, "Computer name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::system_summary(target), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed::<MachineSummary>(&raw)?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::Parse(format!("No OS record returned for {}", target)))
    }

    /// Fixed disks of a remote machine (Win32_LogicalDisk).
    pub async fn list_disks(&self, target: &str) -> Result<Vec<DiskRecord>, AdError> {
        require_identity(target, "Computer name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::list_disks(target), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// Non-special user profiles on a remote machine (Win32_UserProfile).
    pub async fn list_profiles(&self, target: &str) -> Result<Vec<UserProfileRecord>, AdError> {
        require_identity(target, "Computer name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::list_profiles(target), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// Delete a user profile by SID on a remote machine.
    pub async fn delete_profile(&self, target: &str, sid: &str) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            if !is_sid(sid) {
                return Err(AdError::Validation(format!("Not a valid SID: {}", sid)));
            }
            self.guard().await?;
            self.run_action(script::delete_profile(target, sid), AD_OPERATION_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Query one service on a remote machine.
    pub async fn get_service(&self, target: &str, name: &str) -> Result<ServiceRecord, AdError> {
        require_identity(target, "Computer name")?;
        require_identity(name, "Service name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::get_service(target, name), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed::<ServiceRecord>(&raw)?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::Parse(format!("No service record returned for {}", name)))
    }

    /// Start or stop a service via `sc.exe`.
    pub async fn set_service_state(
        &self,
        target: &str,
        name: &str,
        action: ServiceAction,
    ) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            require_identity(name, "Service name")?;
            self.guard().await?;
            let args = vec![
                format!("\\\\{}", target),
                action.sc_verb().to_string(),
                name.to_string(),
            ];
            Ok(self
                .runner()
                .run_tool("sc", &args, AD_OPERATION_TIMEOUT)
                .await?)
        }
        .await;
        match outcome {
            Ok(stdout) => {
                let first_line = stdout.lines().next().unwrap_or("").trim().to_string();
                CommandResult::ok(format!(
                    "Service {} {} issued on {}{}",
                    name,
                    action.sc_verb(),
                    target,
                    if first_line.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", first_line)
                    }
                ))
            }
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Read one registry value from a remote machine via `reg.exe`.
    pub async fn query_registry_value(
        &self,
        target: &str,
        key: &str,
        value_name: &str,
    ) -> Result<String, AdError> {
        require_identity(target, "Computer name")?;
        require_identity(key, "Registry key")?;
        require_identity(value_name, "Value name")?;
        self.guard().await?;

        let args = vec![
            "query".to_string(),
            format!("\\\\{}\\{}", target, key),
            "/v".to_string(),
            value_name.to_string(),
        ];
        let stdout = self
            .runner()
            .run_tool("reg", &args, AD_OPERATION_TIMEOUT)
            .await?;
        parse_reg_value(&stdout, value_name)
            .ok_or_else(|| AdError::Parse(format!("Value {} not present in reg output", value_name)))
    }

    /// Reboot a remote machine. Irreversible once issued.
    pub async fn reboot_computer(&self, target: &str) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            self.guard().await?;
            self.run_action(script::reboot_computer(target), AD_OPERATION_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Enable WinRM on a remote machine via psexec (WinRM itself being
    /// unavailable is the usual reason to need this).
    pub async fn enable_winrm(&self, target: &str) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            self.guard().await?;
            let args = vec![
                format!("\\\\{}", target),
                "-s".to_string(),
                "-accepteula".to_string(),
                "powershell.exe".to_string(),
                "-NoProfile".to_string(),
                "-Command".to_string(),
                "Enable-PSRemoting -Force".to_string(),
            ];
            Ok(self
                .runner()
                .run_tool("psexec", &args, AD_OPERATION_TIMEOUT)
                .await?)
        }
        .await;
        match outcome {
            Ok(_) => CommandResult::ok(format!("WinRM enablement issued on {}", target)),
            Err(e) => {
                let mut result = CommandResult::from(&e);
                // The usual failure is the remote admin share being
                // unreachable; append the troubleshooting hint the UI shows.
                if let Some(error) = result.error.as_mut() {
                    error.push_str(
                        "\nHint: psexec needs ADMIN$ access and the remote registry service running.",
                    );
                }
                result
            }
        }
    }

    /// Install a shared printer connection on a remote machine.
    /// Driver staging is slow, hence the dedicated 60 s class.
    pub async fn install_printer(&self, target: &str, connection: &str) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            require_identity(connection, "Printer connection name")?;
            self.guard().await?;
            self.run_action(
                script::install_printer(target, connection),
                PRINTER_INSTALL_TIMEOUT,
            )
            .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Test WinRM reachability of a remote machine (10 s class).
    pub async fn test_connectivity(&self, target: &str) -> CommandResult {
        let outcome = async {
            require_identity(target, "Computer name")?;
            self.guard().await?;
            self.run_action(script::test_connectivity(target), CONNECTIVITY_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Open an administrative share in Explorer.
    ///
    /// `net use` bounds the reachability check at 5 s; Explorer itself
    /// detaches immediately, so success is declared on spawn.
    pub async fn open_share(&self, server: &str, share: &str) -> CommandResult {
        let outcome = async {
            require_identity(server, "Server name")?;
            require_identity(share, "Share name")?;
            let unc = format!("\\\\{}\\{}", server, share);
            self.runner()
                .run_tool(
                    "net",
                    &["use".to_string(), unc.clone()],
                    SHARE_OPEN_TIMEOUT,
                )
                .await?;
            self.runner().spawn_detached("explorer.exe", &[unc.clone()])?;
            Ok::<_, AdError>(unc)
        }
        .await;
        match outcome {
            Ok(unc) => CommandResult::ok(format!("Opened {}", unc)),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Launch an RDP session to a remote machine. mstsc detaches
    /// immediately; success is declared on spawn.
    pub fn launch_rdp(&self, target: &str) -> CommandResult {
        let outcome = (|| {
            require_identity(target, "Computer name")?;
            self.runner()
                .spawn_detached("mstsc.exe", &[format!("/v:{}", target)])?;
            Ok::<_, AdError>(())
        })();
        match outcome {
            Ok(()) => CommandResult::ok(format!("RDP session launched to {}", target)),
            Err(e) => CommandResult::from(&e),
        }
    }
}

fn is_sid(value: &str) -> bool {
    value.starts_with("S-1-")
        && value.len() > 4
        && value[4..].chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// Extract the data column from `reg query` output.
///
/// The value line has the shape `    Name    REG_TYPE    data`, with the
/// data itself possibly containing spaces.
fn parse_reg_value(output: &str, value_name: &str) -> Option<String> {
    for line in output.lines() {
        let rest = match line.trim().strip_prefix(value_name) {
            Some(rest) => rest.trim_start(),
            None => continue,
        };
        let (reg_type, data) = match rest.split_once(char::is_whitespace) {
            Some(pair) => pair,
            None => continue,
        };
        if reg_type.starts_with("REG_") {
            return Some(data.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::core::mock_runner::{CallKind, MockResponse, MockRunner};

    #[tokio::test]
    async fn system_summary_parses_os_record() {
        let stdout = r#"{"hostname":"SRV01","os_version":"Windows Server 2022 Standard","build_number":"20348","last_boot":"2026-07-01T04:12:00Z","free_memory_mb":2048.5,"total_memory_mb":16384.0}"#;
        let mock = MockRunner::new().on_output("Win32_OperatingSystem", stdout);
        let (session, _runner) = kerberos_session(mock);

        let summary = session.system_summary("SRV01").await.unwrap();
        assert_eq!(summary.hostname, "SRV01");
        assert_eq!(summary.build_number, "20348");
    }

    #[tokio::test]
    async fn list_disks_salvages_noisy_output() {
        let stdout = "WARNING: firewall profile\n[{\"drive\":\"C:\",\"total_gb\":237.5,\"free_gb\":102.3}]\n";
        let mock = MockRunner::new().on_output("Win32_LogicalDisk", stdout);
        let (session, _runner) = kerberos_session(mock);

        let disks = session.list_disks("SRV01").await.unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].drive, "C:");
    }

    #[tokio::test]
    async fn delete_profile_rejects_bad_sid() {
        let mock = MockRunner::new().on_output("", "SUCCESS: unreachable");
        let (session, runner) = kerberos_session(mock);

        let result = session.delete_profile("SRV01", "not-a-sid").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Not a valid SID"));
        assert_eq!(runner.script_calls(), 0);
    }

    #[tokio::test]
    async fn delete_profile_success() {
        let mock = MockRunner::new().on_output(
            "Win32_UserProfile",
            "SUCCESS: Profile S-1-5-21-1111-2222-3333-1001 removed",
        );
        let (session, _runner) = kerberos_session(mock);

        let result = session
            .delete_profile("SRV01", "S-1-5-21-1111-2222-3333-1001")
            .await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn set_service_state_runs_sc() {
        let mock = MockRunner::new().on_output("sc", "SERVICE_NAME: Spooler\n        STATE: 2 START_PENDING");
        let (session, runner) = kerberos_session(mock);

        let result = session
            .set_service_state("SRV01", "Spooler", ServiceAction::Start)
            .await;
        assert!(result.success);
        let calls = runner.calls();
        assert!(calls
            .iter()
            .any(|c| c.kind == CallKind::Tool && c.text == "sc \\\\SRV01 start Spooler"));
    }

    #[tokio::test]
    async fn connectivity_ok_sentinel() {
        let mock = MockRunner::new().on_output("Test-WSMan", "OK");
        let (session, _runner) = kerberos_session(mock);

        let result = session.test_connectivity("SRV01").await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn connectivity_timeout_is_reported() {
        let mock = MockRunner::new().on(
            "Test-WSMan",
            MockResponse::Timeout(CONNECTIVITY_TIMEOUT),
        );
        let (session, _runner) = kerberos_session(mock);

        let result = session.test_connectivity("SRV01").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn open_share_prechecks_then_detaches() {
        let mock = MockRunner::new().on_output("net", "The command completed successfully.");
        let (session, runner) = kerberos_session(mock);

        let result = session.open_share("SRV01", "c$").await;
        assert!(result.success);

        let calls = runner.calls();
        let net = calls
            .iter()
            .position(|c| c.kind == CallKind::Tool && c.text.contains("net use"))
            .unwrap();
        let explorer = calls
            .iter()
            .position(|c| c.kind == CallKind::Detached && c.text.contains("explorer.exe"))
            .unwrap();
        assert!(net < explorer);
    }

    #[tokio::test]
    async fn open_share_unreachable_does_not_launch_explorer() {
        let mock = MockRunner::new().on(
            "net",
            MockResponse::Exit {
                code: 2,
                stdout: String::new(),
                stderr: "System error 53 has occurred.".to_string(),
            },
        );
        let (session, runner) = kerberos_session(mock);

        let result = session.open_share("SRV01", "c$").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("System error 53"));
        assert!(!runner
            .calls()
            .iter()
            .any(|c| c.kind == CallKind::Detached));
    }

    #[tokio::test]
    async fn launch_rdp_declares_success_on_spawn() {
        let mock = MockRunner::new();
        let (session, runner) = kerberos_session(mock);

        let result = session.launch_rdp("SRV01");
        assert!(result.success);
        assert!(runner
            .calls()
            .iter()
            .any(|c| c.kind == CallKind::Detached && c.text.contains("/v:SRV01")));
    }

    #[tokio::test]
    async fn enable_winrm_appends_hint_on_failure() {
        let mock = MockRunner::new().on(
            "psexec",
            MockResponse::Exit {
                code: 5,
                stdout: String::new(),
                stderr: "Access is denied.".to_string(),
            },
        );
        let (session, _runner) = kerberos_session(mock);

        let result = session.enable_winrm("SRV01").await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("Access is denied"));
        assert!(error.contains("ADMIN$"));
    }

    #[tokio::test]
    async fn kerberos_only_gates_tool_operations() {
        let mock = MockRunner::new().on_output("klist", KLIST_WITHOUT_TGT);
        let (session, runner) = kerberos_only_session(mock);

        let result = session
            .set_service_state("SRV01", "Spooler", ServiceAction::Stop)
            .await;
        assert!(!result.success);
        // Only the klist probe ran; sc never did.
        assert!(!runner.calls().iter().any(|c| c.text.starts_with("sc ")));
    }

    #[tokio::test]
    async fn registry_query_extracts_data_column() {
        let reg_output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\r\n    ProductName    REG_SZ    Windows Server 2022 Standard\r\n";
        let mock = MockRunner::new().on_output("reg query", reg_output);
        let (session, runner) = kerberos_session(mock);

        let value = session
            .query_registry_value(
                "SRV01",
                "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion",
                "ProductName",
            )
            .await
            .unwrap();
        assert_eq!(value, "Windows Server 2022 Standard");
        assert!(runner
            .calls()
            .iter()
            .any(|c| c.kind == CallKind::Tool && c.text.contains("\\\\SRV01\\HKLM")));
    }

    #[tokio::test]
    async fn registry_query_missing_value_is_a_parse_error() {
        let mock = MockRunner::new().on_output("reg query", "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\r\n");
        let (session, _runner) = kerberos_session(mock);

        let err = session
            .query_registry_value("SRV01", "HKLM\\SOFTWARE", "Absent")
            .await
            .unwrap_err();
        assert!(matches!(err, AdError::Parse(_)));
    }

    #[tokio::test]
    async fn sid_validation() {
        assert!(is_sid("S-1-5-21-1111-2222-3333-1001"));
        assert!(!is_sid("S-1-"));
        assert!(!is_sid("X-1-5-21"));
        assert!(!is_sid("S-1-5-21; Remove-Item"));
    }
}
