//! adshell - PowerShell-driven Active Directory administration toolkit
//!
//! Command orchestration and result normalization over the Windows admin
//! tooling: operations render parameterized PowerShell scripts, a
//! process executor runs them with per-class timeouts, and an output
//! interpreter classifies sentinel/JSON results into uniform
//! [`core::CommandResult`] objects. Directory semantics stay delegated
//! to the host tools (`powershell.exe`, `klist`, `sc`, `net`, `mstsc`).

// Public modules
pub mod constants;
pub mod core;
pub mod logging;
pub mod models;
pub mod platform;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    AdSession, CommandResult, CreateComputerResult, CreateUserResult, GroupCategory, GroupScope,
    NewComputer, NewGroup, NewUser, ScriptRunner, ServiceAction, StepOutcome,
};
pub use models::{ConnectionConfig, PersistedSettings, SecureString, Username};
pub use platform::PowerShellRunner;
pub use utils::{AdError, CredentialError, ExecError};
