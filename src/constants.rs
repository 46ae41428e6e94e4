//! # Application-Wide Constants
//!
//! Centralized timeout classes and configuration values used throughout
//! adshell.
//!
//! ## Design Rationale
//!
//! Constants are defined here (rather than scattered across modules) to:
//! - Make configuration changes easier (single source of truth)
//! - Improve discoverability (grep for constant name finds definition + all uses)
//! - Document WHY each value was chosen

use std::time::Duration;

/// Windows API flag to create a process without a visible console window
///
/// Used when launching powershell.exe or mstsc.exe so the console host
/// never flashes over the UI.
#[cfg(windows)]
pub const CREATE_NO_WINDOW: u32 = 0x08000000;

// ============================================================================
// Timeout classes
// ============================================================================
//
// Every external call carries exactly one of these wall-clock bounds.
// On expiry the child process is killed and the invocation fails with a
// timeout error. There are no retries anywhere: one attempt, one timeout,
// one outcome.

/// Ticket cache inspection (`klist`) bound.
///
/// **Rationale**: klist is a purely local lookup; 3 seconds already means
/// something is wrong with the workstation, and the gate must fail closed
/// quickly rather than stall every operation behind it.
pub const KLIST_TIMEOUT: Duration = Duration::from_secs(3);

/// Share/Explorer launch bound.
///
/// **Rationale**: explorer.exe detaches immediately on success; 5 seconds
/// only bounds the optimistic wait for spawn failures to surface.
pub const SHARE_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connectivity test (`Test-WSMan`) bound.
///
/// **Rationale**: 10 seconds allows a network round-trip plus the WinRM
/// auth handshake against a slow domain controller, but prevents
/// indefinite hangs on unreachable hosts.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for AD cmdlet operations.
///
/// **Rationale**: directory queries and single-object mutations normally
/// complete in well under a second; 30 seconds covers a cold AD module
/// import on first use without letting a wedged DC block the caller
/// forever.
pub const AD_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Printer driver installation bound.
///
/// **Rationale**: driver staging against a print server is the slowest
/// operation this tool performs; observed installs run 20-45 seconds.
pub const PRINTER_INSTALL_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Directory defaults
// ============================================================================

/// Default LDAP port used when the configuration does not override it.
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default LDAPS port used when `use_ssl` is set.
pub const DEFAULT_LDAPS_PORT: u16 = 636;

// ============================================================================
// Storage
// ============================================================================

/// File name of the persisted (non-secret) connection settings blob,
/// stored under the local data directory.
pub const SETTINGS_FILE_NAME: &str = "adshell-settings.json";

/// Directory name under the platform local data dir for all adshell state.
pub const APP_DIR_NAME: &str = "adshell";

/// Log file name written by the tracing file appender.
pub const LOG_FILE_NAME: &str = "adshell.log";
