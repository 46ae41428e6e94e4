//! Platform process execution
//!
//! The only place in the crate that spawns real processes. Everything
//! above this module talks to the [`crate::core::runner::ScriptRunner`]
//! seam instead.

pub mod powershell;

pub use powershell::PowerShellRunner;
