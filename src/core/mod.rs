//! Core orchestration logic (platform-agnostic)
//!
//! CRITICAL: This module MUST NOT spawn processes directly; everything
//! external goes through the [`runner::ScriptRunner`] seam so the whole
//! layer stays testable against the scripted mock.

pub mod interpret;
pub mod kerberos;
pub mod ops;
pub mod runner;
pub mod script;

// Test utilities for scripted runners (tests only)
#[cfg(test)]
pub mod mock_runner;

pub use interpret::{Classification, StepOutcome};
pub use ops::machine::ServiceAction;
pub use ops::users::CreateUserResult;
pub use ops::computers::CreateComputerResult;
pub use ops::{AdSession, CommandResult};
pub use runner::ScriptRunner;
pub use script::{GroupCategory, GroupScope, NewComputer, NewGroup, NewUser};
