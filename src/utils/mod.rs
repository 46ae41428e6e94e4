//! Shared utility types
//!
//! Currently the error taxonomy; kept as a module so error types stay
//! decoupled from the core operation logic that raises them.

pub mod errors;

pub use errors::{AdError, CredentialError, ExecError};
