//! Integrations that rely on third-party engines.
//!
//! The simulated host hands injected inline scripts to a real JavaScript
//! runtime so script-execution evidence is produced by actual execution.

pub mod interpreters;

pub use interpreters::BoaScriptRuntime;
