//! JavaScript runtime infrastructure.
//!
//! Provides a shared trait and error type used by hosts that need to execute
//! injected scripts, along with the Boa-backed implementation.

mod boa;

pub use boa::BoaScriptRuntime;

use std::collections::HashMap;

use thiserror::Error;

/// Abstraction over JavaScript runtimes able to execute injected snippets.
pub trait ScriptRuntime: Send + Sync {
    /// Execute `script` in a fresh page-like global scope and return every
    /// scalar global it defined, stringified.
    fn run(&self, script: &str) -> InterpreterResult<HashMap<String, String>>;
}

/// Failures produced by JavaScript runtimes.
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("javascript execution failed: {0}")]
    Execution(String),
    #[error("javascript engine error: {0}")]
    Other(String),
}

/// Convenience alias for runtime results.
pub type InterpreterResult<T> = Result<T, InterpreterError>;
