//! Probe registry.
//!
//! Each probe is a self-contained check contributing one boolean vote.
//! Probes never fail: any internal error is counted as evidence of
//! suppression.

pub mod bait_element;
pub mod network;
pub mod script_execution;
pub mod signature;

pub use bait_element::BaitElementProbe;
pub use network::NetworkProbe;
pub use script_execution::ScriptExecutionProbe;
pub use signature::SignatureProbe;

use async_trait::async_trait;

/// One independent suppression signal.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` when the signal indicates that sponsored content is suppressed.
    async fn run(&self) -> bool;
}
