//! Blocking detection: independent probes aggregated by majority vote.

pub mod detector;
pub mod probes;

pub use detector::{DetectionVerdict, Detector, majority_suppressed};
pub use probes::{
    BaitElementProbe, NetworkProbe, Probe, ScriptExecutionProbe, SignatureProbe,
};
