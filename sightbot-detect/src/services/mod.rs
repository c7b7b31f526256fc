//! Inference pipeline components

pub mod orchestrator;
pub mod runner;
pub mod work_area;

pub use orchestrator::{InferenceOrchestrator, InferenceOutcome};
pub use runner::{CommandRunner, DetectionOutputs, DetectionRunner, DetectorCommand};
pub use work_area::WorkArea;
