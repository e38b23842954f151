pub mod orchestrator;
pub mod scoring;
pub mod tier;

pub use orchestrator::{OrchestratorConfig, VettingCycleSummary, VettingOrchestrator};
