pub mod sampler;

pub use sampler::{MonitoringCycleSummary, MonitoringSampler, SamplerConfig};
