//! Resource usage sampler port.

use async_trait::async_trait;

use super::SamplerError;
use crate::domain::ResourceUsage;

/// Samples CPU/memory usage of a running server.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ResourceSamplerPort: Send + Sync {
    async fn sample(&self, id: &str) -> Result<ResourceUsage, SamplerError>;
}

/// Sampler used when no telemetry backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSampler;

#[async_trait]
impl ResourceSamplerPort for UnavailableSampler {
    async fn sample(&self, _id: &str) -> Result<ResourceUsage, SamplerError> {
        Err(SamplerError::Unavailable)
    }
}
