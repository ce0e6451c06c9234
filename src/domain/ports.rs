use crate::domain::model::LookupRecord;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Human-readable location of `path`, for reporting.
    fn location(&self, path: &str) -> String {
        path.to_string()
    }
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn sample_identifier(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    /// Explicit field selection; empty means "everything discovered".
    fn selected_fields(&self) -> &[String];
    fn monitoring_enabled(&self) -> bool;
}

/// Resolves one identifier into the service's record for it.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<LookupRecord>;
}

/// Receives every status change of a run.
pub trait StatusObserver {
    fn on_update(&mut self, status: &crate::core::status::JobStatus);
}

impl<F> StatusObserver for F
where
    F: FnMut(&crate::core::status::JobStatus),
{
    fn on_update(&mut self, status: &crate::core::status::JobStatus) {
        self(status)
    }
}
