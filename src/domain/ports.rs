use crate::domain::model::ExecutionContext;
use crate::utils::error::Result;
use async_trait::async_trait;

/// S3-compatible object storage. `put_object` always overwrites the key.
pub trait ObjectStorage: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A unit of work the workflow runner can schedule.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value>;
}
