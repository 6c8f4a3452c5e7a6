use async_trait::async_trait;
use crate::error::Result;
use crate::models::Snapshot;

/// A remote text generator that turns a snapshot into a short profile.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, snapshot: &Snapshot) -> Result<String>;
    fn name(&self) -> &str;
    fn model(&self) -> &str;
}
