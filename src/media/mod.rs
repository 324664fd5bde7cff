pub mod formatter;

use async_trait::async_trait;

pub use formatter::{BaselineFormatter, BaselineImage, FormatError, FormatOptions};

/// Produces a locally re-encoded copy of a remote image.
#[async_trait]
pub trait ImageFormatter: Send + Sync {
    async fn materialize(&self, source_url: &str) -> Result<BaselineImage, FormatError>;
}
