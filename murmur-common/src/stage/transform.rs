//! Stage transform seam
//!
//! The transform is the external collaborator of a stage: download the blob,
//! call the transcription or summarization service, produce the output
//! record. It must not touch shared state; all persistence happens through
//! the stage writer and the status enforcer.

use async_trait::async_trait;

use crate::error::Result;
use crate::records::Record;

#[async_trait]
pub trait Transform: Send + Sync + 'static {
    type In: Record;
    type Out: Record;

    async fn apply(&self, input: Self::In) -> Result<Self::Out>;
}
