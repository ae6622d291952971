//! Output seam for stage workers
//!
//! Workers hand finished records to a `RecordSink`. In production that is
//! the stage's durable-queue `Writer`; tests substitute an in-memory sink.

use async_trait::async_trait;

use crate::broker::Writer;
use crate::error::Result;
use crate::records::Record;

#[async_trait]
pub trait RecordSink<T: Record>: Send + Sync + 'static {
    async fn write(&self, record: &T) -> Result<()>;
}

#[async_trait]
impl<T: Record> RecordSink<T> for Writer<T> {
    async fn write(&self, record: &T) -> Result<()> {
        Writer::write(self, record)
    }
}
