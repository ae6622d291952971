//! Durable-queue access
//!
//! Generic reader/writer over the closed set of wire record kinds, backed by
//! an external Kafka-compatible broker. The broker protocol itself is not
//! reimplemented here; this module only wraps consume/produce with the
//! pipeline's delivery semantics: at-least-once hand-off (offsets stored
//! only after a record reaches the next stage) and fire-and-forget writes.

pub mod decode;
pub mod pipeline;
pub mod reader;
pub mod writer;

pub use decode::{DecodePolicy, SkipAndLog};
pub use pipeline::Pipeline;
pub use reader::Reader;
pub use writer::Writer;
