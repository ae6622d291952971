//! Reader/writer pairing for one processing stage

use crate::broker::{Reader, Writer};
use crate::records::Record;

/// Couples the consumer and producer of one stage (e.g. uploaded →
/// transcribed) so a stage executor can be parametrized over the pair.
/// Pure composition; no state of its own.
pub struct Pipeline<R: Record, W: Record> {
    pub reader: Reader<R>,
    pub writer: Writer<W>,
}

impl<R: Record, W: Record> Pipeline<R, W> {
    pub fn new(reader: Reader<R>, writer: Writer<W>) -> Self {
        Pipeline { reader, writer }
    }
}
