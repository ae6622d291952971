//! murmur-summarizer library
//!
//! Summarization stage: consumes transcription records, calls the external
//! chat-completion service, and emits summary records.

pub mod config;
pub mod llm;
