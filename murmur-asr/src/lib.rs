//! murmur-asr library
//!
//! Transcription stage: consumes upload announcements, calls the external
//! speech-to-text service, and emits transcription records.

pub mod config;
pub mod transcriber;
