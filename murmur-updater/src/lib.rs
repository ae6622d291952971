//! murmur-updater library
//!
//! Status consistency enforcement: consumes all three stage topics and
//! applies exactly one consistency-checked transition per record to the
//! metadata store.

pub mod config;
pub mod enforcer;
