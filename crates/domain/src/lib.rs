//! `sr-domain`: shared types for SessionRelay.
//!
//! Holds the configuration schema, the error type every crate returns,
//! the inbound message model, and the structured [`trace::TraceEvent`]
//! sink.

pub mod config;
pub mod error;
pub mod message;
pub mod trace;
