//! SessionRelay gateway: session restore at startup, then gate and relay
//! inbound chat events to a webhook.

pub mod api;
pub mod bootstrap;
pub mod chat;
pub mod cli;
pub mod runtime;
pub mod state;
