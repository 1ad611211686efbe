//! Castforged - media session negotiation for cast receivers
//!
//! This library crate exposes the negotiation layer for embedding and
//! integration testing. A [`session::Session`] binds everything to one host.

pub mod capability;
pub mod config;
pub mod diagnostics;
pub mod host;
pub mod interceptor;
pub mod messages;
pub mod retry;
pub mod session;
pub mod telemetry;
pub mod tracks;
