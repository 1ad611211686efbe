//! Castforged-Common: Shared types, errors, and utilities.
//!
//! This crate provides the vocabulary shared by the negotiation layer:
//!
//! - **Errors**: the common [`Error`] type plus the wire-facing
//!   [`NegotiationError`] returned to the host on a rejected load
//! - **Core Types**: codec tags, resolutions, caption track descriptors,
//!   host track records and transcode status
//! - **Locators**: [`StreamLocator`], an additive-only view over a media URL
//! - **Events**: a broadcast [`EventBus`] for session lifecycle and
//!   background task outcomes
//!
//! # Examples
//!
//! ```
//! use castforged_common::{NegotiationError, StreamLocator};
//!
//! let mut locator = StreamLocator::parse("https://h/s?foo=1").unwrap();
//! locator.append("videoCodecs", "h264");
//! assert_eq!(locator.to_string(), "https://h/s?foo=1&videoCodecs=h264");
//!
//! let err = NegotiationError::invalid_param("media descriptor missing");
//! assert_eq!(err.to_error_data().reason, "INVALID_PARAM");
//! ```

pub mod error;
pub mod events;
pub mod ids;
pub mod locator;
pub mod types;

pub use error::{Error, ErrorData, NegotiationError, NegotiationErrorKind, Result};
pub use events::{Event, EventBus, EventPayload};
pub use ids::SessionId;
pub use locator::StreamLocator;
pub use types::*;
