//! Expo core library — domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`config`] — YAML configuration loader
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Endpoint, LogEncoding};
pub use error::ConfigError;
pub use types::{CheckNumber, ContentMapping, Device, DeviceId};
