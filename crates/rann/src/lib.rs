//! # RANN
//!
//! Process shell around the battle automation: configuration loading and
//! the HTTP control surface.
//!
//! ```text
//! HTTP ──▶ router ──▶ BattleController ──▶ scheduler ──▶ ledger
//!                          ▲
//!        rann.toml + env ──┘
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod http;

pub use config::{ConfigError, ConfigResult, RannConfig};
pub use http::{router, ApiError};
