//! Core library for turnout - a mobile client for fire-gear inspection and
//! repair tracking.
//!
//! Technicians log in, browse scheduled jobs ("leads"), look up turnout gear
//! by serial number, record inspection and repair outcomes, and manage
//! department rosters. This crate is everything beneath the UI:
//!
//! - [`api`]: the authenticated HTTP transport (bearer tokens, single-flight
//!   session refresh, request replay) and typed resource wrappers
//! - [`auth`]: session lifecycle, token persistence, keychain credentials
//! - [`models`]: lead, gear, inspection, repair, and roster data types
//! - [`config`]: application configuration
//! - [`host`]: the hooks an embedding UI provides (navigation reset and user
//!   notifications on session loss)
//!
//! # Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnout_core::api::{ApiClient, Transport};
//! use turnout_core::auth::Session;
//! use turnout_core::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let session = Arc::new(Session::new(&config.auth_base_url, config.cache_dir()?)?);
//!
//! let transport = Transport::new(&config.api_base_url)?;
//! transport.set_session_store(session.clone());
//! // transport.set_navigation(...) and transport.set_notifier(...) once the
//! // UI has mounted.
//!
//! let client = ApiClient::new(transport);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod host;
pub mod models;
