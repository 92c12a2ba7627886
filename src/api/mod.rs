//! Typed HTTP client for the Aquawatch backend.
//!
//! One `ApiClient` instance is shared by the session controller, the CLI
//! commands, and any embedding UI. The session credential travels in the
//! cookie store; a bearer token is attached on top when the backend issued
//! one at login.

mod admin;
mod client;
mod monitoring;

pub use client::ApiClient;
