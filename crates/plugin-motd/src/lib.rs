//! Message-of-the-day plugin for Stellar.
//!
//! Announces a configurable message when a server starts, optionally greets
//! players as they join, renders the server MOTD through the `server:motd`
//! filter and exposes broadcast/stats routes with matching UI surfaces.

pub mod hooks;
pub mod message;
pub mod plugin;
pub mod routes;

pub use plugin::MotdPlugin;
