//! # stellar-core
//!
//! Core crate for the Stellar game-server panel. Contains the unified error
//! system and the host configuration schema.
//!
//! This crate has **no** internal dependencies on other Stellar crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
