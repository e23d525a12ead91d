#![forbid(unsafe_code)]

//! Session state registry and manifest model for swapping a deployment's
//! container into development mode.

pub mod config;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod persistence;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use manifest::ManifestLoader;
pub use persistence::SessionRegistry;
