//! Persistence layer modules.

pub mod registry;
pub mod state_file;

pub use registry::SessionRegistry;
