//! Manifest file loading.

pub mod loader;

pub use loader::ManifestLoader;
