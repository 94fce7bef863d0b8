//! Configuration infrastructure

pub mod loader;

pub use loader::{load, load_credentials_from_env, load_from_file};
