//! Storage Layer
//!
//! Persistence for the JSON configuration file.

pub mod config;

pub use config::ConfigService;
