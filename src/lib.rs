//! Sentinel Engine Library
//!
//! This module re-exports the main components for use in tests and binaries.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::pipeline;
pub use application::services;
pub use domain::entities;
pub use domain::errors;
pub use domain::ports;
pub use domain::value_objects;
pub use infrastructure::config::EngineConfig;
