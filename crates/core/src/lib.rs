//! Core types for Cloner
//!
//! This crate provides:
//! - Placement codes (`<url>|<destination>`) and their parsing
//! - Destination path resolution with the `%USER%` home placeholder
//! - The system configuration file

pub mod code;
pub mod config;
pub mod paths;

pub use code::{generate_code, CodeError, PlacementRequest, DELIMITER};
pub use config::{Config, ConfigError, WatchConfig};
pub use paths::{PathError, PathResolver, HOME_PLACEHOLDER};
