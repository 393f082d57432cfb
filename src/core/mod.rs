//! Core module - settings, logging and API version lookup

pub mod config;
pub mod logging;
pub mod resolver;

pub use config::{Environment, Settings};
pub use resolver::{resolve, ModuleHandle, ResolveError};
