#![forbid(unsafe_code)]

//! Core: dotted paths, the engine error type, and engine configuration.

pub mod config;
pub mod error;
pub mod path;

pub use config::EngineConfig;
pub use error::{PathFailure, ReactiveError, Result};
pub use path::Path;
