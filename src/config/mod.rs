// src/config/mod.rs

//! Configuration loading and validation for buildgate.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate required options and resolve per-module build configs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{BuildConfig, ConfigFile, ConfigSection, ModuleConfig, RawConfigFile};
