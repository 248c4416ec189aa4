//! Storage infrastructure: file-backed implementations of the application
//! ports plus the tool's own settings file.
//!
//! - `limits_file` – [`limits_file::YamlLimitsStore`], the limits YAML.
//! - `ar_conf` – [`ar_conf::ArConfCommandSource`], the command declarations.
//! - `config` – `config.toml` with paths and sync policies.

pub mod ar_conf;
pub mod config;
pub mod limits_file;

pub use ar_conf::ArConfCommandSource;
pub use limits_file::YamlLimitsStore;
