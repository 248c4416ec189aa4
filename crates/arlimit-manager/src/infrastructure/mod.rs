//! Infrastructure layer for the limits manager.
//!
//! Contains the file-system adapters: the YAML limits store, the `ar.conf`
//! reader and the TOML settings file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `arlimit_core`, but MUST NOT be imported by the `application` layer.

pub mod storage;
