//! Application layer use cases for the limits manager.
//!
//! - **`manage_limits`** – the [`manage_limits::LimitsManager`] that loads,
//!   reconciles, edits and persists the limits file.
//! - **`ports`** – the storage traits it depends on.  The application layer
//!   performs no file I/O itself; concrete stores live in `infrastructure`.

pub mod manage_limits;
pub mod ports;

pub use manage_limits::{
    LimitsManager, LoadFailurePolicy, ManagerError, MissingCommandsPolicy, SyncPolicy,
};
pub use ports::{CommandSource, LimitsStore, StoreError};
