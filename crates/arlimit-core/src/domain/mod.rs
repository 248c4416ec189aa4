//! Domain entities for active-response limits.
//!
//! - **`commands`** – the set of commands declared in `ar.conf` and the line
//!   scanner that extracts it.
//! - **`limits`** – the limits document, the [`limits::Limit`] value type and
//!   the reconciliation pass.
//!
//! Nothing here touches the file system.

pub mod commands;
pub mod limits;
