//! # arlimit-core
//!
//! Shared library for keeping active-response limits in step with the commands
//! declared in `ar.conf`.
//!
//! It has no file-system access; callers hand it text and get text back.
//!
//! - **`domain`** – the command set scanned from `ar.conf`, the limits
//!   document and the reconciliation pass that aligns the two.
//! - **`format`** – the YAML codec for the limits file.

pub mod domain;
pub mod format;

// Re-export the most-used types at the crate root so callers can write
// `arlimit_core::LimitsDocument` instead of the full module path.
pub use domain::commands::CommandSet;
pub use domain::limits::{
    CommandLimitReport, DefaultLimitPolicy, Limit, LimitError, LimitsDocument, SyncReport,
    DEFAULT_GLOBAL_LIMIT,
};
pub use format::codec::{decode_limits, encode_limits, CodecError, LimitsFile};
