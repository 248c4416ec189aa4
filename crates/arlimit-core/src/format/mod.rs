//! On-disk format of the limits file.

pub mod codec;

pub use codec::{decode_limits, encode_limits, CodecError, LimitsFile};
