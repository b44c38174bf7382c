//! Codec Primitives
//!
//! Building blocks for the persisted entry layout:
//!
//! ```text
//! ┌───────────────────────┬─────────────────┬──────────────────┐
//! │ expiry (8 bytes, BE)  │ tag (1 byte)    │ payload (N)      │
//! │ unix nanos, 0 = none  │ 0 raw / 1 comp. │ marshaled value  │
//! └───────────────────────┴─────────────────┴──────────────────┘
//! ```

pub mod expiry;
pub mod marshal;

pub use expiry::{
    decode_expiry, encode_expiry, expiry_after, max_expiry, remaining_ttl, Ttl, EXPIRY_HEADER_SIZE,
};
pub use marshal::{FnCodec, Json, Marshaler, Raw, Unmarshaler};
