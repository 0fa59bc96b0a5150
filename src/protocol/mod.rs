//! PostgreSQL v3 wire protocol: message types, encoding, decoding
//!
//! Framing is `[tag][i32 length including itself][body]`; the startup and
//! SSLRequest messages omit the tag. All multi-byte integers are big-endian,
//! C-strings are zero-terminated UTF-8.

pub mod constants;
pub mod decode;
pub mod encode;
pub mod message;

pub use decode::decode_message;
pub use encode::{encode_batch, encode_message};
pub use message::{
    AuthenticationMessage, BackendMessage, ErrorFields, FieldDescription, FrontendMessage,
};
