//! Codec module - serialization for structured payloads and envelopes.
//!
//! Failure envelopes (and any structured payloads callers choose to use)
//! are MsgPack-encoded via [`MsgPackCodec`]. The codec is a marker struct
//! with static methods rather than a trait object, so codec selection is
//! a compile-time decision.
//!
//! # Example
//!
//! ```
//! use wirecall::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
