//! MsgPack codec using `rmp-serde`.
//!
//! Encoding uses `to_vec_named` so structs serialize as maps keyed by
//! field name rather than positional arrays. Map format lets either side
//! add envelope fields without breaking older peers' decoders.
//!
//! # Example
//!
//! ```
//! use wirecall::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Ack {
//!     call_id: u32,
//!     accepted: bool,
//! }
//!
//! let ack = Ack { call_id: 7, accepted: true };
//! let encoded = MsgPackCodec::encode(&ack).unwrap();
//! let decoded: Ack = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, ack);
//! ```

use crate::error::Result;

/// MessagePack codec for structured data.
///
/// Struct-as-map encoding (`to_vec_named`); see module docs.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
