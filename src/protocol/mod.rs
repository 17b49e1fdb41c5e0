//! Protocol module - wire format and transfer types.
//!
//! This module implements the binary wire layer the call object speaks:
//! - call header encoding/decoding (header only, never the body)
//! - response serialization with the sidecar table
//! - the transfer buffer handed over by the framing layer

mod transfer;
mod wire_format;

pub use transfer::InboundTransfer;
pub use wire_format::{
    decode_response, encode_response, flags, CallHeader, DecodedResponse, CALL_HEADER_PREFIX,
    DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_SIDECAR_BYTES, RESPONSE_PREFIX,
};
