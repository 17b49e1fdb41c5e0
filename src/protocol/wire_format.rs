//! Wire format encoding and decoding.
//!
//! Call header, prefixing every inbound transfer:
//! ```text
//! ┌──────────┬────────────┬─────────────┬────────────┬──────────┬─────────┬────────┬──────┐
//! │ Call ID  │ Timeout ms │ Service len │ Method len │ Cred len │ Service │ Method │ Cred │
//! │ 4 bytes  │ 4 bytes    │ 2 bytes     │ 2 bytes    │ 2 bytes  │ utf8    │ utf8   │ utf8 │
//! └──────────┴────────────┴─────────────┴────────────┴──────────┴─────────┴────────┴──────┘
//! ```
//! Bytes after the header are the serialized request body; decoding them
//! is the handler's job, never the header parser's.
//!
//! Response layout:
//! ```text
//! ┌──────────┬───────┬─────────────┬───────────────┬───────────────────┬─────────┬──────────┐
//! │ Call ID  │ Flags │ Payload len │ Sidecar count │ Sidecar len × N   │ Payload │ Sidecars │
//! │ 4 bytes  │ 1 byte│ 4 bytes     │ 2 bytes       │ 4 bytes each      │ bytes   │ in order │
//! └──────────┴───────┴─────────────┴───────────────┴───────────────────┴─────────┴──────────┘
//! ```
//! Sidecar bytes are appended verbatim after the payload, in index order.
//!
//! All multi-byte integers are Big Endian.

use bytes::{BufMut, Bytes, BytesMut};

use crate::call::RemoteMethod;
use crate::error::{Result, RpcError};

/// Fixed prefix of the call header (before the three strings).
pub const CALL_HEADER_PREFIX: usize = 14;

/// Fixed prefix of a response (before the sidecar table).
pub const RESPONSE_PREFIX: usize = 11;

/// Default maximum response payload size (64 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum aggregate sidecar bytes per call (64 MB).
pub const DEFAULT_MAX_SIDECAR_BYTES: usize = 64 * 1024 * 1024;

/// Flag constants for response frames.
pub mod flags {
    /// The call succeeded; payload is the handler's response.
    pub const SUCCESS: u8 = 0b0000_0001;
    /// The call failed; payload is a MsgPack `ErrorStatus` envelope.
    pub const ERROR: u8 = 0b0000_0010;

    /// Reserved bits mask (bits 2-7).
    pub const RESERVED_MASK: u8 = 0b1111_1100;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Decoded call header.
///
/// Produced by [`CallHeader::decode`] on the receiving thread; everything
/// here is cheap to extract. `timeout_ms == 0` means the client supplied
/// no deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    /// Client-assigned call identifier, echoed in the response.
    pub call_id: u32,
    /// Client timeout in milliseconds (0 = none).
    pub timeout_ms: u32,
    /// Routing identity (service + method).
    pub remote_method: RemoteMethod,
    /// Opaque credential string; empty on the wire means none.
    pub credentials: Option<String>,
}

impl CallHeader {
    /// Decode a call header from the front of a transfer.
    ///
    /// Returns the header and the offset where the request body starts.
    /// The body itself is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Protocol`] when the buffer is truncated, a
    /// string is not valid UTF-8, or the service/method name is empty.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < CALL_HEADER_PREFIX {
            return Err(RpcError::Protocol(format!(
                "call header truncated: {} bytes, need at least {}",
                buf.len(),
                CALL_HEADER_PREFIX
            )));
        }

        let call_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let timeout_ms = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let service_len = u16::from_be_bytes([buf[8], buf[9]]) as usize;
        let method_len = u16::from_be_bytes([buf[10], buf[11]]) as usize;
        let cred_len = u16::from_be_bytes([buf[12], buf[13]]) as usize;

        let strings_end = CALL_HEADER_PREFIX + service_len + method_len + cred_len;
        if buf.len() < strings_end {
            return Err(RpcError::Protocol(format!(
                "call header strings truncated: {} bytes, need {}",
                buf.len(),
                strings_end
            )));
        }

        let service_end = CALL_HEADER_PREFIX + service_len;
        let method_end = service_end + method_len;

        let service = decode_utf8(&buf[CALL_HEADER_PREFIX..service_end], "service")?;
        let method = decode_utf8(&buf[service_end..method_end], "method")?;
        let credentials = decode_utf8(&buf[method_end..strings_end], "credentials")?;

        if service.is_empty() || method.is_empty() {
            return Err(RpcError::Protocol(
                "service and method names must be non-empty".to_string(),
            ));
        }

        Ok((
            Self {
                call_id,
                timeout_ms,
                remote_method: RemoteMethod::new(service, method),
                credentials: if credentials.is_empty() {
                    None
                } else {
                    Some(credentials)
                },
            },
            strings_end,
        ))
    }

    /// Encode this header to bytes.
    pub fn encode(&self) -> Bytes {
        let service = self.remote_method.service().as_bytes();
        let method = self.remote_method.method().as_bytes();
        let cred = self.credentials.as_deref().unwrap_or("").as_bytes();

        let mut buf =
            BytesMut::with_capacity(CALL_HEADER_PREFIX + service.len() + method.len() + cred.len());
        buf.put_u32(self.call_id);
        buf.put_u32(self.timeout_ms);
        buf.put_u16(service.len() as u16);
        buf.put_u16(method.len() as u16);
        buf.put_u16(cred.len() as u16);
        buf.put_slice(service);
        buf.put_slice(method);
        buf.put_slice(cred);
        buf.freeze()
    }

    /// Build a complete transfer (header + request body).
    ///
    /// The server never calls this; it exists for clients and tests.
    pub fn encode_transfer(&self, body: &[u8]) -> Bytes {
        let header = self.encode();
        let mut buf = BytesMut::with_capacity(header.len() + body.len());
        buf.put_slice(&header);
        buf.put_slice(body);
        buf.freeze()
    }
}

fn decode_utf8(bytes: &[u8], field: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RpcError::Protocol(format!("{field} is not valid UTF-8")))
}

/// Serialize a finished response: header, sidecar table, payload, and
/// sidecar bytes in index order.
///
/// # Errors
///
/// Returns [`RpcError::PayloadTooLarge`] when `payload` exceeds
/// `max_payload_size`. Sidecar sizes are capped earlier, at registration.
pub fn encode_response(
    call_id: u32,
    is_success: bool,
    payload: &[u8],
    sidecars: &[Bytes],
    max_payload_size: usize,
) -> Result<Bytes> {
    if payload.len() > max_payload_size {
        return Err(RpcError::PayloadTooLarge {
            size: payload.len(),
            max: max_payload_size,
        });
    }
    if sidecars.len() > u16::MAX as usize {
        return Err(RpcError::Protocol(format!(
            "too many sidecars: {}",
            sidecars.len()
        )));
    }

    let sidecar_bytes: usize = sidecars.iter().map(|s| s.len()).sum();
    let mut buf = BytesMut::with_capacity(
        RESPONSE_PREFIX + sidecars.len() * 4 + payload.len() + sidecar_bytes,
    );

    buf.put_u32(call_id);
    buf.put_u8(if is_success { flags::SUCCESS } else { flags::ERROR });
    buf.put_u32(payload.len() as u32);
    buf.put_u16(sidecars.len() as u16);
    for sidecar in sidecars {
        buf.put_u32(sidecar.len() as u32);
    }
    buf.put_slice(payload);
    for sidecar in sidecars {
        buf.put_slice(sidecar);
    }

    Ok(buf.freeze())
}

/// A response decoded back into its parts.
///
/// Payload and sidecars are zero-copy slices of the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    /// Call identifier echoed from the request.
    pub call_id: u32,
    /// Whether the call succeeded.
    pub is_success: bool,
    /// Primary payload (an `ErrorStatus` envelope on failure).
    pub payload: Bytes,
    /// Sidecar blobs, index order preserved from registration.
    pub sidecars: Vec<Bytes>,
}

/// Decode a serialized response.
///
/// Used by tests and client-side tooling; the server only encodes.
///
/// # Errors
///
/// Returns [`RpcError::Protocol`] on truncation, reserved flag bits, or a
/// flags byte that does not carry exactly one of SUCCESS/ERROR.
pub fn decode_response(buf: Bytes) -> Result<DecodedResponse> {
    if buf.len() < RESPONSE_PREFIX {
        return Err(RpcError::Protocol(format!(
            "response truncated: {} bytes, need at least {}",
            buf.len(),
            RESPONSE_PREFIX
        )));
    }

    let call_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let response_flags = buf[4];
    let payload_len = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) as usize;
    let sidecar_count = u16::from_be_bytes([buf[9], buf[10]]) as usize;

    if response_flags & flags::RESERVED_MASK != 0 {
        return Err(RpcError::Protocol(
            "reserved response flag bits must be 0".to_string(),
        ));
    }
    let is_success = match (
        flags::has_flag(response_flags, flags::SUCCESS),
        flags::has_flag(response_flags, flags::ERROR),
    ) {
        (true, false) => true,
        (false, true) => false,
        _ => {
            return Err(RpcError::Protocol(format!(
                "response flags must carry exactly one of SUCCESS/ERROR, got {response_flags:#04x}"
            )))
        }
    };

    let table_end = RESPONSE_PREFIX + sidecar_count * 4;
    if buf.len() < table_end {
        return Err(RpcError::Protocol(
            "response sidecar table truncated".to_string(),
        ));
    }

    let mut sidecar_lens = Vec::with_capacity(sidecar_count);
    for i in 0..sidecar_count {
        let at = RESPONSE_PREFIX + i * 4;
        sidecar_lens.push(u32::from_be_bytes([
            buf[at],
            buf[at + 1],
            buf[at + 2],
            buf[at + 3],
        ]) as usize);
    }

    let sidecar_bytes: usize = sidecar_lens.iter().sum();
    let total = table_end + payload_len + sidecar_bytes;
    if buf.len() != total {
        return Err(RpcError::Protocol(format!(
            "response length mismatch: {} bytes, expected {}",
            buf.len(),
            total
        )));
    }

    let payload = buf.slice(table_end..table_end + payload_len);
    let mut sidecars = Vec::with_capacity(sidecar_count);
    let mut at = table_end + payload_len;
    for len in sidecar_lens {
        sidecars.push(buf.slice(at..at + len));
        at += len;
    }

    Ok(DecodedResponse {
        call_id,
        is_success,
        payload,
        sidecars,
    })
}
