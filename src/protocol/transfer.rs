//! Inbound transfer buffer.
//!
//! The framing layer hands over one fully received request as an
//! [`InboundTransfer`]. The buffer is `bytes::Bytes`, so zero-copy views
//! (the serialized request body, sidecars encoded against it) share its
//! refcounted storage and keep it alive for exactly as long as needed.

use bytes::Bytes;

/// One complete inbound request, as delivered by the framing layer.
///
/// Immutable once constructed. Ownership moves into the call at parse
/// time; the call keeps it alive for the lifetime of every view into it.
#[derive(Debug, Clone)]
pub struct InboundTransfer {
    data: Bytes,
}

impl InboundTransfer {
    /// Wrap a fully received request buffer.
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// The raw transfer bytes.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Total transfer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the transfer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the transfer, returning the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for InboundTransfer {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for InboundTransfer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}
