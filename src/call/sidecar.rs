//! Sidecar registry.
//!
//! Sidecars are out-of-band binary attachments a handler tacks onto a
//! response. Large blobs (bulk data blocks, scan results) skip the
//! structured payload encoding entirely: they are appended verbatim after
//! the payload and referenced from within it by index.

use bytes::Bytes;

use crate::error::{Result, RpcError};

/// Ordered collection of response sidecars.
///
/// Indices are assigned sequentially from 0 in registration order, and
/// that order is preserved verbatim on the wire. Registered sidecars
/// never change bytes or index. Aggregate size is capped by the owning
/// connection's policy.
#[derive(Debug)]
pub struct SidecarRegistry {
    sidecars: Vec<Bytes>,
    total_bytes: usize,
    max_total_bytes: usize,
}

impl SidecarRegistry {
    /// New registry with the given aggregate byte cap.
    pub fn new(max_total_bytes: usize) -> Self {
        Self {
            sidecars: Vec::new(),
            total_bytes: 0,
            max_total_bytes,
        }
    }

    /// Take ownership of `blob` and return its assigned index.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SidecarLimit`] when accepting the blob would
    /// push the aggregate past the cap. The registry is unchanged in
    /// that case.
    pub fn add(&mut self, blob: Bytes) -> Result<usize> {
        let requested = self.total_bytes + blob.len();
        if requested > self.max_total_bytes {
            return Err(RpcError::SidecarLimit {
                requested,
                max: self.max_total_bytes,
            });
        }

        let idx = self.sidecars.len();
        self.total_bytes = requested;
        self.sidecars.push(blob);
        Ok(idx)
    }

    /// Sidecar at `idx`, if registered.
    pub fn get(&self, idx: usize) -> Option<&Bytes> {
        self.sidecars.get(idx)
    }

    /// All sidecars in index order.
    #[inline]
    pub fn as_slice(&self) -> &[Bytes] {
        &self.sidecars
    }

    /// Number of registered sidecars.
    #[inline]
    pub fn len(&self) -> usize {
        self.sidecars.len()
    }

    /// Whether no sidecars are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sidecars.is_empty()
    }

    /// Aggregate registered bytes.
    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_sequential_from_zero() {
        let mut registry = SidecarRegistry::new(1024);

        assert_eq!(registry.add(Bytes::from_static(b"a")).unwrap(), 0);
        assert_eq!(registry.add(Bytes::from_static(b"bb")).unwrap(), 1);
        assert_eq!(registry.add(Bytes::from_static(b"ccc")).unwrap(), 2);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.total_bytes(), 6);
    }

    #[test]
    fn test_order_preserved() {
        let mut registry = SidecarRegistry::new(1024);
        registry.add(Bytes::from_static(b"first")).unwrap();
        registry.add(Bytes::from_static(b"second")).unwrap();

        let blobs: Vec<&[u8]> = registry.as_slice().iter().map(|b| &b[..]).collect();
        assert_eq!(blobs, vec![&b"first"[..], &b"second"[..]]);
        assert_eq!(registry.get(0).unwrap(), &Bytes::from_static(b"first"));
        assert_eq!(registry.get(2), None);
    }

    #[test]
    fn test_empty_blob_still_gets_an_index() {
        let mut registry = SidecarRegistry::new(16);
        assert_eq!(registry.add(Bytes::new()).unwrap(), 0);
        assert_eq!(registry.total_bytes(), 0);
    }

    #[test]
    fn test_cap_rejects_and_leaves_registry_unchanged() {
        let mut registry = SidecarRegistry::new(8);
        registry.add(Bytes::from_static(b"123456")).unwrap();

        let err = registry.add(Bytes::from_static(b"xyz")).unwrap_err();
        assert!(matches!(
            err,
            RpcError::SidecarLimit {
                requested: 9,
                max: 8
            }
        ));

        // Failed add must not consume an index or count bytes.
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_bytes(), 6);
        assert_eq!(registry.add(Bytes::from_static(b"78")).unwrap(), 1);
    }
}
