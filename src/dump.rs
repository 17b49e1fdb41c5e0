//! Live-call introspection for admin tooling.
//!
//! A server's debug endpoint asks each in-flight call to populate a
//! [`CallInProgress`] snapshot. Snapshots are plain serde structs so the
//! admin surface can render them as JSON.

use serde::Serialize;

/// Options for a running-calls dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpRunningCallsRequest {
    /// Include each call's trace dump in the snapshot.
    pub include_traces: bool,
}

/// Snapshot of one in-flight call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallInProgress {
    /// Remote peer address.
    pub remote_addr: String,
    /// Effective user for the call.
    pub user: String,
    /// `service.method`, empty until the header is parsed.
    pub remote_method: String,
    /// Client-assigned call id.
    pub call_id: u32,
    /// Microseconds since the call was accepted.
    pub elapsed_us: u64,
    /// Lifecycle state: `queued`, `handling`, or `responded`.
    pub state: String,
    /// Rendered trace, present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl CallInProgress {
    /// Render the snapshot as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("snapshot serialization is infallible")
    }
}
