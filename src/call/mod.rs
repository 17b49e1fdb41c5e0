//! Call module - the inbound call object and its parts.
//!
//! [`InboundCall`] is the cross-thread state machine at the center of the
//! crate; the other types here are its pieces: routing identity, timing
//! record, and the sidecar registry.

mod inbound;
mod remote_method;
mod sidecar;
mod timing;

pub use inbound::{BinaryCall, InboundCall};
pub use remote_method::RemoteMethod;
pub use sidecar::SidecarRegistry;
pub use timing::CallTiming;
