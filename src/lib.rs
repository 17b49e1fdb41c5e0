//! # wirecall
//!
//! Server-side RPC call lifecycle: from the moment raw bytes arrive off
//! a connection to the moment the serialized response is handed back for
//! transmission.
//!
//! ## Architecture
//!
//! - **Receiving thread**: accepts a fully framed transfer, parses the
//!   call header ([`BinaryCall::parse_from`]) without touching the
//!   request body, then hands the call to a worker.
//! - **Worker**: reads [`serialized_request`](call::InboundCall::serialized_request),
//!   optionally registers sidecars, and invokes exactly one terminal
//!   respond operation.
//! - **Connection writer**: receives the finished response through a
//!   non-blocking queue ([`connection::ConnectionHandle`]) and writes it
//!   to the socket.
//!
//! Ownership of a call moves between those roles one at a time; nothing
//! is shared for mutation, so the core needs no locks.
//!
//! ## Example
//!
//! ```
//! use wirecall::call::{BinaryCall, InboundCall, RemoteMethod};
//! use wirecall::connection::{ConnectionConfig, ConnectionHandle, UserCredentials};
//! use wirecall::protocol::{CallHeader, InboundTransfer};
//!
//! // Connection layer: a handle per connection, plus a response queue.
//! let (conn, mut responses) = ConnectionHandle::channel(
//!     "127.0.0.1:4810".parse().unwrap(),
//!     UserCredentials::default(),
//!     ConnectionConfig::default(),
//! );
//!
//! // A transfer arrives (header + body), already framed.
//! let header = CallHeader {
//!     call_id: 7,
//!     timeout_ms: 0,
//!     remote_method: RemoteMethod::new("EchoService", "Echo"),
//!     credentials: None,
//! };
//! let transfer = InboundTransfer::new(header.encode_transfer(b"hi"));
//!
//! // Receiving thread parses the header; a worker echoes the body back.
//! let mut call = BinaryCall::parse_from(conn, transfer).unwrap();
//! let body = call.serialized_request().clone();
//! call.respond_success(body);
//!
//! assert!(responses.try_recv().is_ok());
//! ```

pub mod call;
pub mod codec;
pub mod connection;
pub mod dump;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod trace;

pub use call::{BinaryCall, InboundCall, RemoteMethod};
pub use connection::{ConnectionConfig, ConnectionHandle, UserCredentials};
pub use error::{ErrorCode, ErrorStatus, Result, RpcError};
pub use protocol::InboundTransfer;
pub use trace::Trace;
