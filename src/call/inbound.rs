//! Inbound call on server.
//!
//! An [`InboundCall`] is born on the connection's receiving thread when a
//! complete transfer arrives, moves to a worker for handling, and dies
//! after exactly one terminal respond operation hands the serialized
//! response back to the connection. Ownership passes between threads one
//! at a time (receive → handle → respond); nothing here locks, because
//! nothing here is ever shared for mutation.
//!
//! Header parsing is deliberately cheap: it decodes the call header and
//! takes a zero-copy view over the remaining bytes. The request body is
//! never decoded on the receiving thread, which is shared across many
//! connections and must not block.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::codec::MsgPackCodec;
use crate::connection::{ConnectionHandle, ResponseFrame, UserCredentials};
use crate::dump::{CallInProgress, DumpRunningCallsRequest};
use crate::error::{ErrorCode, ErrorStatus, Result, RpcError};
use crate::metrics::LatencyHistogram;
use crate::protocol::{encode_response, CallHeader, InboundTransfer, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::trace::Trace;

use super::{CallTiming, RemoteMethod, SidecarRegistry};

/// Server-side view of one in-flight call.
///
/// One implementation exists per wire-protocol family; the connection
/// layer selects the variant when it accepts a transfer, before any
/// header parsing. Handlers and the server runtime only see this trait.
///
/// Every call must receive exactly one terminal respond operation
/// ([`respond_success`](Self::respond_success),
/// [`respond_failure`](Self::respond_failure), or
/// [`respond_application_error`](Self::respond_application_error)).
/// Invoking a second one is a programming error: fatal in debug builds,
/// rejected and logged in release builds.
pub trait InboundCall: Send + fmt::Display {
    /// The serialized request body.
    ///
    /// A zero-copy view into the transfer buffer; decoding it is the
    /// handler's job.
    fn serialized_request(&self) -> &Bytes;

    /// Routing identity parsed from the header.
    fn remote_method(&self) -> &RemoteMethod;

    /// Client-assigned call id, echoed in the response.
    fn call_id(&self) -> u32;

    /// Take ownership of an out-of-band response attachment.
    ///
    /// Returns the sidecar's index so the response payload can reference
    /// it. Indices are sequential from 0 in registration order.
    ///
    /// # Errors
    ///
    /// [`RpcError::SidecarLimit`] when the connection's aggregate cap
    /// would be exceeded; [`RpcError::AlreadyResponded`] after a
    /// terminal respond (fatal in debug builds).
    fn add_sidecar(&mut self, blob: Bytes) -> Result<usize>;

    /// Latest instant by which the client expects a response.
    ///
    /// `None` means the client supplied no deadline. The bound ignores
    /// network transit time, so it is an upper bound.
    fn client_deadline(&self) -> Option<Instant>;

    /// Whether the client's deadline has already elapsed.
    ///
    /// Advisory only: handlers may use it to skip expensive work whose
    /// result the client would discard. It never aborts anything, and a
    /// call with no deadline never times out.
    fn client_timed_out(&self) -> bool;

    /// Respond with a success payload and end the call.
    fn respond_success(&mut self, payload: Bytes);

    /// Respond with a generic failure and end the call.
    fn respond_failure(&mut self, code: ErrorCode, message: &str);

    /// Respond with an application-defined error and end the call.
    ///
    /// `ext_id` tells the client how to interpret `payload`; both travel
    /// verbatim inside the standard failure envelope.
    fn respond_application_error(&mut self, ext_id: u32, message: &str, payload: Bytes);

    /// Record the instant the call was accepted.
    ///
    /// Call at most once, from the thread that currently owns the call.
    fn record_call_received(&mut self);

    /// Record the instant handling started and report the elapsed queue
    /// time to `incoming_queue_time`.
    ///
    /// Call at most once, from the thread that currently owns the call.
    fn record_handling_started(&mut self, incoming_queue_time: &LatencyHistogram);

    /// Record the instant handling completed and report the elapsed
    /// handler time to `handler_run_time`.
    ///
    /// Call at most once, from the thread that currently owns the call.
    fn record_handling_completed(&mut self, handler_run_time: &LatencyHistogram);

    /// Populate a live-call snapshot for admin tooling.
    fn dump(&self, req: &DumpRunningCallsRequest, out: &mut CallInProgress);

    /// Shared trace handle.
    ///
    /// The connection layer clones this at acceptance time so events
    /// stay correlated after the call is gone.
    fn trace(&self) -> &Arc<Trace>;

    /// Handle to the connection that originated the call.
    fn connection(&self) -> &ConnectionHandle;

    /// Address of the remote peer.
    fn remote_addr(&self) -> SocketAddr {
        self.connection().remote_addr()
    }

    /// Effective credentials: the header's when present, otherwise the
    /// connection's.
    fn user_credentials(&self) -> &UserCredentials;
}

/// The call variant for the length-prefixed binary header family.
#[derive(Debug)]
pub struct BinaryCall {
    connection: ConnectionHandle,
    /// Owned transfer buffer; backs `serialized_request` and must be
    /// released together with it.
    transfer: Bytes,
    serialized_request: Bytes,
    header: CallHeader,
    credentials: UserCredentials,
    deadline: Option<Instant>,
    sidecars: SidecarRegistry,
    timing: CallTiming,
    trace: Arc<Trace>,
    responded: bool,
}

impl BinaryCall {
    /// Parse an inbound transfer into a call.
    ///
    /// Decodes only the call header; the remaining bytes become the
    /// serialized request, a zero-copy view sharing the transfer's
    /// storage. The client deadline is derived here, from the header's
    /// timeout and the current instant.
    ///
    /// # Errors
    ///
    /// [`RpcError::Protocol`] when the header is malformed. The caller
    /// must then synthesize a failure response itself; the call never
    /// reaches a worker.
    pub fn parse_from(connection: ConnectionHandle, transfer: InboundTransfer) -> Result<Self> {
        let buf = transfer.into_bytes();
        let (header, body_offset) = CallHeader::decode(&buf)?;

        let deadline = if header.timeout_ms > 0 {
            Some(Instant::now() + Duration::from_millis(u64::from(header.timeout_ms)))
        } else {
            None
        };

        let credentials = match &header.credentials {
            Some(user) => UserCredentials::new(user.clone()),
            None => connection.credentials().clone(),
        };

        let trace = Arc::new(Trace::new());
        trace.record(format!(
            "parsed header for {} ({} byte request)",
            header.remote_method,
            buf.len() - body_offset
        ));

        let max_sidecar_bytes = connection.config().max_sidecar_bytes;
        Ok(Self {
            connection,
            serialized_request: buf.slice(body_offset..),
            transfer: buf,
            header,
            credentials,
            deadline,
            sidecars: SidecarRegistry::new(max_sidecar_bytes),
            timing: CallTiming::new(),
            trace,
            responded: false,
        })
    }

    /// The owned transfer buffer backing every view into this call.
    #[inline]
    pub fn transfer(&self) -> &Bytes {
        &self.transfer
    }

    /// Gate for the respond-exactly-once rule.
    ///
    /// Single-owner handoff means no lock is needed; a plain flag
    /// suffices.
    fn begin_respond(&mut self) -> bool {
        if self.responded {
            debug_assert!(false, "terminal respond invoked twice on call {}", self);
            tracing::error!("Terminal respond invoked twice on call {}; dropping second response", self);
            return false;
        }
        self.responded = true;
        true
    }

    /// Common terminal step: serialize, trace, hand off to the
    /// connection. After this the call must not be used again.
    fn respond(&mut self, payload: Bytes, is_success: bool) {
        if !self.begin_respond() {
            return;
        }

        let buf = match self.serialize_response_buffer(&payload, is_success) {
            Ok(buf) => buf,
            Err(e) => {
                // The client is owed a reply; degrade, never drop.
                tracing::error!(
                    "Response serialization failed for call {}: {}; sending fallback failure",
                    self,
                    e
                );
                self.trace.record(format!("serialization failed: {e}"));
                self.fallback_failure_buffer()
            }
        };

        self.log_trace();
        self.queue_response_to_connection(buf);
    }

    /// Encode the response for this wire family: header, sidecar table,
    /// payload, sidecar bytes in index order.
    fn serialize_response_buffer(&self, payload: &[u8], is_success: bool) -> Result<Bytes> {
        encode_response(
            self.header.call_id,
            is_success,
            payload,
            self.sidecars.as_slice(),
            self.connection.config().max_payload_size,
        )
    }

    /// Minimal failure envelope used when serializing the real response
    /// failed. Sidecars are dropped; the envelope is bounded in size.
    fn fallback_failure_buffer(&self) -> Bytes {
        let status = ErrorStatus::new(ErrorCode::Unknown, "response serialization failed");
        let payload = MsgPackCodec::encode(&status).unwrap_or_default();
        encode_response(
            self.header.call_id,
            false,
            &payload,
            &[],
            DEFAULT_MAX_PAYLOAD_SIZE,
        )
        .expect("fallback envelope fits the default payload cap")
    }

    fn respond_error_status(&mut self, status: &ErrorStatus) {
        match MsgPackCodec::encode(status) {
            Ok(payload) => self.respond(Bytes::from(payload), false),
            Err(e) => {
                tracing::error!("Failed to encode failure envelope for call {}: {}", self, e);
                if self.begin_respond() {
                    let buf = self.fallback_failure_buffer();
                    self.log_trace();
                    self.queue_response_to_connection(buf);
                }
            }
        }
    }

    /// Warn when the response likely arrived after the client gave up,
    /// and emit the full trace when debug logging is enabled.
    fn log_trace(&self) {
        if self.header.timeout_ms > 0 {
            if let Some(total) = self.timing.total_time() {
                let budget = Duration::from_millis(u64::from(self.header.timeout_ms));
                if total > budget {
                    tracing::warn!(
                        "Call {} took {}ms, client timeout was {}ms; response was likely discarded",
                        self,
                        total.as_millis(),
                        self.header.timeout_ms
                    );
                }
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) && !self.trace.is_empty() {
            tracing::debug!("Trace for call {}:\n{}", self, self.trace.dump());
        }
    }

    /// Hand the finished buffer to the connection for transmission.
    ///
    /// Queueing never blocks. A severed or saturated connection is the
    /// one case where the client gets no reply; it observes a transport
    /// disconnect instead.
    fn queue_response_to_connection(&mut self, buf: Bytes) {
        self.trace.record("response queued to connection");
        let frame = ResponseFrame::new(self.header.call_id, buf);
        if let Err(e) = self.connection.queue_response(frame) {
            tracing::warn!("Failed to queue response for call {}: {}", self, e);
        }
    }
}

impl InboundCall for BinaryCall {
    fn serialized_request(&self) -> &Bytes {
        &self.serialized_request
    }

    fn remote_method(&self) -> &RemoteMethod {
        &self.header.remote_method
    }

    fn call_id(&self) -> u32 {
        self.header.call_id
    }

    fn add_sidecar(&mut self, blob: Bytes) -> Result<usize> {
        if self.responded {
            debug_assert!(false, "sidecar registered after respond on call {}", self);
            tracing::error!("Sidecar registered after respond on call {}; rejecting", self);
            return Err(RpcError::AlreadyResponded);
        }
        let len = blob.len();
        let idx = self.sidecars.add(blob)?;
        self.trace.record(format!("sidecar {idx} registered ({len} bytes)"));
        Ok(idx)
    }

    fn client_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn client_timed_out(&self) -> bool {
        // Deadline-equals-now counts as timed out.
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn respond_success(&mut self, payload: Bytes) {
        self.respond(payload, true);
    }

    fn respond_failure(&mut self, code: ErrorCode, message: &str) {
        let status = ErrorStatus::new(code, message);
        self.respond_error_status(&status);
    }

    fn respond_application_error(&mut self, ext_id: u32, message: &str, payload: Bytes) {
        let status = ErrorStatus::application_error(ext_id, message, payload.to_vec());
        self.respond_error_status(&status);
    }

    fn record_call_received(&mut self) {
        if self.timing.time_received.is_some() {
            debug_assert!(false, "time_received recorded twice on call {}", self);
            tracing::error!("time_received recorded twice on call {}", self);
            return;
        }
        self.timing.time_received = Some(Instant::now());
        self.trace.record("call received");
    }

    fn record_handling_started(&mut self, incoming_queue_time: &LatencyHistogram) {
        if self.timing.time_handled.is_some() {
            debug_assert!(false, "time_handled recorded twice on call {}", self);
            tracing::error!("time_handled recorded twice on call {}", self);
            return;
        }
        debug_assert!(
            self.timing.time_received.is_some(),
            "handling started before call {} was recorded as received",
            self
        );
        self.timing.time_handled = Some(Instant::now());
        if let Some(queue_time) = self.timing.queue_time() {
            incoming_queue_time.observe(queue_time);
            self.trace
                .record(format!("handling started after {}us in queue", queue_time.as_micros()));
        }
    }

    fn record_handling_completed(&mut self, handler_run_time: &LatencyHistogram) {
        if self.timing.time_completed.is_some() {
            debug_assert!(false, "time_completed recorded twice on call {}", self);
            tracing::error!("time_completed recorded twice on call {}", self);
            return;
        }
        debug_assert!(
            self.timing.time_handled.is_some(),
            "handling completed before call {} was recorded as started",
            self
        );
        self.timing.time_completed = Some(Instant::now());
        if let Some(handler_time) = self.timing.handler_time() {
            handler_run_time.observe(handler_time);
            self.trace
                .record(format!("handling completed in {}us", handler_time.as_micros()));
        }
    }

    fn dump(&self, req: &DumpRunningCallsRequest, out: &mut CallInProgress) {
        out.remote_addr = self.connection.remote_addr().to_string();
        out.user = self.credentials.user().to_string();
        out.remote_method = self.header.remote_method.to_string();
        out.call_id = self.header.call_id;
        out.elapsed_us = self
            .timing
            .time_received
            .map(|received| received.elapsed())
            .unwrap_or_else(|| self.trace.elapsed())
            .as_micros() as u64;
        out.state = if self.responded {
            "responded"
        } else if self.timing.time_handled.is_some() {
            "handling"
        } else {
            "queued"
        }
        .to_string();
        out.trace = req.include_traces.then(|| self.trace.dump());
    }

    fn trace(&self) -> &Arc<Trace> {
        &self.trace
    }

    fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    fn user_credentials(&self) -> &UserCredentials {
        &self.credentials
    }
}

impl fmt::Display for BinaryCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} id={}",
            self.header.remote_method,
            self.connection.remote_addr(),
            self.header.call_id
        )
    }
}
