//! Integration tests for wirecall.
//!
//! These exercise the full call lifecycle across modules: transfer in,
//! header parse, worker-side handling, response out through the
//! connection writer.

use bytes::Bytes;
use wirecall::call::{BinaryCall, InboundCall, RemoteMethod};
use wirecall::codec::MsgPackCodec;
use wirecall::connection::{
    spawn_connection_writer, ConnectionConfig, ConnectionHandle, ResponseFrame, UserCredentials,
};
use wirecall::error::{ErrorCode, ErrorStatus};
use wirecall::metrics::LatencyHistogram;
use wirecall::protocol::{decode_response, encode_response, CallHeader, InboundTransfer};

fn remote_addr() -> std::net::SocketAddr {
    "10.1.2.3:54321".parse().unwrap()
}

fn echo_transfer(call_id: u32, timeout_ms: u32, body: &[u8]) -> InboundTransfer {
    let header = CallHeader {
        call_id,
        timeout_ms,
        remote_method: RemoteMethod::new("EchoService", "Echo"),
        credentials: None,
    };
    InboundTransfer::new(header.encode_transfer(body))
}

/// Receiving thread parses, worker thread handles, response comes out the
/// connection queue: the complete handoff chain.
#[test]
fn test_full_lifecycle_across_threads() {
    let (conn, mut responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );

    // Receiving side: parse and record acceptance.
    let mut call = BinaryCall::parse_from(conn, echo_transfer(7, 0, b"hi")).unwrap();
    call.record_call_received();
    let trace = call.trace().clone(); // connection keeps a handle

    // Hand off to a worker thread; the call is moved, never shared.
    let queue_time = std::sync::Arc::new(LatencyHistogram::new());
    let handler_time = std::sync::Arc::new(LatencyHistogram::new());
    let (qt, ht) = (queue_time.clone(), handler_time.clone());

    let worker = std::thread::spawn(move || {
        call.record_handling_started(&qt);

        assert_eq!(call.remote_method().to_string(), "EchoService.Echo");
        assert!(!call.client_timed_out());
        let echoed = call.serialized_request().clone();

        call.record_handling_completed(&ht);
        call.respond_success(echoed);
    });
    worker.join().unwrap();

    let frame = responses.try_recv().unwrap();
    assert_eq!(frame.call_id, 7);
    let decoded = decode_response(frame.buf).unwrap();
    assert!(decoded.is_success);
    assert_eq!(&decoded.payload[..], b"hi");

    // One observation each, and the trace survived the call object.
    assert_eq!(queue_time.count(), 1);
    assert_eq!(handler_time.count(), 1);
    assert!(trace.dump().contains("response queued to connection"));
}

/// Sidecar table layout: N registrations yield N entries, index order.
#[test]
fn test_sidecar_table_matches_registration_order() {
    let (conn, mut responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );
    let mut call = BinaryCall::parse_from(conn, echo_transfer(1, 0, b"")).unwrap();

    let blobs: Vec<Bytes> = (0..5)
        .map(|i| Bytes::from(vec![i as u8; (i * 7 + 1) as usize]))
        .collect();
    for (i, blob) in blobs.iter().enumerate() {
        assert_eq!(call.add_sidecar(blob.clone()).unwrap(), i);
    }
    call.respond_success(Bytes::from_static(b"see sidecars"));

    let decoded = decode_response(responses.try_recv().unwrap().buf).unwrap();
    assert_eq!(decoded.sidecars.len(), 5);
    for (i, blob) in blobs.iter().enumerate() {
        assert_eq!(&decoded.sidecars[i], blob);
    }
}

/// Parse failure path: the receiving side synthesizes the failure
/// response itself; no worker is involved.
#[test]
fn test_parse_failure_synthesized_on_receiving_side() {
    let (conn, mut responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );

    let garbage = InboundTransfer::new(Bytes::from_static(b"\x00\x01"));
    let err = BinaryCall::parse_from(conn.clone(), garbage).unwrap_err();

    // What a receiving loop does with the error: wrap it in the standard
    // failure envelope and queue it directly. Call id 0 = unparseable.
    let status = ErrorStatus::new(ErrorCode::InvalidRequest, err.to_string());
    let payload = MsgPackCodec::encode(&status).unwrap();
    let buf = encode_response(0, false, &payload, &[], conn.config().max_payload_size).unwrap();
    conn.queue_response(ResponseFrame::new(0, buf)).unwrap();

    let decoded = decode_response(responses.try_recv().unwrap().buf).unwrap();
    assert!(!decoded.is_success);
    let status: ErrorStatus = MsgPackCodec::decode(&decoded.payload).unwrap();
    assert_eq!(status.code, ErrorCode::InvalidRequest);
    assert!(status.message.contains("truncated"));
}

/// Application errors reach the client verbatim, payload bit-for-bit.
#[test]
fn test_application_error_reaches_client_verbatim() {
    let (conn, mut responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );
    let mut call = BinaryCall::parse_from(conn, echo_transfer(11, 0, b"")).unwrap();

    let app_payload: Vec<u8> = (0..=255).collect();
    call.respond_application_error(42, "conflict", Bytes::from(app_payload.clone()));

    let decoded = decode_response(responses.try_recv().unwrap().buf).unwrap();
    let status: ErrorStatus = MsgPackCodec::decode(&decoded.payload).unwrap();
    assert_eq!(status.ext_id, Some(42));
    assert_eq!(status.message, "conflict");
    assert_eq!(status.app_payload.as_deref(), Some(app_payload.as_slice()));
}

/// The whole path down to socket bytes, through the real writer task.
#[tokio::test]
async fn test_response_reaches_the_wire() {
    use tokio::io::AsyncReadExt;

    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let (conn, writer_task) = spawn_connection_writer(
        client,
        remote_addr(),
        UserCredentials::new("alice"),
        ConnectionConfig::default(),
    );

    let mut call = BinaryCall::parse_from(conn, echo_transfer(77, 0, b"ping")).unwrap();
    assert_eq!(call.user_credentials().user(), "alice");
    call.add_sidecar(Bytes::from_static(b"bulk")).unwrap();
    call.respond_success(Bytes::from_static(b"pong"));
    drop(call); // last handle to the connection; writer drains and exits

    writer_task.await.unwrap().unwrap();

    let mut wire = Vec::new();
    server.read_to_end(&mut wire).await.unwrap();
    let decoded = decode_response(Bytes::from(wire)).unwrap();
    assert_eq!(decoded.call_id, 77);
    assert_eq!(&decoded.payload[..], b"pong");
    assert_eq!(&decoded.sidecars[0][..], b"bulk");
}

/// A timed-out call is still answered; the deadline is advisory.
#[test]
fn test_expired_deadline_does_not_block_response() {
    let (conn, mut responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );
    let mut call = BinaryCall::parse_from(conn, echo_transfer(2, 1, b"")).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(call.client_timed_out());

    // A handler that checks the advisory bit may skip work, but it still
    // owes a response.
    call.respond_failure(ErrorCode::ServerTooBusy, "deadline already passed");
    let decoded = decode_response(responses.try_recv().unwrap().buf).unwrap();
    assert!(!decoded.is_success);
}

/// Each histogram observation interval is ordered: completed >= started
/// >= received.
#[test]
fn test_timing_intervals_are_ordered() {
    let (conn, _responses) = ConnectionHandle::channel(
        remote_addr(),
        UserCredentials::default(),
        ConnectionConfig::default(),
    );
    let mut call = BinaryCall::parse_from(conn, echo_transfer(1, 0, b"")).unwrap();
    let queue_time = LatencyHistogram::new();
    let handler_time = LatencyHistogram::new();

    call.record_call_received();
    std::thread::sleep(std::time::Duration::from_millis(2));
    call.record_handling_started(&queue_time);
    std::thread::sleep(std::time::Duration::from_millis(2));
    call.record_handling_completed(&handler_time);

    // Both intervals were real sleeps, so both land at >= 2ms.
    assert!(queue_time.max_us() >= 2_000);
    assert!(handler_time.max_us() >= 2_000);
}
