//! Codec Tests
//!
//! Tests for request and reply encoding/decoding.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, ErrorKind};

use tablecache::protocol::{
    Operation, Reply, Request, RequestBody, Status,
    encode_request, decode_request,
    encode_reply, decode_reply, encode_error,
    read_request, write_request,
    read_reply, write_reply,
    read_frame, HEADER_SIZE, MAX_FRAME_SIZE,
};
use tablecache::CacheError;

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_request_header_carries_op_code() {
    let request = Request::get("users", b"1".to_vec());
    let encoded = encode_request(&request).unwrap();

    assert_eq!(encoded[0], Operation::Get as u8);
    let body_len = u32::from_be_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]) as usize;
    assert_eq!(encoded.len(), HEADER_SIZE + body_len);
}

#[test]
fn test_encode_decode_set_with_absent_value() {
    let request = Request::set("t", b"k".to_vec(), None);
    let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();

    assert_eq!(decoded, request);
    assert_eq!(decoded.body.value, None);
}

#[test]
fn test_encode_decode_set_batch() {
    let mut entries = BTreeMap::new();
    entries.insert(b"a".to_vec(), Some(b"1".to_vec()));
    entries.insert(b"b".to_vec(), None);

    let request = Request::set_batch("t", entries.clone());
    let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();

    assert_eq!(decoded.operation().unwrap(), Operation::SetBatch);
    assert_eq!(decoded.body.entries, Some(entries));
}

#[test]
fn test_unknown_op_code_still_decodes() {
    let request = Request::raw(0x99, RequestBody::default());
    let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();

    assert_eq!(decoded.op, 0x99);
    assert!(decoded.operation().is_err());
}

#[test]
fn test_operation_codes_are_stable() {
    for code in 0x01..=0x0Cu8 {
        let op = Operation::try_from(code).unwrap();
        assert_eq!(op as u8, code);
    }
    assert!(Operation::try_from(0x00).is_err());
    assert!(Operation::try_from(0x0D).is_err());
}

#[test]
fn test_decode_request_incomplete_header() {
    let result = decode_request(&[0x03, 0x00]);
    assert!(result.is_err());
}

#[test]
fn test_decode_request_truncated_body() {
    let mut encoded = encode_request(&Request::get("users", b"1".to_vec())).unwrap();
    encoded.pop();

    assert!(decode_request(&encoded).is_err());
}

#[test]
fn test_decode_request_garbage_body() {
    let bytes = [Operation::Get as u8, 0, 0, 0, 2, 0xFF, 0xFF];
    assert!(decode_request(&bytes).is_err());
}

#[test]
fn test_decode_request_oversized_length() {
    let mut bytes = vec![Operation::Get as u8];
    bytes.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_be_bytes());

    let err = decode_request(&bytes).unwrap_err();
    assert!(err.to_string().contains("too large"));
}

// =============================================================================
// Reply Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_reply_status_bytes() {
    assert_eq!(encode_reply(&Reply::Payload(None)).unwrap()[0], Status::Payload as u8);
    assert_eq!(encode_reply(&Reply::Batch(BTreeMap::new())).unwrap()[0], Status::Batch as u8);
    assert_eq!(encode_reply(&Reply::Success(3)).unwrap()[0], Status::Success as u8);
    assert_eq!(encode_reply(&Reply::error("x")).unwrap()[0], Status::Error as u8);
    assert_eq!(encode_reply(&Reply::Tables(BTreeSet::new())).unwrap()[0], Status::Tables as u8);
}

#[test]
fn test_payload_distinguishes_missing_from_absent_value() {
    let missing = decode_reply(&encode_reply(&Reply::Payload(None)).unwrap()).unwrap();
    let absent = decode_reply(&encode_reply(&Reply::Payload(Some(None))).unwrap()).unwrap();

    assert_eq!(missing, Reply::Payload(None));
    assert_eq!(absent, Reply::Payload(Some(None)));
}

#[test]
fn test_error_reply_is_plain_utf8() {
    let encoded = encode_reply(&Reply::error("table name cannot be empty")).unwrap();

    assert_eq!(&encoded[HEADER_SIZE..], b"table name cannot be empty");
    assert_eq!(encoded, encode_error("table name cannot be empty"));
}

#[test]
fn test_encode_decode_tables() {
    let names: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    let decoded = decode_reply(&encode_reply(&Reply::Tables(names.clone())).unwrap()).unwrap();

    assert_eq!(decoded, Reply::Tables(names));
}

#[test]
fn test_decode_reply_unknown_status() {
    let bytes = [0x7F, 0, 0, 0, 0];
    let err = decode_reply(&bytes).unwrap_err();

    assert!(err.to_string().contains("Unknown reply status"));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_multiple_requests() {
    let mut buffer = Vec::new();
    write_request(&mut buffer, &Request::list_tables()).unwrap();
    write_request(&mut buffer, &Request::table_size("t")).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_request(&mut cursor).unwrap(), Request::list_tables());
    assert_eq!(read_request(&mut cursor).unwrap(), Request::table_size("t"));
}

#[test]
fn test_stream_reply() {
    let mut buffer = Vec::new();
    write_reply(&mut buffer, &Reply::Success(42)).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Success(42));
}

#[test]
fn test_read_frame_respects_limit() {
    let encoded = encode_request(&Request::set("t", b"k".to_vec(), Some(vec![0u8; 64]))).unwrap();

    let mut cursor = Cursor::new(encoded.clone());
    assert!(read_frame(&mut cursor, 8).is_err());

    let mut cursor = Cursor::new(encoded.clone());
    assert_eq!(read_frame(&mut cursor, MAX_FRAME_SIZE).unwrap(), encoded);
}

#[test]
fn test_read_request_eof() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    assert!(read_request(&mut cursor).is_err());
}

#[test]
fn test_read_frame_truncated_body_is_eof() {
    let encoded = encode_request(&Request::set("t", b"k".to_vec(), Some(vec![7u8; 32]))).unwrap();
    let mut cursor = Cursor::new(encoded[..encoded.len() - 10].to_vec());

    match read_frame(&mut cursor, MAX_FRAME_SIZE) {
        Err(CacheError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected UnexpectedEof, got {:?}", other),
    }
}

#[test]
fn test_read_frame_large_advertised_length_with_short_body() {
    // Header claims the full limit but only a few bytes follow
    let mut frame = vec![Operation::Set as u8];
    frame.extend_from_slice(&MAX_FRAME_SIZE.to_be_bytes());
    frame.extend_from_slice(b"short");
    let mut cursor = Cursor::new(frame);

    match read_frame(&mut cursor, MAX_FRAME_SIZE) {
        Err(CacheError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected UnexpectedEof, got {:?}", other),
    }
}
