//! Line-delimited JSON wire codec.
//!
//! Each connection carries exactly one request line and one response line,
//! both UTF-8 JSON terminated by `\n`.

use matcher::{Request, Response};
use serde_json::{Map, Value};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Reasons a request line is rejected before it reaches a worker.
///
/// The `Display` text is sent back to the client as the error message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty payload")]
    EmptyPayload,

    #[error("Request exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Timed out waiting for request")]
    Timeout,

    #[error("Request is not valid UTF-8")]
    InvalidUtf8,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("JSON is not an object")]
    NotAnObject,

    #[error("Invalid request: missing fullText")]
    MissingFullText,

    #[error("Failed to encode response: {0}")]
    Encode(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Decode one request line.
///
/// Field values may be any JSON scalar: strings are taken verbatim, `null`
/// counts as absent, and other values are kept in their JSON text form.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    let value: Value =
        serde_json::from_str(line).map_err(|err| ProtocolError::InvalidJson(err.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let full_text = string_field(&fields, "fullText").ok_or(ProtocolError::MissingFullText)?;
    Ok(Request {
        request_id: string_field(&fields, "requestId"),
        user_id: string_field(&fields, "userId"),
        file_name: string_field(&fields, "fileName"),
        full_text,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Encode a response as a single JSON line, without the trailing newline.
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    serde_json::to_string(response).map_err(|err| ProtocolError::Encode(err.to_string()))
}

/// Read one `\n`-terminated line of at most `max_bytes` bytes (terminator and
/// an optional preceding `\r` excluded). EOF also ends the line.
pub async fn read_line<R>(
    reader: R,
    max_bytes: usize,
    timeout: Duration,
) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    // Room for the payload plus "\r\n"; anything longer is over the limit.
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(2);
    let mut reader = BufReader::new(reader.take(limit));
    let mut buf = Vec::new();

    tokio::time::timeout(timeout, reader.read_until(b'\n', &mut buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > max_bytes {
        return Err(ProtocolError::TooLarge(max_bytes));
    }
    if buf.is_empty() {
        return Err(ProtocolError::EmptyPayload);
    }
    String::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Read and decode the request line of a connection.
pub async fn read_request<R>(
    reader: R,
    max_bytes: usize,
    timeout: Duration,
) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let line = read_line(reader, max_bytes, timeout).await?;
    decode_request(&line)
}

/// Read and throw away up to `max_bytes` of whatever the peer is still
/// sending, stopping early at EOF. Returns the number of bytes discarded.
pub async fn discard_input<R>(
    reader: R,
    max_bytes: u64,
    timeout: Duration,
) -> Result<u64, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut limited = reader.take(max_bytes);
    let mut sink = tokio::io::sink();
    let copy = tokio::io::copy(&mut limited, &mut sink);
    let discarded = tokio::time::timeout(timeout, copy)
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(discarded)
}

/// Write `response` as one line and flush it.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode_response(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matcher::{MatchResult, Status};

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn decodes_all_fields() {
        let req = decode_request(
            r#"{"requestId":"r1","userId":"u1","fileName":"essay.txt","fullText":"some text"}"#,
        )
        .unwrap();
        assert_eq!(req.request_id.as_deref(), Some("r1"));
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.file_name.as_deref(), Some("essay.txt"));
        assert_eq!(req.full_text, "some text");
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let req = decode_request(r#"{"fullText":"x","requestId":null}"#).unwrap();
        assert_eq!(req.request_id, None);
        assert_eq!(req.user_id, None);
        assert_eq!(req.file_name, None);
    }

    #[test]
    fn non_string_scalars_are_stringified() {
        let req = decode_request(r#"{"requestId":42,"userId":true,"fullText":1.5}"#).unwrap();
        assert_eq!(req.request_id.as_deref(), Some("42"));
        assert_eq!(req.user_id.as_deref(), Some("true"));
        assert_eq!(req.full_text, "1.5");
    }

    #[test]
    fn empty_full_text_is_accepted_by_the_codec() {
        let req = decode_request(r#"{"fullText":""}"#).unwrap();
        assert_eq!(req.full_text, "");
    }

    #[test]
    fn rejects_missing_full_text() {
        for line in [r#"{"requestId":"r1"}"#, r#"{"fullText":null}"#, "{}"] {
            let err = decode_request(line).unwrap_err();
            assert_eq!(err.to_string(), "Invalid request: missing fullText");
        }
    }

    #[test]
    fn rejects_non_objects() {
        for line in ["[1,2]", "\"text\"", "42", "null"] {
            let err = decode_request(line).unwrap_err();
            assert_eq!(err.to_string(), "JSON is not an object");
        }
    }

    #[test]
    fn rejects_malformed_json() {
        for line in ["not json", "{\"fullText\":", "{} trailing"] {
            assert!(matches!(
                decode_request(line),
                Err(ProtocolError::InvalidJson(_))
            ));
        }
    }

    #[test]
    fn encodes_single_line() {
        let response = Response::success(
            Some("r1".into()),
            vec![MatchResult::new("doc1.txt", 1.0)],
        );
        let line = encode_response(&response).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            r#"{"requestId":"r1","status":"SUCCESS","matches":[{"fileName":"doc1.txt","similarity":1.0,"description":"Similarity: 100.00%"}]}"#
        );

        let error = encode_response(&Response::error(None, "Empty payload")).unwrap();
        assert_eq!(error, r#"{"status":"ERROR","errorMessage":"Empty payload"}"#);
    }

    #[tokio::test]
    async fn read_line_strips_terminators() {
        let line = read_line(&b"{\"fullText\":\"a\"}\r\nextra"[..], 1024, SECOND)
            .await
            .unwrap();
        assert_eq!(line, "{\"fullText\":\"a\"}");
    }

    #[tokio::test]
    async fn read_line_accepts_eof_without_newline() {
        let line = read_line(&b"abc"[..], 3, SECOND).await.unwrap();
        assert_eq!(line, "abc");
    }

    #[tokio::test]
    async fn read_line_rejects_empty() {
        for input in [&b""[..], &b"\n"[..], &b"\r\n"[..]] {
            let err = read_line(input, 1024, SECOND).await.unwrap_err();
            assert!(matches!(err, ProtocolError::EmptyPayload));
        }
    }

    #[tokio::test]
    async fn read_line_enforces_limit() {
        assert_eq!(read_line(&b"12345\n"[..], 5, SECOND).await.unwrap(), "12345");
        assert_eq!(read_line(&b"12345\r\n"[..], 5, SECOND).await.unwrap(), "12345");
        let err = read_line(&b"123456\n"[..], 5, SECOND).await.unwrap_err();
        assert_eq!(err.to_string(), "Request exceeds 5 bytes");
        let err = read_line(&b"1234567890"[..], 5, SECOND).await.unwrap_err();
        assert!(matches!(err, ProtocolError::TooLarge(5)));
    }

    #[tokio::test]
    async fn discard_input_stops_at_limit_or_eof() {
        let input = vec![b'x'; 100];
        assert_eq!(discard_input(&input[..], 10, SECOND).await.unwrap(), 10);
        assert_eq!(discard_input(&input[..], 1000, SECOND).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn discard_input_gives_up_on_idle_peer() {
        let (_client, server) = tokio::io::duplex(64);
        let err = discard_input(server, 1024, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout));
    }

    #[tokio::test]
    async fn read_line_rejects_invalid_utf8() {
        let err = read_line(&[0xff, 0xfe, b'\n'][..], 1024, SECOND)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8));
    }

    #[tokio::test]
    async fn read_line_times_out() {
        let (_client, server) = tokio::io::duplex(64);
        let err = read_line(server, 1024, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Timed out waiting for request");
    }

    #[tokio::test]
    async fn write_response_appends_newline() {
        let mut out = Vec::new();
        write_response(&mut out, &Response::error(None, "boom"))
            .await
            .unwrap();
        assert_eq!(out, b"{\"status\":\"ERROR\",\"errorMessage\":\"boom\"}\n");
        assert_eq!(
            serde_json::from_slice::<Response>(&out).unwrap().status,
            Status::Error
        );
    }
}
