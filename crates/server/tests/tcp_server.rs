use matcher::{DetectorConfig, PlagiarismDetector, Response, Status};
use server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const FOX: &str = "the quick brown fox jumps over the lazy dog";

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<server::ServerResult<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig, detector: PlagiarismDetector) -> Self {
        let server = Server::bind(config, detector).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server.serve(async {
            let _ = rx.await;
        }));
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn with_docs(workers: usize, docs: &[(&str, &str)]) -> Self {
        let detector =
            PlagiarismDetector::from_documents(DetectorConfig::default(), docs.iter().copied())
                .unwrap();
        Self::start(config(workers), detector).await
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(15), self.handle)
            .await
            .expect("server stops")
            .unwrap()
            .unwrap();
    }
}

fn config(workers: usize) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1".into(),
        port: 0,
        workers,
        read_timeout_secs: 5,
        drain_timeout_secs: 5,
        ..Default::default()
    }
}

async fn read_reply(mut stream: TcpStream) -> Response {
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.ends_with('\n'), "reply must be newline terminated: {raw:?}");
    assert_eq!(raw.lines().count(), 1, "exactly one reply line: {raw:?}");
    serde_json::from_str(raw.trim_end()).unwrap()
}

async fn send_raw(addr: SocketAddr, payload: &[u8]) -> Response {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    read_reply(stream).await
}

async fn send_line(addr: SocketAddr, line: &str) -> Response {
    send_raw(addr, format!("{line}\n").as_bytes()).await
}

fn request(request_id: &str, text: &str) -> String {
    serde_json::json!({ "requestId": request_id, "fullText": text }).to_string()
}

#[tokio::test]
async fn identical_document_is_reported() {
    let server = TestServer::with_docs(2, &[("doc1.txt", FOX)]).await;

    let response = send_line(server.addr, &request("r1", FOX)).await;
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.request_id.as_deref(), Some("r1"));
    let matches = response.matches.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file_name, "doc1.txt");
    assert!((matches[0].similarity - 1.0).abs() < 1e-9);

    server.stop().await;
}

#[tokio::test]
async fn empty_text_is_an_error() {
    let server = TestServer::with_docs(1, &[("doc1.txt", FOX)]).await;

    let response = send_line(server.addr, &request("r2", "")).await;
    assert_eq!(response.status, Status::Error);
    assert_eq!(response.request_id.as_deref(), Some("r2"));
    assert_eq!(
        response.error_message.as_deref(),
        Some("Document empty after preprocessing")
    );
    assert!(response.matches.is_none());

    server.stop().await;
}

#[tokio::test]
async fn malformed_line_is_rejected_and_server_keeps_running() {
    let server = TestServer::with_docs(1, &[("doc1.txt", FOX)]).await;

    let response = send_line(server.addr, "this is not json").await;
    assert_eq!(response.status, Status::Error);
    assert!(response
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Invalid JSON"));
    assert!(response.matches.is_none());

    let response = send_line(server.addr, &request("after", FOX)).await;
    assert_eq!(response.status, Status::Success);

    server.stop().await;
}

#[tokio::test]
async fn parse_errors_carry_specific_messages() {
    let server = TestServer::with_docs(1, &[]).await;

    let cases = [
        (r#"{"requestId":"x"}"#, "Invalid request: missing fullText"),
        ("[1,2,3]", "JSON is not an object"),
        ("", "Empty payload"),
    ];
    for (line, expected) in cases {
        let response = send_line(server.addr, line).await;
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.error_message.as_deref(), Some(expected));
        // Parse errors are answered before the request id is known.
        assert_eq!(response.request_id, None);
    }

    server.stop().await;
}

#[tokio::test]
async fn closed_connection_without_payload_is_empty() {
    let server = TestServer::with_docs(1, &[]).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.shutdown().await.unwrap();
    let response = read_reply(stream).await;
    assert_eq!(response.error_message.as_deref(), Some("Empty payload"));

    server.stop().await;
}

#[tokio::test]
async fn oversized_request_is_rejected() {
    let detector = PlagiarismDetector::new(DetectorConfig::default()).unwrap();
    let server = TestServer::start(
        ServerConfig {
            max_request_bytes: 16,
            ..config(1)
        },
        detector,
    )
    .await;

    // Exactly as many bytes as the server reads before giving up.
    let response = send_raw(server.addr, &[b'a'; 18]).await;
    assert_eq!(response.status, Status::Error);
    assert_eq!(
        response.error_message.as_deref(),
        Some("Request exceeds 16 bytes")
    );

    server.stop().await;
}

#[tokio::test]
async fn far_oversized_request_still_gets_reply() {
    let detector = PlagiarismDetector::new(DetectorConfig::default()).unwrap();
    let server = TestServer::start(
        ServerConfig {
            max_request_bytes: 1024,
            ..config(2)
        },
        detector,
    )
    .await;

    let payload = format!("{{\"fullText\":\"{}\"}}\n", "word ".repeat(200_000));
    for _ in 0..5 {
        let response = send_raw(server.addr, payload.as_bytes()).await;
        assert_eq!(response.status, Status::Error);
        assert_eq!(
            response.error_message.as_deref(),
            Some("Request exceeds 1024 bytes")
        );
    }

    server.stop().await;
}

#[tokio::test]
async fn silent_client_times_out() {
    let detector = PlagiarismDetector::new(DetectorConfig::default()).unwrap();
    let server = TestServer::start(
        ServerConfig {
            read_timeout_secs: 1,
            ..config(1)
        },
        detector,
    )
    .await;

    let stream = TcpStream::connect(server.addr).await.unwrap();
    let response = tokio::time::timeout(Duration::from_secs(5), read_reply(stream))
        .await
        .expect("server answers after its read timeout");
    assert_eq!(
        response.error_message.as_deref(),
        Some("Timed out waiting for request")
    );

    server.stop().await;
}

#[tokio::test]
async fn missing_corpus_directory_serves_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let (detector, report) =
        PlagiarismDetector::from_corpus_dir(DetectorConfig::default(), dir.path().join("absent"))
            .unwrap();
    assert_eq!(report.indexed, 0);
    let server = TestServer::start(config(2), detector).await;

    let response = send_line(server.addr, &request("d", FOX)).await;
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.matches, Some(vec![]));

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn more_clients_than_workers_all_get_one_reply() {
    let server = TestServer::with_docs(
        2,
        &[
            ("doc1.txt", FOX),
            ("doc2.txt", "lorem ipsum dolor sit amet consectetur adipiscing elit"),
        ],
    )
    .await;

    let clients: Vec<_> = (0..48)
        .map(|i| {
            let addr = server.addr;
            tokio::spawn(async move {
                let id = format!("req-{i}");
                let text = if i % 3 == 0 { "" } else { FOX };
                let response = send_line(addr, &request(&id, text)).await;
                (id, text, response)
            })
        })
        .collect();

    for client in clients {
        let (id, text, response) = client.await.unwrap();
        assert_eq!(response.request_id.as_deref(), Some(id.as_str()));
        if text.is_empty() {
            assert_eq!(response.status, Status::Error);
        } else {
            assert_eq!(response.status, Status::Success);
            assert_eq!(response.matches.unwrap()[0].file_name, "doc1.txt");
        }
    }

    server.stop().await;
}

#[tokio::test]
async fn accepted_connection_is_served_during_shutdown() {
    let server = TestServer::with_docs(1, &[("doc1.txt", FOX)]).await;
    let addr = server.addr;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    // Let the accept loop pick the connection up before shutting down.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let TestServer {
        shutdown, handle, ..
    } = server;
    shutdown.unwrap().send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    stream
        .write_all(format!("{}\n", request("late", FOX)).as_bytes())
        .await
        .unwrap();
    let response = read_reply(stream).await;
    assert_eq!(response.status, Status::Success);
    assert_eq!(response.request_id.as_deref(), Some("late"));

    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("server stops after draining")
        .unwrap()
        .unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn invalid_config_is_rejected_at_bind() {
    let detector = PlagiarismDetector::new(DetectorConfig::default()).unwrap();
    let result = Server::bind(config(0), detector).await;
    assert!(matches!(result, Err(server::ServerError::Config(_))));
}
