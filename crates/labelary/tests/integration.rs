//! Integration tests for the rendering client, using a mock HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use zplgrid_core::{RenderOracle, RenderRequest};
use zplgrid_labelary::{LabelaryClient, LabelaryConfig, LabelaryError};

// ── Mock service ────────────────────────────────────────────────────────

/// One request as the mock server saw it.
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned reply: status line, extra headers, body.
struct Reply {
    status: &'static str,
    headers: Vec<(&'static str, &'static str)>,
    body: Vec<u8>,
}

impl Reply {
    fn new(status: &'static str, body: &[u8]) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_vec(),
        }
    }
}

/// Serves one connection per canned reply, then stops.
struct MockLabelary {
    addr: SocketAddr,
    handle: Option<thread::JoinHandle<Vec<Captured>>>,
}

impl MockLabelary {
    fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let (stream, _) = listener.accept().unwrap();
                stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut headers = Vec::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((k, v)) = line.split_once(':') {
                        headers.push((k.trim().to_string(), v.trim().to_string()));
                    }
                }
                let len = headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body).unwrap();

                let mut stream = reader.into_inner();
                let mut head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reply.body.len()
                );
                for (k, v) in &reply.headers {
                    head.push_str(&format!("{k}: {v}\r\n"));
                }
                head.push_str("\r\n");
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&reply.body).unwrap();
                stream.flush().unwrap();

                seen.push(Captured {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body: String::from_utf8(body).unwrap(),
                });
            }
            seen
        });

        Self {
            addr,
            handle: Some(handle),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(mut self) -> Vec<Captured> {
        self.handle.take().unwrap().join().unwrap()
    }
}

fn fast_client(base_url: String) -> LabelaryClient {
    let mut cfg = LabelaryConfig::default().with_base_url(base_url);
    cfg.timeout = Duration::from_secs(5);
    cfg.min_request_interval = Duration::ZERO;
    cfg.retry.initial_delay = Duration::from_millis(5);
    cfg.retry.max_delay = Duration::from_millis(5);
    LabelaryClient::new(cfg).unwrap()
}

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

// ── Rendering ───────────────────────────────────────────────────────────

#[test]
fn render_retries_after_throttling() {
    let server = MockLabelary::start(vec![
        Reply::new("429 Too Many Requests", b"slow down"),
        Reply::new("200 OK", PNG),
    ]);
    let client = fast_client(server.base_url());

    let png = client.render_png("^XA^FDx^FS^XZ", 8, 4.0, 6.0, 0).unwrap();
    assert_eq!(png, PNG);

    let seen = server.requests();
    assert_eq!(seen.len(), 2);
    for req in &seen {
        assert_eq!(req.request_line, "POST /v1/printers/8dpmm/labels/4.0x6.0/0/ HTTP/1.1");
        assert_eq!(req.header("accept"), Some("image/png"));
        assert_eq!(req.header("x-linter"), None);
        assert_eq!(req.body, "^XA^FDx^FS^XZ");
    }
}

#[test]
fn permanent_errors_surface_immediately() {
    let server = MockLabelary::start(vec![Reply::new("400 Bad Request", b"ERROR: bad label size")]);
    let client = fast_client(server.base_url());

    let err = client.render_png("^XA^XZ", 8, 4.0, 6.0, 0).unwrap_err();
    match err {
        LabelaryError::Http { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "ERROR: bad label size");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn throttling_exhausts_attempts() {
    let server = MockLabelary::start(vec![
        Reply::new("429 Too Many Requests", b""),
        Reply::new("429 Too Many Requests", b""),
        Reply::new("429 Too Many Requests", b""),
    ]);
    let client = fast_client(server.base_url());

    let err = client.render_png("^XA^XZ", 8, 4.0, 6.0, 0).unwrap_err();
    assert!(
        matches!(err, LabelaryError::RetriesExhausted { attempts: 3, .. }),
        "{err}"
    );
    assert_eq!(server.requests().len(), 3);
}

#[test]
fn client_serves_as_render_oracle() {
    let server = MockLabelary::start(vec![Reply::new("200 OK", PNG)]);
    let client = fast_client(server.base_url());
    let oracle: &dyn RenderOracle = &client;

    let png = oracle
        .render_png(&RenderRequest {
            zpl: "^XA^XZ",
            dpmm: 12,
            width_in: 2.5,
            height_in: 1.0,
        })
        .unwrap();
    assert_eq!(png, PNG);

    let seen = server.requests();
    assert_eq!(seen[0].request_line, "POST /v1/printers/12dpmm/labels/2.5x1.0/0/ HTTP/1.1");
}

// ── Linting ─────────────────────────────────────────────────────────────

#[test]
fn lint_compacts_and_parses_warnings() {
    let mut reply = Reply::new("200 OK", PNG);
    reply.headers.push((
        "X-Warnings",
        "4|3|^GB|2|Value 1 is less than minimum value 3; used 3 instead",
    ));
    let server = MockLabelary::start(vec![reply]);
    let client = fast_client(server.base_url());

    let warnings = client
        .lint("^XA\n  ^GB1,1,1^FS\n\n^XZ\n", 8, 4.0, 6.0, 0)
        .unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].byte_index, 4);
    assert_eq!(warnings[0].command, "^GB");
    assert_eq!(warnings[0].param_index, Some(2));

    let seen = server.requests();
    assert_eq!(seen[0].body, "^XA^GB1,1,1^FS^XZ");
    assert_eq!(seen[0].header("x-linter"), Some("On"));
}

#[test]
fn lint_without_warnings_header_is_clean() {
    let server = MockLabelary::start(vec![Reply::new("200 OK", PNG)]);
    let client = fast_client(server.base_url());
    assert!(client.lint("^XA^XZ", 8, 4.0, 6.0, 0).unwrap().is_empty());
    server.requests();
}
