//! Minimal HTTP/1.1 server for integration tests: serves sized downloads and
//! fakes the Pixeldrain and Gofile upload endpoints.
//!
//! Routes:
//! - `GET /file/<n>`      200 with `n` bytes and Content-Length
//! - `GET /slow/<n>`      like `/file/<n>`, sent in 10 chunks 50ms apart
//! - `GET /nolength/<n>`  200 with `n` bytes, no Content-Length (close-delimited)
//! - `GET /status/<code>` responds with that status
//! - `POST /api/file`     Pixeldrain success `{"success":true,"id":"up<k>"}`
//! - `POST /gofile`       Gofile success
//! - `POST /garbage`      200 with a non-JSON body
//! - anything else        500

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
pub struct TestServer {
    /// e.g. "http://127.0.0.1:12345" (no trailing slash).
    pub base: String,
    uploads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Raw request bodies received by the upload endpoints.
    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploads.lock().unwrap().clone()
    }
}

/// Bytes served for a download of length `n`.
pub fn body_of(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Starts the server on a background thread; it runs until the process exits.
pub fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::new(AtomicUsize::new(0));
    let server_uploads = Arc::clone(&uploads);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let uploads = Arc::clone(&server_uploads);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &uploads, &counter));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        uploads,
    }
}

struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn handle(mut stream: TcpStream, uploads: &Mutex<Vec<Vec<u8>>>, counter: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    let segments: Vec<&str> = req.path.trim_start_matches('/').split('/').collect();
    let size = |s: Option<&&str>| s.and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);

    match (req.method.as_str(), segments.first().copied()) {
        ("GET", Some("file")) => {
            let body = body_of(size(segments.get(1)));
            respond(&mut stream, "200 OK", &body, true);
        }
        ("GET", Some("slow")) => {
            let body = body_of(size(segments.get(1)));
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let chunk = (body.len() / 10).max(1);
            for part in body.chunks(chunk) {
                let _ = stream.write_all(part);
                let _ = stream.flush();
                thread::sleep(Duration::from_millis(50));
            }
        }
        ("GET", Some("nolength")) => {
            let body = body_of(size(segments.get(1)));
            respond(&mut stream, "200 OK", &body, false);
        }
        ("GET", Some("status")) => {
            let code = size(segments.get(1));
            respond(&mut stream, &format!("{} Test", code), b"status page", true);
        }
        ("POST", Some("api")) => {
            uploads.lock().unwrap().push(req.body);
            let k = counter.fetch_add(1, Ordering::SeqCst);
            let json = format!(r#"{{"success":true,"id":"up{}"}}"#, k);
            respond(&mut stream, "201 Created", json.as_bytes(), true);
        }
        ("POST", Some("gofile")) => {
            uploads.lock().unwrap().push(req.body);
            let json = r#"{"status":"ok","data":{"downloadPage":"https://gofile.io/d/test","code":"test"}}"#;
            respond(&mut stream, "200 OK", json.as_bytes(), true);
        }
        ("POST", Some("garbage")) => {
            respond(&mut stream, "200 OK", b"<html>not json</html>", true);
        }
        _ => respond(&mut stream, "500 Internal Server Error", b"", true),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8], with_length: bool) {
    let length = if with_length {
        format!("Content-Length: {}\r\n", body.len())
    } else {
        String::new()
    };
    let head = format!("HTTP/1.1 {}\r\n{}Connection: close\r\n\r\n", status, length);
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Reads headers and (Content-Length or chunked) body. Answers
/// `Expect: 100-continue` so curl does not stall on large uploads.
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();

    let mut content_length = 0usize;
    let mut chunked = false;
    let mut expect_continue = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim().to_ascii_lowercase(), value.trim());
        match name.as_str() {
            "content-length" => content_length = value.parse().unwrap_or(0),
            "transfer-encoding" => chunked = value.eq_ignore_ascii_case("chunked"),
            "expect" => expect_continue = value.eq_ignore_ascii_case("100-continue"),
            _ => {}
        }
    }
    if expect_continue {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
    }

    let mut body = buf[header_end..].to_vec();
    loop {
        let done = if chunked {
            body.ends_with(b"0\r\n\r\n")
        } else {
            body.len() >= content_length
        };
        if done {
            break;
        }
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    Some(Request { method, path, body })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
