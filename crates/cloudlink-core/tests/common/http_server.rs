//! Minimal HTTP/1.1 servers for integration tests.
//!
//! The echo server answers every request with `200 OK` and the raw request
//! (head and body) as the response body. The proxy accepts one `CONNECT`
//! per connection, records its head, replies `200` and then acts as the
//! echo server for the tunnelled request.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Starts an echo server in a background thread. Returns its port.
/// The server runs until the process exits.
pub fn start_echo() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut stream = stream;
                configure(&stream);
                if let Some(request) = read_request(&mut stream) {
                    echo(&mut stream, &request);
                }
            });
        }
    });
    port
}

/// CONNECT heads received by a proxy from [`start_proxy`].
pub type ConnectLog = Arc<Mutex<Vec<String>>>;

/// Starts a tunnelling proxy. Returns its port and the log of CONNECT heads.
pub fn start_proxy() -> (u16, ConnectLog) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let log = ConnectLog::default();
    let sink = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                let mut stream = stream;
                configure(&stream);
                let Some(connect) = read_request(&mut stream) else {
                    return;
                };
                let head = String::from_utf8_lossy(&connect).into_owned();
                let is_connect = head.starts_with("CONNECT ");
                sink.lock().unwrap().push(head);
                if !is_connect {
                    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
                    return;
                }
                let _ = stream.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n");
                if let Some(request) = read_request(&mut stream) {
                    echo(&mut stream, &request);
                }
            });
        }
    });
    (port, log)
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().unwrap().port()
}

fn configure(stream: &TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
}

fn echo(stream: &mut TcpStream, request: &[u8]) {
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        request.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(request);
}

/// Reads one request: the head up to the blank line plus a
/// `Content-Length` body, if any.
fn read_request(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find_head_end(&data) {
            break pos;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = std::str::from_utf8(&data[..head_end]).ok()?;
    let body_len = content_length(head);
    while data.len() < head_end + body_len {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    Some(data)
}

/// Index just past the `\r\n\r\n` that ends the head.
fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
