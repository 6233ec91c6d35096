//! In-process HTTP server for round-trip tests.
//!
//! Routes:
//! - `/` answers every verb with a small JSON object naming the verb.
//! - `/echo` returns the POSTed body with the same content type.
//! - `/slow` answers after five seconds.
//!
//! Anything else is a 404.
//!
//! [`serve_once`] stands in for a misbehaving peer that writes raw bytes.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue, Method},
    response::IntoResponse,
    routing::{any, get, post},
    Router,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn app() -> Router {
    Router::new()
        .route("/", any(root))
        .route("/echo", post(echo))
        .route("/slow", get(slow))
}

async fn root(method: Method) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        format!(r#"{{"method":"{method}"}}"#),
    )
}

async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

/// Starts the server on a random port and returns its base url, ending in `/`.
pub fn spawn_server() -> String {
    init_logging();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            axum::serve(listener, app()).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

/// A url on which nothing is listening.
pub fn closed_url() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{port}/")
}

/// Accepts one connection, reads the request head, writes `response` verbatim and hangs up.
pub fn serve_once(response: &'static [u8]) -> String {
    init_logging();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() != 0 && line != "\r\n" {
            line.clear();
        }
        stream.write_all(response).unwrap();
    });

    format!("http://{addr}/")
}
