//! Dashboard HTTP server
//!
//! Endpoints:
//!   GET /               - HTML dashboard for the selection in the query
//!   GET /api/dashboard  - same dashboard as JSON
//!   GET /api/options    - distinct values of every filter dimension
//!   GET /api/health     - health check
//!
//! Every request carries its own selection; the only shared state is the
//! read-only table behind [`AppState`].

use anyhow::{Context, Result};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use url::Url;

use crate::dashboard::render;
use crate::filter::FilterSelection;
use crate::html::render_page;
use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::state::AppState;

const MAX_HEAD_BYTES: usize = 16 * 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn new(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

fn json_response<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(body) => Response::new(200, "application/json", body),
        Err(err) => Response::new(
            500,
            "application/json",
            json!({ "error": err.to_string() }).to_string(),
        ),
    }
}

/// Map one request to a response. No I/O.
pub fn route(state: &AppState, method: &str, target: &str) -> Response {
    if method != "GET" {
        return Response::new(405, "text/plain", "Method Not Allowed".to_string());
    }
    let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(_) => return Response::new(400, "text/plain", "Bad Request".to_string()),
    };
    let query = url.query().unwrap_or("");

    match url.path() {
        "/" => {
            let selection = FilterSelection::from_query(query, &state.options);
            let dashboard = render(&state.dataset, &selection, &state.settings);
            let page = render_page(&dashboard, &state.options);
            Response::new(200, "text/html; charset=utf-8", page)
        }
        "/api/dashboard" => {
            let selection = FilterSelection::from_query(query, &state.options);
            json_response(&render(&state.dataset, &selection, &state.settings))
        }
        "/api/options" => json_response(state.options.as_ref()),
        "/api/health" => Response::new(200, "application/json", r#"{"status":"ok"}"#.to_string()),
        _ => Response::new(404, "text/plain", "Not Found".to_string()),
    }
}

/// Read the request head and return (method, target).
async fn read_request_line(stream: &mut TcpStream) -> Result<Option<(String, String)>> {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 2048];
    loop {
        let n = stream.read(&mut buf).await.context("reading request")?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") || head.len() >= MAX_HEAD_BYTES {
            break;
        }
    }
    let text = String::from_utf8_lossy(&head);
    let Some(line) = text.lines().next() else {
        return Ok(None);
    };
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => Ok(Some((method.to_string(), target.to_string()))),
        _ => Ok(None),
    }
}

async fn handle(mut stream: TcpStream, state: AppState) -> Result<()> {
    let started = Instant::now();
    let head = match timeout(state.request_timeout, read_request_line(&mut stream)).await {
        Ok(head) => head?,
        Err(_) => {
            log(
                Level::Debug,
                Domain::Http,
                "request_timeout",
                obj(&[("after_ms", json!(state.request_timeout.as_millis() as u64))]),
            );
            return Ok(());
        }
    };
    let Some((method, target)) = head else {
        return Ok(());
    };
    let resp = route(&state, &method, &target);
    stream
        .write_all(resp.to_http().as_bytes())
        .await
        .context("writing response")?;
    stream.shutdown().await.ok();
    let path = target.split('?').next().unwrap_or("");
    log_request(&method, path, resp.status, started.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

// Errors like EMFILE repeat until a descriptor frees up.
async fn accept_failed(err: &std::io::Error) {
    log(
        Level::Warn,
        Domain::Http,
        "accept_failed",
        obj(&[("error", v_str(&err.to_string()))]),
    );
    sleep(ACCEPT_BACKOFF).await;
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                accept_failed(&err).await;
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle(stream, state).await {
                log(
                    Level::Warn,
                    Domain::Http,
                    "connection_failed",
                    obj(&[
                        ("peer", v_str(&peer.to_string())),
                        ("error", v_str(&format!("{:#}", err))),
                    ]),
                );
            }
        });
    }
}
