//! Mock gritd server for testing
//!
//! An in-process HTTP server that simulates the gritd points ledger, so
//! entry, draw, and reconciliation flows can be tested end to end without
//! a real deployment. Unlike a canned-response stub, the mock holds real
//! mutable balances behind a mutex: adjustments actually move points, and
//! tests can assert an account was charged exactly once.
//!
//! Implements the same routes the real API exposes:
//! - GET  /v1/accounts/{id}
//! - GET  /v1/credentials/{kind}/{value}/account
//! - POST /v1/accounts/{id}/adjustments
//! - POST /v1/credentials/link

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::Deserialize;

/// Configuration for failure injection
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Reject every request with 401
    pub fail_auth: bool,
    /// Report every adjustment as failed (the ledger stays unchanged)
    pub fail_adjustments: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

/// One applied adjustment, recorded for assertions
#[derive(Debug, Clone)]
pub struct RecordedAdjustment {
    pub account_ref: String,
    pub delta: i64,
    pub memo: String,
}

#[derive(Default)]
struct LedgerState {
    /// account_ref -> points
    balances: HashMap<String, i64>,
    /// (kind, value) -> account_ref
    credentials: HashMap<(String, String), String>,
    adjustments: Vec<RecordedAdjustment>,
    links: Vec<(String, String, String)>,
}

/// Mock gritd server for testing
pub struct MockGritdServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<LedgerState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockGritdServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let actual_port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let state_clone = state.clone();

        // Non-blocking accept loop so stop() can wind the thread down
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let st = state_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &st);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port: actual_port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Get the port the server is listening on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Create an account with a starting balance
    pub fn seed_account(&self, account_ref: &str, points: i64) {
        let mut state = self.state.lock().unwrap();
        state.balances.insert(account_ref.to_string(), points);
    }

    /// Register a credential as belonging to an account
    pub fn seed_credential(&self, kind: &str, value: &str, account_ref: &str) {
        let mut state = self.state.lock().unwrap();
        state.credentials.insert(
            (kind.to_string(), value.to_string()),
            account_ref.to_string(),
        );
    }

    /// Current balance, if the account exists
    pub fn balance_of(&self, account_ref: &str) -> Option<i64> {
        self.state.lock().unwrap().balances.get(account_ref).copied()
    }

    /// Every adjustment the ledger accepted, in order
    pub fn adjustments(&self) -> Vec<RecordedAdjustment> {
        self.state.lock().unwrap().adjustments.clone()
    }

    /// Count of accepted adjustments for one account
    pub fn adjustment_count_for(&self, account_ref: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .adjustments
            .iter()
            .filter(|a| a.account_ref == account_ref)
            .count()
    }

    /// Credential links the ledger received, as (kind, value, account_ref)
    pub fn links(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().links.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockGritdServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Deserialize)]
struct AdjustmentBody {
    delta: i64,
    #[serde(default)]
    memo: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkBody {
    kind: String,
    value: String,
    account_id: String,
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<LedgerState>) {
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = request.head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    }
    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or(parts[1]);

    if config.fail_auth || !request.head.to_lowercase().contains("x-api-key:") {
        send_response(&mut stream, 401, "Unauthorized", r#"{"error": "Invalid API key"}"#);
        return;
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        // GET /v1/accounts/{id}
        ("GET", ["v1", "accounts", id]) => {
            let state = state.lock().unwrap();
            match state.balances.get(*id) {
                Some(points) => {
                    let body = account_json(id, *points);
                    send_response(&mut stream, 200, "OK", &body);
                }
                None => send_not_found(&mut stream),
            }
        }
        // GET /v1/credentials/{kind}/{value}/account
        ("GET", ["v1", "credentials", kind, value, "account"]) => {
            let state = state.lock().unwrap();
            let account = state
                .credentials
                .get(&(kind.to_string(), value.to_string()))
                .cloned();
            match account {
                Some(id) => {
                    let points = state.balances.get(&id).copied().unwrap_or(0);
                    let body = account_json(&id, points);
                    send_response(&mut stream, 200, "OK", &body);
                }
                None => send_not_found(&mut stream),
            }
        }
        // POST /v1/accounts/{id}/adjustments
        ("POST", ["v1", "accounts", id, "adjustments"]) => {
            if config.fail_adjustments {
                send_response(
                    &mut stream,
                    200,
                    "OK",
                    r#"{"success": false, "error": "ledger temporarily unavailable"}"#,
                );
                return;
            }

            let body: AdjustmentBody = match serde_json::from_str(&request.body) {
                Ok(b) => b,
                Err(_) => {
                    send_response(&mut stream, 400, "Bad Request", r#"{"error": "Bad body"}"#);
                    return;
                }
            };

            let mut state = state.lock().unwrap();
            let Some(&current) = state.balances.get(*id) else {
                send_not_found(&mut stream);
                return;
            };

            let new_balance = current + body.delta;
            if new_balance < 0 {
                send_response(
                    &mut stream,
                    200,
                    "OK",
                    r#"{"success": false, "error": "insufficient balance"}"#,
                );
                return;
            }

            state.balances.insert(id.to_string(), new_balance);
            state.adjustments.push(RecordedAdjustment {
                account_ref: id.to_string(),
                delta: body.delta,
                memo: body.memo,
            });

            let body = format!(r#"{{"success": true, "newBalance": {}}}"#, new_balance);
            send_response(&mut stream, 200, "OK", &body);
        }
        // POST /v1/credentials/link
        ("POST", ["v1", "credentials", "link"]) => {
            let body: LinkBody = match serde_json::from_str(&request.body) {
                Ok(b) => b,
                Err(_) => {
                    send_response(&mut stream, 400, "Bad Request", r#"{"error": "Bad body"}"#);
                    return;
                }
            };

            let mut state = state.lock().unwrap();
            state
                .credentials
                .insert((body.kind.clone(), body.value.clone()), body.account_id.clone());
            state.links.push((body.kind, body.value, body.account_id));

            send_response(&mut stream, 200, "OK", r#"{"success": true}"#);
        }
        _ => send_response(
            &mut stream,
            404,
            "Not Found",
            r#"{"error": "Endpoint not found"}"#,
        ),
    }
}

struct RawRequest {
    head: String,
    body: String,
}

/// Read one HTTP request: headers, then as much body as Content-Length
/// promises. Good enough for small localhost test traffic.
fn read_request(stream: &mut TcpStream) -> Option<RawRequest> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        if let Some(split) = find_header_end(&data) {
            let head = String::from_utf8_lossy(&data[..split]).to_string();
            let content_length = head
                .lines()
                .find(|l| l.to_lowercase().starts_with("content-length:"))
                .and_then(|l| l.split(':').nth(1))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = split + 4;
            while data.len() < body_start + content_length {
                let n = stream.read(&mut buffer).ok()?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buffer[..n]);
            }

            let body = String::from_utf8_lossy(
                &data[body_start..(body_start + content_length).min(data.len())],
            )
            .to_string();
            return Some(RawRequest { head, body });
        }

        if data.len() > 64 * 1024 {
            break;
        }
    }

    None
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn account_json(id: &str, points: i64) -> String {
    format!(
        r#"{{"account": {{"id": "{}", "points": {}, "currencyRef": "grit"}}}}"#,
        id, points
    )
}

fn send_not_found(stream: &mut TcpStream) {
    send_response(stream, 404, "Not Found", r#"{"error": "Account not found"}"#);
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
