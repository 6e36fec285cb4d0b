//! HTTP debug server implementation.

use crate::DebugState;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DebugServerError {
    #[error("Failed to bind to port {port}: {error}")]
    BindError { port: u16, error: String },
    #[error("Debug state lock poisoned")]
    StatePoisoned,
    #[error("Invalid response header")]
    InvalidHeader,
}

/// HTTP server for the debug API.
/// Runs on a background thread so the host loop never blocks on it.
pub struct DebugServer {
    port: u16,
    actual_port: Option<u16>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Serialize, Deserialize)]
struct Command {
    command: String,
}

#[derive(Serialize)]
struct CommandResponse {
    executed: bool,
    command: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: f64,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl DebugServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            actual_port: None,
            handle: None,
        }
    }

    pub fn start(&mut self, state: Arc<Mutex<DebugState>>) -> Result<(), DebugServerError> {
        let server = Server::http(format!("127.0.0.1:{}", self.port)).map_err(|e| {
            DebugServerError::BindError {
                port: self.port,
                error: e.to_string(),
            }
        })?;

        let actual_port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(self.port);
        self.actual_port = Some(actual_port);
        info!(port = actual_port, "debug API listening");

        let handle = thread::spawn(move || {
            Self::run_server(server, state);
        });

        self.handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        // tiny_http has no graceful shutdown; the thread ends with the process.
        if let Some(handle) = self.handle.take() {
            std::mem::forget(handle);
        }
    }

    pub fn actual_port(&self) -> u16 {
        self.actual_port.unwrap_or(self.port)
    }

    fn run_server(server: Server, state: Arc<Mutex<DebugState>>) {
        for request in server.incoming_requests() {
            if let Err(e) = Self::handle_request(request, &state) {
                warn!("debug server error: {e}");
            }
        }
    }

    fn lock(state: &Arc<Mutex<DebugState>>) -> Result<MutexGuard<'_, DebugState>, DebugServerError> {
        state.lock().map_err(|_| DebugServerError::StatePoisoned)
    }

    fn json<T: Serialize>(value: &T) -> Result<Response<Cursor<Vec<u8>>>, BoxError> {
        let json = serde_json::to_string(value)?;
        let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
            .map_err(|_| DebugServerError::InvalidHeader)?;
        Ok(Response::from_string(json).with_header(header))
    }

    fn not_found() -> Response<Cursor<Vec<u8>>> {
        Response::from_string("Not Found").with_status_code(404)
    }

    fn handle_request(mut request: Request, state: &Arc<Mutex<DebugState>>) -> Result<(), BoxError> {
        let response = match (request.method(), request.url()) {
            (&Method::Get, "/health") => {
                let debug_state = Self::lock(state)?;
                Self::json(&HealthResponse {
                    status: "ok".to_string(),
                    uptime_seconds: debug_state.uptime_seconds,
                })?
            }
            (&Method::Get, "/metrics") => {
                let debug_state = Self::lock(state)?;
                Self::json(&*debug_state)?
            }
            (&Method::Get, "/lod") => {
                let debug_state = Self::lock(state)?;
                match debug_state.debug_info.as_ref() {
                    Some(info) => Self::json(info)?,
                    None => Self::not_found(),
                }
            }
            (&Method::Post, "/command") => {
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body)?;
                let command: Command = serde_json::from_str(&body)?;

                let mut debug_state = Self::lock(state)?;
                let executed = match command.command.as_str() {
                    "clear_caches" => {
                        debug_state.clear_caches_requested = true;
                        true
                    }
                    "quit" => {
                        debug_state.quit_requested = true;
                        true
                    }
                    _ => false,
                };
                drop(debug_state);

                Self::json(&CommandResponse {
                    executed,
                    command: command.command,
                })?
            }
            _ => Self::not_found(),
        };

        request.respond(response)?;
        Ok(())
    }
}

impl Drop for DebugServer {
    fn drop(&mut self) {
        self.stop();
    }
}
