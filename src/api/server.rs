//! HTTP server for the REST API
//!
//! One hyper connection task per client. Store access is serialized through
//! a mutex and runs on the blocking pool, since SQLite calls block.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::envelope::Envelope;
use super::router::{self, Reply};
use crate::storage::Database;

/// REST API server state
pub struct ApiServer {
    db: Arc<Mutex<Database>>,
    bind_addr: SocketAddr,
    allowed_origin: HeaderValue,
}

impl ApiServer {
    /// Creates a server answering CORS requests from `frontend_url`
    pub fn new(db: Database, bind_addr: SocketAddr, frontend_url: &str) -> Result<Self> {
        let allowed_origin = HeaderValue::from_str(frontend_url)
            .with_context(|| format!("Invalid frontend URL: {}", frontend_url))?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            bind_addr,
            allowed_origin,
        })
    }

    /// Runs until Ctrl-C
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_addr))?;
        info!(addr = %self.bind_addr, "API server listening");

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let server = Arc::clone(&self);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        debug!(method = %method, path = %path, "Incoming request");

        if method == Method::OPTIONS {
            return Ok(self.respond(StatusCode::NO_CONTENT, Bytes::new()));
        }

        let body = req.collect().await?.to_bytes();

        let db = Arc::clone(&self.db);
        let routed = {
            let method = method.clone();
            let path = path.clone();
            tokio::task::spawn_blocking(move || {
                // A poisoned lock only means an earlier request panicked;
                // its transaction was rolled back when it unwound
                let mut db = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                router::route(&mut db, &method, &path, query.as_deref(), &body)
            })
            .await
        };

        let reply = routed.unwrap_or_else(|err| {
            error!(method = %method, path = %path, error = %err, "Handler panicked");
            Reply {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: Envelope::err("Internal server error", "INTERNAL_ERROR").to_json(),
            }
        });

        info!(method = %method, path = %path, status = reply.status.as_u16(), "Handled request");

        Ok(self.respond(reply.status, Bytes::from(reply.body.to_string())))
    }

    fn respond(&self, status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
        let has_body = !body.is_empty();
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        if has_body {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ApiServer {
        let db = Database::open_in_memory().unwrap();
        ApiServer::new(db, "127.0.0.1:0".parse().unwrap(), "http://localhost:3000").unwrap()
    }

    #[test]
    fn responses_carry_cors_headers() {
        let response = server().respond(StatusCode::OK, Bytes::from_static(b"{}"));
        let headers = response.headers();

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn preflight_has_no_content_type() {
        let response = server().respond(StatusCode::NO_CONTENT, Bytes::new());

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn invalid_origin_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(ApiServer::new(db, "127.0.0.1:0".parse().unwrap(), "bad\norigin").is_err());
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let db = Database::open_in_memory().unwrap();
        let server = Arc::new(ApiServer::new(db, addr, "http://localhost:3000").unwrap());
        tokio::spawn(server.run());

        let mut stream = loop {
            match tokio::net::TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"GET /api/health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));
    }
}
