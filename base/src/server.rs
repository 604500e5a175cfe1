use std::sync::Arc;

use axum::http::{Response, StatusCode};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves Prometheus metrics on `/metrics`, on its own port, separate from
/// the public API surface (spec §0.3 / the teacher's dedicated metrics
/// server convention).
pub struct MetricsServer {
    listen_port: u16,
    registry: Registry,
}

impl MetricsServer {
    pub fn new(listen_port: u16, registry: Registry) -> Self {
        Self { listen_port, registry }
    }

    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        let port = self.listen_port;
        tracing::info!(port, "starting metrics server on 0.0.0.0");

        tokio::spawn(async move {
            let server = self.clone();
            let app = Router::new().route(
                "/metrics",
                get(move || {
                    let server = server.clone();
                    async move {
                        match server.gather() {
                            Ok(metrics) => Response::builder()
                                .header("Content-Type", "text/plain; charset=utf-8")
                                .body(metrics)
                                .unwrap(),
                            Err(_) => Response::builder()
                                .status(StatusCode::INTERNAL_SERVER_ERROR)
                                .body(b"failed to encode metrics".to_vec())
                                .unwrap(),
                        }
                    }
                }),
            );

            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            let listener = TcpListener::bind(addr).await.expect("failed to bind metrics server");
            axum::serve(listener, app.into_make_service())
                .await
                .expect("metrics server failed");
        })
    }

    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        let collected = self.registry.gather();
        let mut out = Vec::with_capacity(1024 * 16);
        prometheus::TextEncoder::new().encode(&collected, &mut out)?;
        Ok(out)
    }
}
