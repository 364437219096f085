//! HTTP surface: remote-write endpoint and Prometheus telemetry

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

use contracts::ServerConfig;
use dispatcher::Dispatcher;
use observability::MetricsHandle;

use crate::decode::decode_write_request;
use crate::error::{IngestionError, Result};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    metrics: Option<MetricsHandle>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, metrics: Option<MetricsHandle>) -> Self {
        Self {
            dispatcher,
            metrics,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

/// Build the router for `config`
///
/// The telemetry route is only mounted when a metrics handle is present.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new().route(
        &config.write_path,
        post(remote_write).route_layer(DefaultBodyLimit::max(config.max_body_bytes)),
    );

    if state.metrics.is_some() {
        router = router.route(&config.telemetry_path, get(render_metrics));
    }

    router.with_state(state)
}

async fn remote_write(State(state): State<AppState>, body: Bytes) -> Response {
    let samples = match decode_write_request(&body) {
        Ok(samples) => samples,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Rejected write request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let summary = state.dispatcher.dispatch(samples).await;
    debug!(
        received = summary.received,
        delivered = summary.delivered,
        failed_sinks = summary.failed_sinks(),
        "Write request handled"
    );

    StatusCode::NO_CONTENT.into_response()
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Expand the `:port` shorthand to all interfaces
pub fn normalize_listen_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() || address == ":" {
        return Err(IngestionError::InvalidAddress {
            address: address.to_string(),
        });
    }
    if address.starts_with(':') {
        Ok(format!("0.0.0.0{address}"))
    } else {
        Ok(address.to_string())
    }
}

/// Bind the listener named by `config.listen_address`
#[instrument(name = "ingestion_bind", skip(config), fields(address = %config.listen_address))]
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let address = normalize_listen_address(&config.listen_address)?;
    let listener = TcpListener::bind(address.as_str()).await?;
    Ok(listener)
}

/// Serve `app` until `shutdown` resolves; in-flight requests are drained
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(address = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use dispatcher::{MemorySink, SinkHandle};
    use filter::RuleSet;
    use tower::ServiceExt;

    use crate::decode::encode_write_request;
    use crate::proto::{Label, Sample, TimeSeries, WriteRequest};

    fn state(sink: &MemorySink) -> AppState {
        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::empty()),
            vec![SinkHandle::new(sink.clone(), Duration::from_secs(1))],
        );
        AppState::new(Arc::new(dispatcher), None)
    }

    fn body() -> Vec<u8> {
        encode_write_request(&WriteRequest {
            timeseries: vec![TimeSeries {
                labels: vec![Label {
                    name: "__name__".into(),
                    value: "up".into(),
                }],
                samples: vec![Sample {
                    value: 1.0,
                    timestamp: 1,
                }],
            }],
        })
        .unwrap()
    }

    fn post_write(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/write")
            .header(header::CONTENT_ENCODING, "snappy")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_accepted() {
        let sink = MemorySink::new("mem");
        let app = router(state(&sink), &ServerConfig::default());

        let response = app.oneshot(post_write(body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(sink.sample_count(), 1);
    }

    #[tokio::test]
    async fn test_write_bad_body() {
        let sink = MemorySink::new("mem");
        let app = router(state(&sink), &ServerConfig::default());

        let response = app
            .oneshot(post_write(b"not snappy at all".to_vec()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(sink.deliveries(), 0);
    }

    #[tokio::test]
    async fn test_write_body_limit() {
        let sink = MemorySink::new("mem");
        let config = ServerConfig {
            max_body_bytes: 8,
            ..ServerConfig::default()
        };
        let app = router(state(&sink), &config);

        let response = app.oneshot(post_write(vec![0; 64])).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_telemetry_not_mounted_without_handle() {
        let sink = MemorySink::new("mem");
        let app = router(state(&sink), &ServerConfig::default());

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_normalize_listen_address() {
        assert_eq!(normalize_listen_address(":24282").unwrap(), "0.0.0.0:24282");
        assert_eq!(
            normalize_listen_address("127.0.0.1:9000").unwrap(),
            "127.0.0.1:9000"
        );
        assert!(normalize_listen_address("").is_err());
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let config = ServerConfig {
            listen_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let listener = bind(&config).await.unwrap();
        let sink = MemorySink::new("mem");
        let app = router(state(&sink), &config);

        serve(listener, app, async {}).await.unwrap();
    }
}
