use std::future::Future;
use std::net::SocketAddr;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::Error;
use crate::Result;


lazy_static! {
    pub static ref RECORDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("records_total", "Producer lines by decoded kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref PRODUCER_RESTARTS_TOTAL: IntCounter = IntCounter::new(
        "producer_restarts_total",
        "Producer exits or spawn failures that scheduled a restart"
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIBERS: IntGauge =
        IntGauge::new("subscribers", "Currently connected subscribers")
            .expect("metric can not be created");

    pub static ref DROPPED_DELIVERIES_TOTAL: IntCounter = IntCounter::new(
        "dropped_deliveries_total",
        "Frames skipped because a subscriber channel was full or closed"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("sidecast".to_string()), None)
            .expect("registry can be created");
        register_custom_metrics(&registry);
        registry
    };
}

fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(RECORDS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PRODUCER_RESTARTS_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(SUBSCRIBERS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DROPPED_DELIVERIES_TOTAL.clone()))
        .expect("collector can be registered");
}

/// Binds the `/metrics` exporter on `port` and serves until the shutdown signal fires.
///
/// Returns the bound address and the server future; a taken port is an [`Error::Bind`].
pub fn bind(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<(SocketAddr, impl Future<Output = ()>)> {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let (bound, server) = warp::serve(metrics_route)
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
        })
        .map_err(|e| Error::Bind(format!("metrics exporter {}: {}", addr, e)))?;

    info!("metrics exporter listening on {}/metrics", bound);
    Ok((bound, server))
}

async fn metrics_handler() -> std::result::Result<impl Reply, Rejection> {
    Ok(render(&REGISTRY))
}

/// Text exposition of every collector in `registry`.
pub(crate) fn render(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
