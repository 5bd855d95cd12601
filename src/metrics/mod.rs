
use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
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

lazy_static! {
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Requests handled by the dispatcher"),
        &["service"]
    )
    .expect("metric can not be created");

    pub static ref REQUEST_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("request_errors_total", "Error responses sent, by code"),
        &["service", "code"]
    )
    .expect("metric can not be created");

    pub static ref REQUEST_DURATION_MS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_ms", "Request handling latency in ms")
            .buckets(exponential_buckets(0.5, 2.0, 14).expect("valid buckets")),
        &["service"]
    )
    .expect("metric can not be created");

    pub static ref COV_JOBS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cov_jobs_total", "Debounced notification jobs, by fate"),
        &["state"]
    )
    .expect("metric can not be created");

    pub static ref COV_DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cov_deliveries_total", "Per-subscriber notification outcomes"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIBERS_REMOVED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("subscribers_removed_total", "Subscriptions dropped by the coordinator"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref COV_SLOTS: IntGauge = IntGauge::new("cov_slots", "Live debounce slots")
        .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new_custom(Some("bacnode".to_string()), None)
        .expect("registry can be created");
}

pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(REQUEST_ERRORS_TOTAL.clone()),
        Box::new(REQUEST_DURATION_MS.clone()),
        Box::new(COV_JOBS_TOTAL.clone()),
        Box::new(COV_DELIVERIES_TOTAL.clone()),
        Box::new(SUBSCRIBERS_REMOVED_TOTAL.clone()),
        Box::new(COV_SLOTS.clone()),
    ];
    for collector in collectors {
        // AlreadyReg is fine when a test registry and the server share collectors
        if let Err(e) = registry.register(collector) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                error!("metric collector can not be registered: {:?}", e);
            }
        }
    }
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics")
        .map(|| REGISTRY.clone())
        .and_then(metrics_handler);

    info!(port, "metrics server listening");
    let (_, server) = warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
        let _ = shutdown_signal.changed().await;
    });
    server.await;
}

async fn metrics_handler(registry: Registry) -> Result<impl Reply, Rejection> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let body = String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    });
    Ok(body)
}
