//! Prometheus metrics.
//!
//! Everything is registered on a registry owned by [`Metrics`] rather than the
//! process-global default one, so tests can build as many services as they
//! like without colliding on metric names.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Request latency buckets, in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.2, 0.3, 0.5, 1.0, 2.0, 5.0];

/// Methods recorded under their own label; anything else is `other`.
pub const KNOWN_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"];

/// Handlers that are served but never instrumented.
pub const EXCLUDED_HANDLERS: &[&str] = &["/metrics", "/health"];

/// Metrics registry for the service
pub struct Metrics {
    registry: Registry,
    pub http: HttpMetrics,
    pub queries: Arc<QueryMetrics>,
}

impl Metrics {
    /// Create every collector and register it on a fresh registry
    ///
    /// # Errors
    ///
    /// Returns `prometheus::Error` if a collector cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let http = HttpMetrics::register(&registry)?;
        let queries = Arc::new(QueryMetrics::register(&registry)?);
        Ok(Self {
            registry,
            http,
            queries,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    ///
    /// # Errors
    ///
    /// Returns `prometheus::Error` if encoding fails.
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// HTTP request collectors, labelled by route template rather than raw path
pub struct HttpMetrics {
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    in_progress: IntGaugeVec,
}

impl HttpMetrics {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of requests by method, status and handler.",
            ),
            &["method", "status", "handler"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Latency of requests by method and handler.",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "handler"],
        )?;
        let in_progress = IntGaugeVec::new(
            Opts::new(
                "http_requests_inprogress",
                "Number of HTTP requests in progress.",
            ),
            &["method", "handler"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(in_progress.clone()))?;

        Ok(Self {
            requests_total,
            request_duration,
            in_progress,
        })
    }

    /// Whether requests routed to `handler` are instrumented at all
    pub fn is_instrumented(handler: &str) -> bool {
        !EXCLUDED_HANDLERS.contains(&handler)
    }

    /// Mark a request as started; the returned guard must be finished with the status
    ///
    /// Methods outside [`KNOWN_METHODS`] are recorded as `other`.
    pub fn start(&self, method: &str, handler: &str) -> InFlight<'_> {
        let method = method_label(method);
        self.in_progress.with_label_values(&[method, handler]).inc();
        InFlight {
            metrics: self,
            method: method.to_string(),
            handler: handler.to_string(),
            finished: false,
        }
    }
}

/// A request currently counted in `http_requests_inprogress`
pub struct InFlight<'a> {
    metrics: &'a HttpMetrics,
    method: String,
    handler: String,
    finished: bool,
}

impl InFlight<'_> {
    pub fn finish(mut self, status: u16, elapsed: Duration) {
        let group = status_group(status);
        self.metrics
            .requests_total
            .with_label_values(&[self.method.as_str(), group, self.handler.as_str()])
            .inc();
        self.metrics
            .request_duration
            .with_label_values(&[self.method.as_str(), self.handler.as_str()])
            .observe(elapsed.as_secs_f64());
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics
            .in_progress
            .with_label_values(&[self.method.as_str(), self.handler.as_str()])
            .dec();
        if !self.finished {
            log::debug!("request to {} dropped before completion", self.handler);
        }
    }
}

/// Label value for a request method, bounded to [`KNOWN_METHODS`] plus `other`
pub fn method_label(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(method))
        .unwrap_or("other")
}

fn status_group(status: u16) -> &'static str {
    match status / 100 {
        1 => "1xx",
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        _ => "5xx",
    }
}

/// Database query collectors, shared by every pooled executor
pub struct QueryMetrics {
    queries_total: IntCounter,
    query_errors_total: IntCounter,
    query_duration: Histogram,
}

impl QueryMetrics {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let queries_total = IntCounter::new("db_queries_total", "Total queries executed")?;
        let query_errors_total =
            IntCounter::new("db_query_errors_total", "Total queries that returned an error")?;
        let query_duration = Histogram::with_opts(HistogramOpts::new(
            "db_query_duration_seconds",
            "Duration of queries",
        ))?;

        registry.register(Box::new(queries_total.clone()))?;
        registry.register(Box::new(query_errors_total.clone()))?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            queries_total,
            query_errors_total,
            query_duration,
        })
    }

    pub fn record_query(&self, elapsed: Duration, ok: bool) {
        self.queries_total.inc();
        if !ok {
            self.query_errors_total.inc();
        }
        self.query_duration.observe(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(metrics: &Metrics) -> String {
        String::from_utf8(metrics.render().unwrap()).unwrap()
    }

    #[test]
    fn test_request_is_counted_with_grouped_status() {
        let metrics = Metrics::new().unwrap();
        let in_flight = metrics.http.start("GET", "/tasks/{task_id}");
        in_flight.finish(404, Duration::from_millis(12));

        let text = rendered(&metrics);
        assert!(text.contains(
            r#"http_requests_total{handler="/tasks/{task_id}",method="GET",status="4xx"} 1"#
        ));
        assert!(text.contains(
            r#"http_requests_inprogress{handler="/tasks/{task_id}",method="GET"} 0"#
        ));
        assert!(text.contains("http_request_duration_seconds_bucket"));
    }

    #[test]
    fn test_in_progress_gauge_tracks_open_requests() {
        let metrics = Metrics::new().unwrap();
        let first = metrics.http.start("POST", "/tasks/");
        let _second = metrics.http.start("POST", "/tasks/");
        assert!(rendered(&metrics)
            .contains(r#"http_requests_inprogress{handler="/tasks/",method="POST"} 2"#));

        first.finish(201, Duration::from_millis(3));
        assert!(rendered(&metrics)
            .contains(r#"http_requests_inprogress{handler="/tasks/",method="POST"} 1"#));
    }

    #[test]
    fn test_method_label_is_bounded() {
        assert_eq!(method_label("GET"), "GET");
        assert_eq!(method_label("patch"), "PATCH");
        assert_eq!(method_label("FOO1"), "other");
        assert_eq!(method_label(""), "other");
    }

    #[test]
    fn test_excluded_handlers() {
        assert!(!HttpMetrics::is_instrumented("/metrics"));
        assert!(!HttpMetrics::is_instrumented("/health"));
        assert!(HttpMetrics::is_instrumented("/tasks/"));
    }

    #[test]
    fn test_query_metrics_count_errors() {
        let metrics = Metrics::new().unwrap();
        metrics.queries.record_query(Duration::from_millis(1), true);
        metrics.queries.record_query(Duration::from_millis(1), false);

        let text = rendered(&metrics);
        assert!(text.contains("db_queries_total 2"));
        assert!(text.contains("db_query_errors_total 1"));
    }

    #[test]
    fn test_two_registries_do_not_collide() {
        assert!(Metrics::new().is_ok());
        assert!(Metrics::new().is_ok());
    }
}
