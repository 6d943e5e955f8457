//! Pull-based metrics exposition
//!
//! The poll loop pushes each reading into a [`MetricsSink`]. [`PrometheusExporter`]
//! keeps the latest value per gauge and serves them in the Prometheus text format:
//!
//! - `GET /metrics` - current gauges (all start at 0 until the first sample)
//! - `GET /health` - liveness check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::State, http::header, response::IntoResponse, routing::get};
use parking_lot::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::MetricKind;

pub trait MetricsSink: Send + Sync {
    fn set(&self, kind: MetricKind, value: f64);
}

struct GaugeSpec {
    kind: MetricKind,
    name: &'static str,
    help: &'static str,
}

const GAUGES: [GaugeSpec; 4] = [
    GaugeSpec {
        kind: MetricKind::Cpu,
        name: "custom_cpu_usage_percent",
        help: "CPU usage percentage",
    },
    GaugeSpec {
        kind: MetricKind::Memory,
        name: "custom_memory_usage_percent",
        help: "Memory usage percentage",
    },
    GaugeSpec {
        kind: MetricKind::Disk,
        name: "custom_disk_usage_percent",
        help: "Disk usage percentage",
    },
    GaugeSpec {
        kind: MetricKind::Latency,
        name: "custom_network_latency",
        help: "Network latency in ms",
    },
];

#[derive(Debug, Clone, Copy, Default)]
struct GaugeValues {
    cpu: f64,
    memory: f64,
    disk: f64,
    latency: f64,
}

impl GaugeValues {
    fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Disk => self.disk,
            MetricKind::Latency => self.latency,
        }
    }

    fn slot(&mut self, kind: MetricKind) -> &mut f64 {
        match kind {
            MetricKind::Cpu => &mut self.cpu,
            MetricKind::Memory => &mut self.memory,
            MetricKind::Disk => &mut self.disk,
            MetricKind::Latency => &mut self.latency,
        }
    }
}

/// Latest gauge values, shared between the poll loop and the HTTP endpoint.
#[derive(Debug, Clone, Default)]
pub struct PrometheusExporter {
    values: Arc<RwLock<GaugeValues>>,
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        self.values.read().get(kind)
    }

    /// Current gauges in Prometheus exposition format.
    pub fn render(&self) -> String {
        let values = *self.values.read();
        let mut output = String::new();

        for gauge in &GAUGES {
            output.push_str(&format!("# HELP {} {}\n", gauge.name, gauge.help));
            output.push_str(&format!("# TYPE {} gauge\n", gauge.name));
            output.push_str(&format!("{} {}\n", gauge.name, values.get(gauge.kind)));
        }

        output
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics))
            .route("/health", get(health))
            .with_state(self.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve the endpoint on a background task, returning the bound address.
    pub async fn spawn(&self, bind_addr: SocketAddr) -> anyhow::Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        let addr = listener.local_addr()?;
        let app = self.router();

        info!("metrics endpoint listening on {}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("metrics endpoint error: {}", e);
            }
        });

        Ok(addr)
    }
}

impl MetricsSink for PrometheusExporter {
    fn set(&self, kind: MetricKind, value: f64) {
        *self.values.write().slot(kind) = value;
    }
}

async fn metrics(State(exporter): State<PrometheusExporter>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        exporter.render(),
    )
}

async fn health() -> &'static str {
    "OK"
}
