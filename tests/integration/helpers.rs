//! In-memory collaborators for driving the poll loop in tests

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use host_monitoring::{
    MetricKind,
    alerts::AlertDispatcher,
    config::Config,
    exporter::MetricsSink,
    notify::{Ack, Notifier, NotifyError},
    poll::PollLoop,
    sources::MetricSource,
    util::HostIdentity,
};
use parking_lot::Mutex;

/// Values the fake source answers with; `None` means the read fails.
#[derive(Debug, Clone, Copy)]
pub struct Samples {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
    pub latency: Option<f64>,
}

impl Default for Samples {
    fn default() -> Self {
        Self {
            cpu: Some(10.0),
            memory: Some(20.0),
            disk: Some(30.0),
            latency: Some(15.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    pub samples: Arc<Mutex<Samples>>,
    pub pinged: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn set(&self, update: impl FnOnce(&mut Samples)) {
        update(&mut self.samples.lock());
    }
}

#[async_trait]
impl MetricSource for FakeSource {
    async fn read_cpu(&mut self) -> Option<f64> {
        self.samples.lock().cpu
    }

    async fn read_memory(&mut self) -> Option<f64> {
        self.samples.lock().memory
    }

    async fn read_disk(&mut self, _path: &Path) -> Option<f64> {
        self.samples.lock().disk
    }

    async fn ping(&mut self, host: &str) -> Option<f64> {
        self.pinged.lock().push(host.to_string());
        self.samples.lock().latency
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub updates: Arc<Mutex<Vec<(MetricKind, f64)>>>,
}

impl RecordingSink {
    pub fn count(&self, kind: MetricKind) -> usize {
        self.updates.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl MetricsSink for RecordingSink {
    fn set(&self, kind: MetricKind, value: f64) {
        self.updates.lock().push((kind, value));
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, NotifyError> {
        self.sent.lock().push((channel.to_string(), text.to_string()));
        if self.fail {
            Err(NotifyError::Status(500))
        } else {
            Ok(Ack {
                id: Some(format!("{}", self.count())),
            })
        }
    }
}

pub type TestLoop = PollLoop<FakeSource, RecordingSink, RecordingNotifier>;

pub fn test_identity() -> HostIdentity {
    HostIdentity::new("test-host", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)))
}

pub fn create_test_loop(notifier: RecordingNotifier) -> (TestLoop, FakeSource, RecordingSink) {
    let config = Config::default();
    let source = FakeSource::default();
    let sink = RecordingSink::default();
    let dispatcher = AlertDispatcher::from_config(&config, test_identity());

    let poll_loop = PollLoop::new(&config, dispatcher, source.clone(), sink.clone(), notifier);
    (poll_loop, source, sink)
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

/// Time of the `n`-th cycle at the default 15 second cadence
pub fn cycle(n: i64) -> DateTime<Utc> {
    start_time() + Duration::seconds(n * 15)
}
