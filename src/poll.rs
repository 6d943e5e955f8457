//! PollLoop - the agent's single driving task
//!
//! ## Cycle
//!
//! ```text
//! tick → ping probe host → read CPU / memory / disk → push gauges → dispatch per kind
//!   ↑                                                                      │
//!   └──────────── ConditionTrackers + ThrottleState carried forward ───────┘
//! ```
//!
//! The loop owns all alert state and awaits every step in order, so nothing is
//! shared with other tasks and no locking is involved. A reading that cannot be
//! taken is skipped for both the gauge and the alert evaluation of that cycle.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, instrument, trace, warn};

use crate::alerts::{AlertDispatcher, DispatchOutcome};
use crate::config::Config;
use crate::exporter::MetricsSink;
use crate::monitors::{ConditionTrackers, ThrottleState};
use crate::notify::Notifier;
use crate::sources::MetricSource;
use crate::{MetricKind, MetricReading};

/// Everything one cycle observed and did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub readings: Vec<MetricReading>,
    pub outcomes: Vec<(MetricKind, DispatchOutcome)>,
}

impl CycleReport {
    pub fn reading(&self, kind: MetricKind) -> Option<&MetricReading> {
        self.readings.iter().find(|reading| reading.kind == kind)
    }

    pub fn outcome(&self, kind: MetricKind) -> Option<&DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }
}

pub struct PollLoop<S, K, N> {
    source: S,
    sink: K,
    notifier: N,
    dispatcher: AlertDispatcher,
    trackers: ConditionTrackers,
    throttle: ThrottleState,
    interval: Duration,
    disk_path: PathBuf,
    probe_host: String,
}

impl<S, K, N> PollLoop<S, K, N>
where
    S: MetricSource,
    K: MetricsSink,
    N: Notifier,
{
    pub fn new(
        config: &Config,
        dispatcher: AlertDispatcher,
        source: S,
        sink: K,
        notifier: N,
    ) -> Self {
        Self {
            source,
            sink,
            notifier,
            dispatcher,
            trackers: ConditionTrackers::default(),
            throttle: ThrottleState::default(),
            interval: config.interval(),
            disk_path: config.disk_path.clone(),
            probe_host: config.probe.host.clone(),
        }
    }

    pub fn trackers(&self) -> &ConditionTrackers {
        &self.trackers
    }

    pub fn throttle_state(&self) -> &ThrottleState {
        &self.throttle
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run cycles forever, one per interval measured between cycle starts.
    ///
    /// A cycle that overruns the interval delays the next one instead of causing a
    /// burst of catch-up cycles.
    pub async fn run(mut self) {
        debug!(
            "starting poll loop with interval {:?}, probing {}",
            self.interval, self.probe_host
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_cycle(Utc::now()).await;
        }
    }

    /// Sample, publish and evaluate once, stamping every reading with `now`.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        trace!("starting cycle");

        let latency = self.source.ping(&self.probe_host).await;
        if latency.is_none() {
            warn!("latency probe to {} failed, skipping latency", self.probe_host);
        }

        let cpu = self.source.read_cpu().await;
        let memory = self.source.read_memory().await;
        let disk = self.source.read_disk(&self.disk_path).await;

        let readings = [
            (MetricKind::Cpu, cpu),
            (MetricKind::Memory, memory),
            (MetricKind::Disk, disk),
            (MetricKind::Latency, latency),
        ]
        .into_iter()
        .filter_map(|(kind, value)| match value {
            Some(value) => Some(MetricReading::new(kind, value, now)),
            None => {
                trace!("no {kind:?} reading this cycle");
                None
            }
        })
        .collect::<Vec<_>>();

        for reading in &readings {
            trace!("{:?}: {}", reading.kind, reading.value);
            self.sink.set(reading.kind, reading.value);
        }

        let mut outcomes = Vec::with_capacity(readings.len());
        for reading in &readings {
            let outcome = self
                .dispatcher
                .evaluate_and_dispatch(
                    reading,
                    &mut self.trackers,
                    &mut self.throttle,
                    &self.notifier,
                )
                .await;
            outcomes.push((reading.kind, outcome));
        }

        CycleReport { readings, outcomes }
    }
}
