//! Alert dispatch
//!
//! Decides, per reading, whether an alert condition holds, composes the message and
//! pushes it through the shared throttle to the notifier.
//!
//! CPU and memory go through the sustained-condition tracker (one alert per episode).
//! Disk and latency fire on every sample above threshold; only the throttle limits them.

use chrono::Duration;
use tracing::{debug, error, info, instrument};

use crate::config::{Config, Thresholds};
use crate::monitors::{AlertThrottle, ConditionTrackers, SustainedConditionTracker, ThrottleState};
use crate::notify::{Ack, Notifier};
use crate::util::HostIdentity;
use crate::{AlertPolicy, MetricKind, MetricReading};

/// What happened to a single reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No alert condition
    Quiet,

    /// Condition fired but the throttle window was still closed
    Throttled,

    /// Notification delivered
    Sent(Ack),

    /// Notification attempted and lost; the throttle token is still spent
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    identity: HostIdentity,
    channel: String,
    thresholds: Thresholds,
    tracker: SustainedConditionTracker,
    throttle: AlertThrottle,
}

impl AlertDispatcher {
    pub fn new(
        identity: HostIdentity,
        channel: impl Into<String>,
        thresholds: Thresholds,
        sustained: Duration,
        throttle_window: Duration,
    ) -> Self {
        Self {
            identity,
            channel: channel.into(),
            thresholds,
            tracker: SustainedConditionTracker::new(sustained),
            throttle: AlertThrottle::new(throttle_window),
        }
    }

    pub fn from_config(config: &Config, identity: HostIdentity) -> Self {
        Self::new(
            identity,
            config.alert.channel(),
            config.thresholds,
            config.sustained_duration(),
            config.throttle_window(),
        )
    }

    /// Human-readable alert text for `reading`.
    pub fn compose(&self, reading: &MetricReading) -> String {
        let HostIdentity { hostname, ip } = &self.identity;
        let subject = match reading.kind {
            MetricKind::Latency => format!("High {}", reading.kind),
            kind => format!("High {kind} usage"),
        };

        let mut message = format!(
            "{subject} detected: {:.1}{} on {hostname} ({ip})",
            reading.value,
            reading.kind.unit()
        );

        if reading.kind.policy() == AlertPolicy::Sustained {
            let minutes = self.tracker.duration().num_minutes();
            let unit = if minutes == 1 { "minute" } else { "minutes" };
            message.push_str(&format!(" for over {minutes} {unit}"));
        }

        message
    }

    fn condition_fires(&self, reading: &MetricReading, trackers: &mut ConditionTrackers) -> bool {
        let threshold = self.thresholds.for_kind(reading.kind);

        match reading.kind.policy() {
            AlertPolicy::Sustained => trackers.state_mut(reading.kind).is_some_and(|state| {
                self.tracker
                    .update(reading.value, threshold, reading.timestamp, state)
            }),
            AlertPolicy::Immediate => reading.value > threshold,
        }
    }

    /// Evaluate one reading and, if its condition fires, attempt a throttled send.
    ///
    /// Tracker and throttle updates are never rolled back: a failed send still marks
    /// the episode as alerted and still consumes the throttle window.
    #[instrument(skip(self, trackers, throttle_state, notifier), fields(kind = ?reading.kind))]
    pub async fn evaluate_and_dispatch<N>(
        &self,
        reading: &MetricReading,
        trackers: &mut ConditionTrackers,
        throttle_state: &mut ThrottleState,
        notifier: &N,
    ) -> DispatchOutcome
    where
        N: Notifier + ?Sized,
    {
        if !self.condition_fires(reading, trackers) {
            return DispatchOutcome::Quiet;
        }

        let message = self.compose(reading);
        info!("alert condition: {message}");

        if !self.throttle.try_consume(reading.timestamp, throttle_state) {
            debug!(
                "throttled, last notification at {:?}",
                throttle_state.last_sent
            );
            return DispatchOutcome::Throttled;
        }

        match notifier.send(&self.channel, &message).await {
            Ok(ack) => DispatchOutcome::Sent(ack),
            Err(e) => {
                error!("failed to send alert: {}", e);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}
