//! Sustained-threshold tracking
//!
//! Turns "above threshold right now" into "above threshold continuously for longer
//! than the sustained window", signalling exactly once per episode:
//!
//! ```text
//! value <= threshold:
//!   no episode running          → ConditionEvaluation::Ok
//!   episode running             → ConditionEvaluation::BackToOk (state reset, re-armed)
//!
//! value > threshold:
//!   no episode running          → ConditionEvaluation::StartsToExceed (episode starts at `now`)
//!   running for <= window       → ConditionEvaluation::Exceeding
//!   running for > window        → ConditionEvaluation::Sustained (fires, once)
//!   already alerted             → ConditionEvaluation::Exceeding
//! ```

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::MetricKind;

/// Episode bookkeeping for one metric kind.
///
/// `alerted_for_this_episode` is only ever set while `exceeding_since` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionState {
    pub exceeding_since: Option<DateTime<Utc>>,
    pub alerted_for_this_episode: bool,
}

impl ConditionState {
    fn reset(&mut self) {
        self.exceeding_since = None;
        self.alerted_for_this_episode = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionEvaluation {
    Ok,
    BackToOk,
    StartsToExceed,
    Exceeding,
    Sustained,
}

#[derive(Debug, Clone, Copy)]
pub struct SustainedConditionTracker {
    duration: Duration,
}

impl SustainedConditionTracker {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn evaluate(
        &self,
        value: f64,
        threshold: f64,
        now: DateTime<Utc>,
        state: &mut ConditionState,
    ) -> ConditionEvaluation {
        if value <= threshold {
            let was_exceeding = state.exceeding_since.is_some();
            state.reset();
            return if was_exceeding {
                ConditionEvaluation::BackToOk
            } else {
                ConditionEvaluation::Ok
            };
        }

        let Some(since) = state.exceeding_since else {
            state.exceeding_since = Some(now);
            return ConditionEvaluation::StartsToExceed;
        };

        if now - since > self.duration && !state.alerted_for_this_episode {
            state.alerted_for_this_episode = true;
            return ConditionEvaluation::Sustained;
        }

        ConditionEvaluation::Exceeding
    }

    /// Feed one sample; returns `true` exactly once per episode.
    pub fn update(
        &self,
        value: f64,
        threshold: f64,
        now: DateTime<Utc>,
        state: &mut ConditionState,
    ) -> bool {
        let evaluation = self.evaluate(value, threshold, now, state);
        trace!("{value} (max: {threshold}) -> {evaluation:?}");
        evaluation == ConditionEvaluation::Sustained
    }
}

/// One [`ConditionState`] per kind that uses sustained semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionTrackers {
    pub cpu: ConditionState,
    pub memory: ConditionState,
}

impl ConditionTrackers {
    /// `None` for immediate-fire kinds, which keep no episode state.
    pub fn state_mut(&mut self, kind: MetricKind) -> Option<&mut ConditionState> {
        match kind {
            MetricKind::Cpu => Some(&mut self.cpu),
            MetricKind::Memory => Some(&mut self.memory),
            MetricKind::Disk | MetricKind::Latency => None,
        }
    }

    pub fn state(&self, kind: MetricKind) -> Option<&ConditionState> {
        match kind {
            MetricKind::Cpu => Some(&self.cpu),
            MetricKind::Memory => Some(&self.memory),
            MetricKind::Disk | MetricKind::Latency => None,
        }
    }
}
