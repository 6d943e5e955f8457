//! End-to-end alerting behaviour of the poll loop

use assert_matches::assert_matches;
use chrono::Duration;
use host_monitoring::{MetricKind, alerts::DispatchOutcome};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_sustained_cpu_alerts_once_per_episode() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.cpu = Some(95.0));

    // 20 minutes above threshold without ever dropping
    for n in 0..=80 {
        poll_loop.run_cycle(cycle(n)).await;
    }

    assert_eq!(poll_loop.notifier().count(), 1);
    assert_eq!(
        poll_loop.notifier().messages()[0],
        "High CPU usage detected: 95.0% on test-host (192.168.1.10) for over 5 minutes"
    );
    assert!(poll_loop.trackers().cpu.alerted_for_this_episode);
}

#[tokio::test]
async fn test_first_alert_fires_after_window_not_at_it() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.cpu = Some(95.0));

    // cycle 20 is exactly 5 minutes after the episode started
    for n in 0..=20 {
        let report = poll_loop.run_cycle(cycle(n)).await;
        assert_eq!(report.outcome(MetricKind::Cpu), Some(&DispatchOutcome::Quiet));
    }

    let report = poll_loop.run_cycle(cycle(21)).await;
    assert_matches!(report.outcome(MetricKind::Cpu), Some(DispatchOutcome::Sent(_)));
}

#[tokio::test]
async fn test_cpu_rearms_after_dropping() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());

    source.set(|s| s.cpu = Some(95.0));
    for n in 0..=24 {
        poll_loop.run_cycle(cycle(n)).await;
    }
    assert_eq!(poll_loop.notifier().count(), 1);

    source.set(|s| s.cpu = Some(80.0));
    poll_loop.run_cycle(cycle(25)).await;
    assert_eq!(poll_loop.trackers().cpu.exceeding_since, None);
    assert!(!poll_loop.trackers().cpu.alerted_for_this_episode);

    source.set(|s| s.cpu = Some(92.0));
    for n in 26..=50 {
        poll_loop.run_cycle(cycle(n)).await;
    }

    assert_eq!(poll_loop.notifier().count(), 2);
}

#[tokio::test]
async fn test_episode_shorter_than_window_never_fires() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());

    source.set(|s| s.cpu = Some(95.0));
    poll_loop.run_cycle(start_time()).await;
    poll_loop
        .run_cycle(start_time() + Duration::seconds(4 * 60 + 59))
        .await;

    source.set(|s| s.cpu = Some(50.0));
    poll_loop.run_cycle(start_time() + Duration::seconds(300)).await;

    for n in 21..=40 {
        poll_loop.run_cycle(cycle(n)).await;
    }

    assert_eq!(poll_loop.notifier().count(), 0);
}

#[tokio::test]
async fn test_disk_fires_every_cycle_subject_to_throttle() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.disk = Some(85.0));

    let report = poll_loop.run_cycle(cycle(0)).await;
    assert_matches!(report.outcome(MetricKind::Disk), Some(DispatchOutcome::Sent(_)));

    // every following cycle is a fresh attempt, dropped by the throttle
    for n in 1..20 {
        let report = poll_loop.run_cycle(cycle(n)).await;
        assert_eq!(
            report.outcome(MetricKind::Disk),
            Some(&DispatchOutcome::Throttled)
        );
    }

    // cycle 20 is exactly one window later
    let report = poll_loop.run_cycle(cycle(20)).await;
    assert_matches!(report.outcome(MetricKind::Disk), Some(DispatchOutcome::Sent(_)));

    assert_eq!(
        poll_loop.notifier().messages(),
        vec![
            "High Disk usage detected: 85.0% on test-host (192.168.1.10)".to_string(),
            "High Disk usage detected: 85.0% on test-host (192.168.1.10)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_latency_above_threshold_fires_immediately() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.latency = Some(350.5));

    let report = poll_loop.run_cycle(cycle(0)).await;

    assert_matches!(
        report.outcome(MetricKind::Latency),
        Some(DispatchOutcome::Sent(_))
    );
    assert_eq!(
        poll_loop.notifier().messages(),
        vec!["High network latency detected: 350.5ms on test-host (192.168.1.10)".to_string()]
    );
}

#[tokio::test]
async fn test_cpu_and_memory_in_same_cycle_send_once() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| {
        s.cpu = Some(90.0);
        s.memory = Some(90.0);
    });

    for n in 0..=20 {
        poll_loop.run_cycle(cycle(n)).await;
    }
    let report = poll_loop.run_cycle(cycle(21)).await;

    assert_matches!(report.outcome(MetricKind::Cpu), Some(DispatchOutcome::Sent(_)));
    assert_eq!(
        report.outcome(MetricKind::Memory),
        Some(&DispatchOutcome::Throttled)
    );
    assert_eq!(poll_loop.notifier().count(), 1);

    // the dropped memory alert is not retried within its episode
    assert!(poll_loop.trackers().memory.alerted_for_this_episode);
    for n in 22..=60 {
        poll_loop.run_cycle(cycle(n)).await;
    }
    assert_eq!(poll_loop.notifier().count(), 1);
}

#[tokio::test]
async fn test_throttle_window_between_alerts() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());

    source.set(|s| s.disk = Some(90.0));
    poll_loop.run_cycle(start_time()).await;
    source.set(|s| s.disk = Some(50.0));
    poll_loop.run_cycle(start_time() + Duration::minutes(2)).await;
    source.set(|s| s.disk = Some(90.0));
    poll_loop.run_cycle(start_time() + Duration::minutes(4)).await;
    assert_eq!(poll_loop.notifier().count(), 1);

    poll_loop.run_cycle(start_time() + Duration::minutes(6)).await;
    assert_eq!(poll_loop.notifier().count(), 2);
}

#[tokio::test]
async fn test_failed_probe_skips_latency() {
    let (mut poll_loop, source, sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.latency = None);

    let report = poll_loop.run_cycle(cycle(0)).await;

    assert_eq!(sink.count(MetricKind::Latency), 0);
    assert_eq!(report.reading(MetricKind::Latency), None);
    assert_eq!(report.outcome(MetricKind::Latency), None);

    // the other kinds are still published and evaluated
    assert_eq!(sink.count(MetricKind::Cpu), 1);
    assert_eq!(sink.count(MetricKind::Memory), 1);
    assert_eq!(sink.count(MetricKind::Disk), 1);
    assert_eq!(report.outcomes.len(), 3);
}

#[tokio::test]
async fn test_failed_disk_read_does_not_suppress_other_kinds() {
    let (mut poll_loop, source, sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| {
        s.disk = None;
        s.latency = Some(500.0);
    });

    let report = poll_loop.run_cycle(cycle(0)).await;

    assert_eq!(sink.count(MetricKind::Disk), 0);
    assert_matches!(
        report.outcome(MetricKind::Latency),
        Some(DispatchOutcome::Sent(_))
    );
}

#[tokio::test]
async fn test_notifier_failure_does_not_stop_loop() {
    let (mut poll_loop, source, sink) = create_test_loop(RecordingNotifier::failing());
    source.set(|s| s.disk = Some(99.0));

    let report = poll_loop.run_cycle(cycle(0)).await;
    assert_matches!(
        report.outcome(MetricKind::Disk),
        Some(DispatchOutcome::Failed(_))
    );
    assert_eq!(poll_loop.throttle_state().last_sent, Some(cycle(0)));

    // no retry inside the window
    let report = poll_loop.run_cycle(cycle(1)).await;
    assert_eq!(
        report.outcome(MetricKind::Disk),
        Some(&DispatchOutcome::Throttled)
    );
    assert_eq!(poll_loop.notifier().count(), 1);
    assert_eq!(sink.count(MetricKind::Disk), 2);
}

#[tokio::test]
async fn test_cycle_publishes_all_gauges_and_probes_configured_host() {
    let (mut poll_loop, source, sink) = create_test_loop(RecordingNotifier::default());

    poll_loop.run_cycle(cycle(0)).await;

    assert_eq!(
        *sink.updates.lock(),
        vec![
            (MetricKind::Cpu, 10.0),
            (MetricKind::Memory, 20.0),
            (MetricKind::Disk, 30.0),
            (MetricKind::Latency, 15.0),
        ]
    );
    assert_eq!(*source.pinged.lock(), vec!["8.8.8.8".to_string()]);
    assert_eq!(poll_loop.notifier().count(), 0);
}

#[tokio::test]
async fn test_notifications_use_configured_channel() {
    let (mut poll_loop, source, _sink) = create_test_loop(RecordingNotifier::default());
    source.set(|s| s.disk = Some(95.0));

    poll_loop.run_cycle(cycle(0)).await;

    assert_eq!(poll_loop.notifier().sent.lock()[0].0, "#monitoring");
}
