//! Integration tests for the Supervisor lifecycle

use heartbeat::{Config, Supervisor};
use std::time::Duration;

/// Config on ephemeral ports so tests can run in parallel
fn test_config(tick_interval: Duration) -> Config {
    Config {
        tick_interval,
        message: "Supervisor test".to_string(),
        metrics_port: "0".to_string(),
        health_port: "0".to_string(),
        config_file: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_counts_ticks_until_shutdown() {
    let supervisor = Supervisor::new(test_config(Duration::from_secs(1)));

    let summary = supervisor
        .run_until(tokio::time::sleep(Duration::from_millis(3500)))
        .await;

    assert_eq!(summary.messages, 3);
    assert!(summary.elapsed >= Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_handle_stops_supervisor() {
    let supervisor = Supervisor::new(test_config(Duration::from_secs(1)));
    let handle = supervisor.shutdown_handle();

    let task = tokio::spawn(supervisor.run_until(std::future::pending::<()>()));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    handle.cancel();
    // Double-triggering is harmless
    handle.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(6), task)
        .await
        .expect("supervisor should finish within the shutdown window")
        .unwrap();

    assert_eq!(summary.messages, 2);
}

#[tokio::test]
async fn test_all_tasks_finish_promptly_after_shutdown() {
    let supervisor = Supervisor::new(test_config(Duration::from_millis(50)));
    let handle = supervisor.shutdown_handle();

    let task = tokio::spawn(supervisor.run_until(std::future::pending::<()>()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let cancelled_at = std::time::Instant::now();
    handle.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(6), task)
        .await
        .expect("supervisor should finish within the shutdown window")
        .unwrap();

    // No in-flight requests, so nothing waits for the shutdown timeout
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    assert!(summary.messages >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_bind_failure_does_not_stop_the_process() {
    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();

    let mut config = test_config(Duration::from_secs(1));
    config.metrics_port = port.clone();
    config.health_port = port;

    let summary = Supervisor::new(config)
        .run_until(tokio::time::sleep(Duration::from_millis(2500)))
        .await;

    // Jobs keep running with both endpoints dead
    assert_eq!(summary.messages, 2);
}
