//! Interrupt handling.
//!
//! Kept in its own test binary: SIGTERM reaches every listener in the process,
//! so it must not share one with other lifecycle tests.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use vvproxy::config::{EngineConfig, ProxyConfig, ReadinessConfig};
use vvproxy::lifecycle::{self, ExitReason};

mod common;
use common::MockResponse;

fn write_engine_script(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("run.sh");
    std::fs::write(&path, "#!/bin/sh\necho $$ > pid.txt\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(proxy_port: u16, backend_port: u16, run_path: PathBuf, max_attempts: u32) -> ProxyConfig {
    let mut engine = EngineConfig::new("sleeper", proxy_port);
    engine.base_port = Some(backend_port);
    engine.run_path = Some(run_path);
    engine.force_restart = true;

    let mut config = ProxyConfig::default();
    config.listen_host = "127.0.0.1".to_string();
    config.readiness = ReadinessConfig {
        max_attempts,
        interval_ms: 20,
        probe_timeout_ms: 500,
    };
    config.engines.insert("sleeper".to_string(), engine);
    config
}

fn send_sigterm_to_self() {
    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

fn process_alive(pid_file: &Path) -> bool {
    let pid = std::fs::read_to_string(pid_file).unwrap();
    std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()
        .unwrap()
        .success()
}

async fn wait_for_file(path: &Path) {
    for _ in 0..100 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never appeared", path.display());
}

#[tokio::test]
async fn test_interrupt_stops_engine_and_exits_cleanly() {
    // While serving, with a request stuck at the backend.
    let (backend, _) = common::start_programmable_backend(|_method, target| async move {
        if target.starts_with("/synthesis") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        MockResponse::json(200, r#""1.0.0""#)
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let script = write_engine_script(dir.path());
    let proxy_port = common::closed_port();
    let serving = config(proxy_port, backend.port(), script, 50);

    let run = tokio::spawn(async move { lifecycle::run(&serving, "sleeper", &[]).await });

    let client = common::client();
    let mut up = false;
    for _ in 0..100 {
        if client
            .get(format!("http://127.0.0.1:{}/version", proxy_port))
            .send()
            .await
            .is_ok()
        {
            up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(up, "proxy never started");
    wait_for_file(&dir.path().join("pid.txt")).await;

    let in_flight = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .post(format!("http://127.0.0.1:{}/synthesis?speaker=1", proxy_port))
                .send()
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let start = Instant::now();
    send_sigterm_to_self();
    let reason = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("proxy kept running after interrupt")
        .unwrap()
        .unwrap();

    assert_eq!(reason, ExitReason::Interrupted);
    assert_eq!(reason.code(), 0);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(!process_alive(&dir.path().join("pid.txt")), "engine still running");
    in_flight.abort();

    // While still waiting for the engine to become ready.
    let dir = tempfile::tempdir().unwrap();
    let script = write_engine_script(dir.path());
    let waiting = config(common::closed_port(), common::closed_port(), script, 1_000);

    let run = tokio::spawn(async move { lifecycle::run(&waiting, "sleeper", &[]).await });
    wait_for_file(&dir.path().join("pid.txt")).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    send_sigterm_to_self();
    let reason = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("proxy kept waiting after interrupt")
        .unwrap()
        .unwrap();

    assert_eq!(reason, ExitReason::Interrupted);
    assert!(!process_alive(&dir.path().join("pid.txt")), "engine still running");
}
