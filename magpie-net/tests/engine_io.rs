//! Engine integration tests against a fake control port and local HTTP
//! servers. No proxy is configured, so requests go out directly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use magpie_net::{AnonEngine, EngineConfig, EngineError};

/// Minimal control port: answers authentication (accepting or rejecting
/// every password) and counts clean-circuit signals.
async fn control_port(reject_auth: bool) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let signals = Arc::new(AtomicUsize::new(0));
    let counter = signals.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut stream = BufReader::new(stream);
                let mut line = String::new();
                loop {
                    line.clear();
                    match stream.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    let reply: &[u8] = if line.starts_with("AUTHENTICATE") {
                        if reject_auth {
                            b"515 Authentication failed\r\n"
                        } else {
                            b"250 OK\r\n"
                        }
                    } else if line.starts_with("SIGNAL NEWNYM") {
                        counter.fetch_add(1, Ordering::SeqCst);
                        b"250 OK\r\n"
                    } else {
                        b"552 Unrecognized command\r\n"
                    };
                    if stream.write_all(reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (addr, signals)
}

/// Serves the canned bodies in order, repeating the last one forever.
async fn http_server(bodies: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            let body = bodies[served.min(bodies.len() - 1)];
            served += 1;
            tokio::spawn(respond(stream, body));
        }
    });

    addr
}

/// Closes the first `fail_first` connections before answering, then serves
/// 200s. Forces the engine's retry loop without touching the probe path.
async fn flaky_server(fail_first: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut accepted = 0usize;
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            accepted += 1;
            if accepted <= fail_first {
                drop(stream);
                continue;
            }
            tokio::spawn(respond(stream, "hello"));
        }
    });

    addr
}

async fn respond(mut stream: TcpStream, body: &str) {
    let mut buf = [0u8; 2048];
    let _ = stream.read(&mut buf).await;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn config(control_addr: SocketAddr, probe_addr: SocketAddr) -> EngineConfig {
    EngineConfig {
        control_addr: control_addr.to_string(),
        control_password: "hunter2".to_string(),
        proxy: None,
        probe_url: format!("http://{probe_addr}/"),
        timeout_secs: 5,
        give_up_after: None,
    }
}

#[tokio::test]
async fn test_connect_acquires_verified_identity() {
    let (control_addr, signals) = control_port(false).await;
    let probe_addr = http_server(vec![r#"{"ip": "10.0.0.1"}"#]).await;

    let engine = AnonEngine::connect(config(control_addr, probe_addr))
        .await
        .expect("connect");

    assert_eq!(engine.exit_ip(), Some("10.0.0.1"));
    assert_eq!(signals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connect_rotates_past_intercepting_exit() {
    let (control_addr, signals) = control_port(false).await;
    let probe_addr = http_server(vec![
        "<!DOCTYPE html><html><body>upstream error</body></html>",
        r#"{"ip": "7.7.7.7"}"#,
    ])
    .await;

    let engine = AnonEngine::connect(config(control_addr, probe_addr))
        .await
        .expect("connect");

    assert_eq!(engine.exit_ip(), Some("7.7.7.7"));
    assert_eq!(signals.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_auth_rejection_is_fatal() {
    let (control_addr, _) = control_port(true).await;
    let probe_addr = http_server(vec![r#"{"ip": "10.0.0.1"}"#]).await;

    let err = AnonEngine::connect(config(control_addr, probe_addr))
        .await
        .expect_err("auth should be rejected");

    assert!(matches!(err, EngineError::AuthRejected(_)));
}

#[tokio::test]
async fn test_retry_rotates_once_per_failure_then_succeeds() {
    let (control_addr, signals) = control_port(false).await;
    let probe_addr = http_server(vec![r#"{"ip": "10.0.0.1"}"#]).await;
    let target_addr = flaky_server(3).await;

    let mut engine = AnonEngine::connect(config(control_addr, probe_addr))
        .await
        .expect("connect");
    let rotations_before = signals.load(Ordering::SeqCst);

    let response = engine
        .get(&format!("http://{target_addr}/"))
        .await
        .expect("no deadline configured");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello");
    assert_eq!(signals.load(Ordering::SeqCst) - rotations_before, 3);
}

#[tokio::test]
async fn test_deadline_expiry_aborts() {
    let (control_addr, _) = control_port(false).await;
    let probe_addr = http_server(vec![r#"{"ip": "10.0.0.1"}"#]).await;
    let target_addr = flaky_server(usize::MAX).await;

    let mut config = config(control_addr, probe_addr);
    config.give_up_after = Some(Duration::from_millis(400));

    let mut engine = AnonEngine::connect(config).await.expect("connect");
    let err = engine
        .get(&format!("http://{target_addr}/"))
        .await
        .expect_err("target never answers");

    assert!(matches!(err, EngineError::Aborted));
}

#[tokio::test]
async fn test_post_carries_json_body() {
    let (control_addr, _) = control_port(false).await;
    let probe_addr = http_server(vec![r#"{"ip": "10.0.0.1"}"#]).await;
    let target_addr = http_server(vec!["ack"]).await;

    let mut engine = AnonEngine::connect(config(control_addr, probe_addr))
        .await
        .expect("connect");

    let response = engine
        .post(&format!("http://{target_addr}/"), &serde_json::json!({"k": 1}))
        .await
        .expect("no deadline configured");

    assert_eq!(response.status(), 200);
}
