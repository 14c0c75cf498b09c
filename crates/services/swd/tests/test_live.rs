use std::error::Error;

use axum::http::StatusCode;
use common::{EVENT_TIMEOUT, TestContext};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use sw_models::{
    job::ScanMode,
    live::LiveEvent,
    output::{LineClass, OutputStream},
    phase::PhaseStatus,
};
use swd::api::setup_api;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

mod common;

/// Fake scanner: prints coloured output, creates its job folder and appends
/// to the event log, then fails with exit code 3.
const SCANNER: &str = r#"
domain="$2"
mode="$4"
dir="output/${domain}_20240501_120000_${mode}"
printf '\033[34m[*] Ejecutando recon\033[0m\n'
mkdir -p "$dir/logs"
sleep 0.3
echo '{"phase":"recon","message":"start","status":"running"}' >> "$dir/logs/events.jsonl"
echo "[+] found 3 subdomains"
sleep 0.3
printf '{"phase":"recon","message":"3 subdomains",' >> "$dir/logs/events.jsonl"
sleep 0.1
echo '"status":"done","count":3}' >> "$dir/logs/events.jsonl"
echo "[x] nuclei failed" >&2
echo '{"phase":"vulns","message":"nuclei","status":"error"}' >> "$dir/logs/events.jsonl"
exit 3
"#;

#[tokio::test]
async fn test_scan_lifecycle() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().with_scanner(SCANNER);
    let mut events = ctx.state.hub.subscribe();

    let (status, body) = ctx
        .post_json("/api/scan", r#"{"domain":"site.io","mode":"fast"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body)?;
    assert_eq!(ack["status"], "started");
    assert_eq!(ack["domain"], "site.io");
    assert_eq!(ack["mode"], "fast");
    assert!(ack.get("jobId").is_none());

    let mut received = Vec::new();
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv()).await??;
        let done = matches!(event, LiveEvent::Done { .. });
        received.push(event);
        if done {
            break;
        }
    }

    let job_id = "site.io_20240501_120000_fast";
    assert_eq!(
        received.first(),
        Some(&LiveEvent::Launched {
            domain: String::from("site.io"),
            mode: ScanMode::Fast,
        })
    );
    assert!(received.contains(&LiveEvent::Started {
        job_id: String::from(job_id),
        domain: String::from("site.io"),
        mode: ScanMode::Fast,
    }));
    assert_eq!(
        received.last(),
        Some(&LiveEvent::Done {
            job_id: Some(String::from(job_id)),
            exit_code: Some(3),
        })
    );

    let phases: Vec<_> = received
        .iter()
        .filter_map(|event| match event {
            LiveEvent::PhaseEvent(event) => Some(event),
            _ => None,
        })
        .collect();
    let statuses: Vec<_> = phases
        .iter()
        .map(|event| (event.record.phase.as_str(), event.record.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("recon", PhaseStatus::Running),
            ("recon", PhaseStatus::Done),
            ("vulns", PhaseStatus::Error),
        ]
    );
    assert!(phases.iter().all(|event| event.job_id == job_id));
    assert_eq!(phases[1].record.extra.get("count"), Some(&Value::from(3)));

    let lines: Vec<_> = received
        .iter()
        .filter_map(|event| match event {
            LiveEvent::Log(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].text, "[*] Ejecutando recon");
    assert_eq!(lines[0].class, LineClass::Info);
    let found = lines
        .iter()
        .find(|line| line.text.starts_with("[+]"))
        .expect("missing success line");
    assert_eq!(found.class, LineClass::Success);
    assert_eq!(found.job_id.as_deref(), Some(job_id));
    let failed = lines
        .iter()
        .find(|line| line.stream == OutputStream::Stderr)
        .expect("missing stderr line");
    assert_eq!(failed.class, LineClass::Error);

    let event = timeout(EVENT_TIMEOUT, events.recv()).await??;
    assert_eq!(event, LiveEvent::JobsUpdated);

    let (_, body) = ctx.get("/api/jobs/active").await;
    assert_eq!(body, "[]");

    let (_, body) = ctx.get(&format!("/api/scans/{job_id}/events")).await;
    let on_disk: Vec<Value> = serde_json::from_str(&body)?;
    assert_eq!(on_disk.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_active_job_listing() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().with_scanner(
        "mkdir -p \"output/${2}_20240501_120000_${4}\"\nsleep 30\n",
    );
    let mut events = ctx.state.hub.subscribe();

    let (status, _) = ctx.post_json("/api/scan", r#"{"domain":"slow.io"}"#).await;
    assert_eq!(status, StatusCode::OK);

    loop {
        if let LiveEvent::Started { .. } = timeout(EVENT_TIMEOUT, events.recv()).await?? {
            break;
        }
    }

    let (status, body) = ctx.get("/api/jobs/active").await;
    assert_eq!(status, StatusCode::OK);
    let active: Vec<Value> = serde_json::from_str(&body)?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["domain"], "slow.io");
    assert_eq!(active[0]["mode"], "standard");
    assert_eq!(active[0]["jobId"], "slow.io_20240501_120000_standard");
    assert!(active[0]["launchId"].is_string());

    // Correlated launches no longer block their domain.
    let (status, _) = ctx.post_json("/api/scan", r#"{"domain":"slow.io"}"#).await;
    assert_eq!(status, StatusCode::OK);

    ctx.state.coordinator.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_websocket() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new();
    let (address, _server) = setup_api(ctx.state.clone(), "127.0.0.1:0").await?;

    let (mut socket, _) = connect_async(format!("ws://{address}/ws")).await?;

    let next_event = |message: Message| -> Result<LiveEvent, Box<dyn Error>> {
        Ok(serde_json::from_str(message.to_text()?)?)
    };

    let greeting = timeout(EVENT_TIMEOUT, socket.next()).await?.ok_or("closed")??;
    assert_eq!(next_event(greeting)?, LiveEvent::JobsUpdated);

    socket
        .send(Message::Text(String::from(r#"{"event":"get_jobs"}"#).into()))
        .await?;
    let reply = timeout(EVENT_TIMEOUT, socket.next()).await?.ok_or("closed")??;
    assert_eq!(next_event(reply)?, LiveEvent::JobsUpdated);

    ctx.state.hub.publish(LiveEvent::Done {
        job_id: None,
        exit_code: Some(0),
    });
    let pushed = timeout(EVENT_TIMEOUT, socket.next()).await?.ok_or("closed")??;
    let raw: Value = serde_json::from_str(pushed.to_text()?)?;
    assert_eq!(raw["event"], "done");
    assert_eq!(raw["jobId"], Value::Null);
    assert_eq!(raw["exitCode"], 0);

    socket.close(None).await?;
    Ok(())
}
