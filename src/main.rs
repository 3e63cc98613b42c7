//! `crowdwatch` binary: replays a CSV telemetry file and speaks a line protocol.
//!
//! stdout carries JSON lines (one per notification or response); logs go to
//! stderr. Control requests are read from stdin, either as words
//! (`START`, `SPEED 2`, `STATUS`, `STATS`) or as JSON (`{"action":"SPEED","value":4}`).
//! EOF on stdin or a termination signal shuts the engine down.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crowdwatch::{Config, ControlRequest, Engine, Event, Speed, Subscribe};

#[derive(Parser, Debug)]
#[command(name = "crowdwatch", version, about = "Replay crowd telemetry as a live alert feed")]
struct Args {
    /// CSV file with the recorded telemetry.
    #[arg(long, env = "CROWDWATCH_DATA")]
    data: Option<PathBuf>,

    /// Delay between records at 1x, in milliseconds.
    #[arg(long, env = "CROWDWATCH_BASE_INTERVAL_MS", default_value_t = 1000)]
    base_interval_ms: u64,

    /// Initial speed multiplier (1, 2 or 4).
    #[arg(long, env = "CROWDWATCH_SPEED", default_value = "1", value_parser = parse_speed)]
    speed: Speed,

    /// Start playback immediately.
    #[arg(long, env = "CROWDWATCH_AUTOSTART")]
    autostart: bool,

    /// Inbox size per subscriber.
    #[arg(long, env = "CROWDWATCH_QUEUE_CAPACITY", default_value_t = 1024)]
    queue_capacity: usize,

    /// Shutdown grace, in milliseconds.
    #[arg(long, env = "CROWDWATCH_GRACE_MS", default_value_t = 5000)]
    grace_ms: u64,
}

fn parse_speed(s: &str) -> Result<Speed, String> {
    let n: i64 = s.trim().parse().map_err(|_| format!("not a number: {s}"))?;
    Speed::try_from(n).map_err(|e| e.as_message())
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            base_interval: Duration::from_millis(self.base_interval_ms),
            speed: self.speed,
            autostart: self.autostart,
            queue_capacity: self.queue_capacity,
            grace: Duration::from_millis(self.grace_ms),
            data_path: self.data,
            ..Config::default()
        }
    }
}

/// Shared line writer; keeps notification and response lines whole.
#[derive(Clone)]
struct Output(Arc<Mutex<Stdout>>);

impl Output {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(tokio::io::stdout())))
    }

    async fn line(&self, v: &Value) {
        let mut buf = v.to_string();
        buf.push('\n');
        let mut out = self.0.lock().await;
        if let Err(e) = out.write_all(buf.as_bytes()).await {
            tracing::warn!(error = %e, "stdout write failed");
            return;
        }
        let _ = out.flush().await;
    }
}

/// Writes every notification to stdout as `{"channel": ..., "event": ...}`.
struct JsonFeed {
    out: Output,
}

#[async_trait]
impl Subscribe for JsonFeed {
    async fn on_event(&self, ev: &Event) {
        self.out
            .line(&json!({ "channel": ev.kind().channel(), "event": ev }))
            .await;
    }

    fn name(&self) -> &'static str {
        "json-feed"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}

/// Turns one input line into a request. Words form `ACTION [VALUE]`.
fn parse_line(line: &str) -> Result<ControlRequest> {
    if line.starts_with('{') {
        return serde_json::from_str(line).context("malformed JSON request");
    }
    let mut words = line.split_whitespace();
    let action = words.next().unwrap_or_default();
    let value = words.next().map(|v| Value::String(v.to_string()));
    Ok(ControlRequest::new(action, value))
}

async fn serve_stdin(engine: &Engine, out: &Output) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = match line.to_ascii_uppercase().as_str() {
            "STATUS" => json!({ "channel": "status", "status": engine.control().status() }),
            "STATS" => json!({ "channel": "stats", "stats": engine.control().stats() }),
            _ => match parse_line(line) {
                Ok(req) => json!({ "channel": "control", "response": engine.control().execute(&req).await }),
                Err(e) => json!({ "channel": "control", "response": { "status": "error", "message": format!("{e:#}") } }),
            },
        };
        out.line(&reply).await;
    }
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(env_filter)
        .init();
}

async fn run(cfg: Config) -> Result<()> {
    let out = Output::new();
    let feed: Arc<dyn Subscribe> = Arc::new(JsonFeed { out: out.clone() });
    let engine = Engine::builder(cfg).with_subscribers(vec![feed]).build();
    tracing::info!(records = engine.total(), "engine ready");

    tokio::select! {
        res = serve_stdin(&engine, &out) => {
            if let Err(e) = res {
                tracing::error!(error = %format!("{e:#}"), "control input failed");
            }
            tracing::info!("stdin closed");
            engine.shutdown().await?;
        }
        res = engine.run_until_signal() => res?,
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cfg = Args::parse().into_config();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let res = rt.block_on(run(cfg));
    // A pending stdin read lives on the blocking pool; don't wait on it.
    rt.shutdown_timeout(Duration::from_millis(200));
    res
}
