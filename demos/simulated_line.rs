//! # Example: simulated_line
//!
//! Runs a two-camera line against simulated cameras, an in-memory backend and
//! the logging gate actuator.
//!
//! ## Flow
//! ```text
//! camera-top     ──► pack 1: QR + barcodes     pack 2: nothing     pack 3: QR + barcodes
//! camera-bottom  ──► pack 1: nothing           pack 2: nothing     (decoder failure, retried)
//!
//! correlator (dual mode, result_timeout = 400ms)
//!   ├─► pack 1 → OutcomeGood → backend PUT × 2
//!   ├─► pack 2 → OutcomeBad  → gate open after 200ms, close 600ms later
//!   └─► pack 3 → OutcomeGood → backend PUT × 2
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=scanvisor=debug cargo run --example simulated_line
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use scanvisor::{
    Backend, BackoffPolicy, CodePair, CollaboratorError, Config, JitterPolicy, LogActuator,
    Outbox, RestartPolicy, ScannerFn, ScannerRef, Subscribe, Supervisor, WorkMode, WorkerError,
    WorkerSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Backend that answers from memory and prints what it receives.
struct InMemoryBackend;

#[async_trait]
impl Backend for InMemoryBackend {
    async fn work_mode(&self) -> Result<WorkMode, CollaboratorError> {
        Ok(WorkMode::Auto)
    }

    async fn expected_codes_count(&self) -> Result<usize, CollaboratorError> {
        Ok(2)
    }

    async fn send_codepair(&self, pair: &CodePair) -> Result<(), CollaboratorError> {
        info!(qr = %pair.qr, barcode = %pair.barcode, "backend received pair");
        Ok(())
    }
}

static BOTTOM_ATTEMPTS: AtomicU32 = AtomicU32::new(0);

async fn pause(ms: u64, ctx: &CancellationToken) -> Result<(), WorkerError> {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(()),
        _ = ctx.cancelled() => Err(WorkerError::Canceled),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Short timings so the demo finishes in a couple of seconds.
    let cfg = Config {
        result_timeout: Duration::from_millis(400),
        max_camera_skew: Duration::from_millis(150),
        shutter_before: Duration::from_millis(200),
        shutter_open: Duration::from_millis(600),
        poll_interval: Duration::from_millis(50),
        refresh_every: 20,
        grace: Duration::from_secs(2),
        restart: RestartPolicy::OnFailure,
        backoff: BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        },
        ..Config::default()
    };

    // 2. Top camera: reads packs 1 and 3, misses pack 2.
    let top: ScannerRef = ScannerFn::arc("camera-top", |out: Outbox, ctx: CancellationToken| async move {
        let now = SystemTime::now();
        out.observe(now, now, ["QR-0001", "QR-0002"], ["4600000000011", "4600000000028"])
            .await?;
        pause(700, &ctx).await?;

        let now = SystemTime::now();
        out.observe(now, now, Vec::<String>::new(), Vec::<String>::new()).await?;
        pause(700, &ctx).await?;

        let now = SystemTime::now();
        out.observe(now, now, ["QR-0003", "QR-0004"], ["4600000000035"]).await?;
        pause(1500, &ctx).await
    });

    // 3. Bottom camera: never reads codes, and its decoder crashes once.
    let bottom: ScannerRef = ScannerFn::arc("camera-bottom", |out: Outbox, ctx: CancellationToken| async move {
        let attempt = BOTTOM_ATTEMPTS.fetch_add(1, Ordering::Relaxed) + 1;
        let now = SystemTime::now();
        out.observe(now, now, Vec::<String>::new(), Vec::<String>::new()).await?;
        if attempt == 1 {
            pause(300, &ctx).await?;
            return Err(WorkerError::Fail {
                error: "decoder crashed".into(),
            });
        }
        pause(2000, &ctx).await
    });

    // 4. Supervisor with backend, logging gate and outcome log.
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(scanvisor::LogWriter)];
    let sup = Supervisor::builder(cfg.clone())
        .with_backend(Arc::new(InMemoryBackend))
        .with_actuator(Arc::new(LogActuator))
        .with_subscribers(subs)
        .build();

    // 5. Run until both cameras hang up (or Ctrl-C).
    sup.run(vec![
        WorkerSpec::with_defaults(top, &cfg),
        WorkerSpec::with_defaults(bottom, &cfg),
    ])
    .await?;

    println!("line stopped");
    Ok(())
}
