use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use multirate::config::LimiterConfig;
use multirate::ratelimit::{Cancellation, Decision};

/// Push requests through a multi-window rate limiter.
#[derive(Debug, Parser)]
#[command(name = "multirate", version, about)]
struct Args {
    /// Path to the YAML limiter configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Access mode used for every request
    #[arg(short, long, value_enum, default_value_t = Mode::Wait)]
    mode: Mode,

    /// Window to pace against (required for `evenly`)
    #[arg(short, long)]
    window: Option<String>,

    /// Number of requests to issue
    #[arg(short = 'n', long, default_value_t = 10)]
    requests: u32,

    /// Give up waiting after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Probe without blocking
    Try,
    /// Block until every window has room
    Wait,
    /// Block for an evenly paced slot of one window
    Evenly,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let limiter = LimiterConfig::from_file(&args.config)?.build()?;

    let window = match (args.mode, args.window) {
        (Mode::Evenly, None) => anyhow::bail!("--window is required in evenly mode"),
        (_, window) => window.unwrap_or_default(),
    };

    let mut cancel = Cancellation::new();
    if let Some(timeout_ms) = args.timeout_ms {
        cancel = cancel.with_timeout(Duration::from_millis(timeout_ms));
    }

    let start = Instant::now();
    for request in 1..=args.requests {
        let outcome = match args.mode {
            Mode::Try => match limiter.try_acquire() {
                Decision::Allowed => Ok(true),
                Decision::Denied { retry_after } => {
                    info!(request, retry_after = ?retry_after, "Request denied");
                    Ok(false)
                }
            },
            Mode::Wait => limiter.wait(&cancel).await.map(|_| true),
            Mode::Evenly => limiter.wait_evenly(&cancel, &window).await.map(|_| true),
        };

        match outcome {
            Ok(true) => info!(request, elapsed = ?start.elapsed(), "Request granted"),
            Ok(false) => {}
            Err(e) if e.is_cancellation() => {
                warn!(request, error = %e, "Stopped waiting");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for status in limiter.status() {
        info!(
            window = %status.name,
            used = status.used,
            capacity = status.capacity,
            reset_after = ?status.reset_after,
            "Window status"
        );
    }

    Ok(())
}
