use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::utils::timing::TIMING_TARGET;

const LOGS_DIR: &str = "logs";

/// Keeps the non-blocking file writers flushing until `main` returns.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    let value = value.trim();
    if value.is_empty() {
        return LevelFilter::INFO;
    }
    if value.eq_ignore_ascii_case("warning") {
        return LevelFilter::WARN;
    }
    value.parse().unwrap_or(LevelFilter::INFO)
}

/// Service output: everything at `level` except request timing, with the
/// HTTP and SQL stacks held to warnings.
fn service_targets(level: LevelFilter) -> Targets {
    Targets::new()
        .with_default(level)
        .with_target(TIMING_TARGET, LevelFilter::OFF)
        .with_target("hyper", LevelFilter::WARN)
        .with_target("hyper_util", LevelFilter::WARN)
        .with_target("reqwest", LevelFilter::WARN)
        .with_target("teloxide_core", LevelFilter::WARN)
        .with_target("sqlx", LevelFilter::WARN)
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let appender = tracing_appender::rolling::daily(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    writer
}

/// Installs the global subscriber:
///
/// * stdout and `logs/topup.log`: human-readable service log,
/// * `logs/topup.jsonl`: the same events as JSON lines,
/// * `logs/timing.jsonl`: one JSON line per received/completed request.
pub fn init_logging(log_level: &str) -> LoggingGuards {
    let logs_dir = Path::new(LOGS_DIR);
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory: {err}");
    }

    let mut guards = Vec::with_capacity(3);
    let service_file = daily_writer(logs_dir, "topup.log", &mut guards);
    let service_json = daily_writer(logs_dir, "topup.jsonl", &mut guards);
    let timing_json = daily_writer(logs_dir, "timing.jsonl", &mut guards);

    let service = service_targets(parse_log_level(log_level));
    let layers = vec![
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_filter(service.clone())
            .boxed(),
        tracing_subscriber::fmt::layer()
            .with_writer(service_file)
            .with_ansi(false)
            .with_filter(service.clone())
            .boxed(),
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(service_json)
            .with_filter(service)
            .boxed(),
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(timing_json)
            .with_filter(timing_targets())
            .boxed(),
    ];

    tracing_subscriber::registry().with(layers).init();

    LoggingGuards { _guards: guards }
}
