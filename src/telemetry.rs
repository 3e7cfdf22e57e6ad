//! Tracing subscriber setup.
//!
//! Chosen from the environment, first match wins:
//! - `PRGATE_LOG=<directive>` → human-readable events to stderr, filtered by
//!   the directive (e.g. `PRGATE_LOG=prgate=debug`)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT=stderr` → JSON spans/events to stderr
//! - `OTEL_EXPORTER_OTLP_ENDPOINT=http://...` → OTLP HTTP export of traces
//!   and logs (feature `otel`)
//! - otherwise nothing is installed
//!
//! Progress and reports always go to stdout independently of this.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const LOG_ENV: &str = "PRGATE_LOG";

/// Flushes and shuts down exporters on drop. Hold it in `main`.
pub struct TelemetryGuard {
    #[cfg(feature = "otel")]
    trace_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    #[cfg(feature = "otel")]
    log_provider: Option<opentelemetry_sdk::logs::SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otel")]
        {
            if let Some(provider) = self.trace_provider.take()
                && let Err(e) = provider.shutdown()
            {
                eprintln!("otel trace shutdown error: {e}");
            }
            if let Some(provider) = self.log_provider.take()
                && let Err(e) = provider.shutdown()
            {
                eprintln!("otel log shutdown error: {e}");
            }
        }
    }
}

/// Which subscriber the environment asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Mode {
    Off,
    Human(String),
    JsonStderr,
    Otlp,
}

fn mode(log: Option<&str>, endpoint: Option<&str>) -> Mode {
    match (log, endpoint) {
        (Some(directive), _) if !directive.is_empty() => Mode::Human(directive.to_owned()),
        (_, None | Some("")) => Mode::Off,
        (_, Some("stderr")) => Mode::JsonStderr,
        (_, Some(_)) => Mode::Otlp,
    }
}

/// Install the subscriber selected by the environment.
#[must_use]
pub fn init() -> TelemetryGuard {
    let log = std::env::var(LOG_ENV).ok();
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    match mode(log.as_deref(), endpoint.as_deref()) {
        Mode::Off => noop(),
        Mode::Human(directive) => init_human(&directive),
        Mode::JsonStderr => init_json_stderr(),
        #[cfg(feature = "otel")]
        Mode::Otlp => init_otlp(),
        #[cfg(not(feature = "otel"))]
        Mode::Otlp => {
            eprintln!(
                "warning: OTEL_EXPORTER_OTLP_ENDPOINT set but prgate built without 'otel' feature"
            );
            noop()
        }
    }
}

const fn noop() -> TelemetryGuard {
    TelemetryGuard {
        #[cfg(feature = "otel")]
        trace_provider: None,
        #[cfg(feature = "otel")]
        log_provider: None,
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_human(directive: &str) -> TelemetryGuard {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("warning: invalid {LOG_ENV} directive {directive:?}: {e}");
        EnvFilter::new("info")
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
    noop()
}

fn init_json_stderr() -> TelemetryGuard {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .init();
    noop()
}

/// OTLP over HTTP. The SDK reads the endpoint from the environment and
/// appends `/v1/traces` and `/v1/logs`.
#[cfg(feature = "otel")]
fn init_otlp() -> TelemetryGuard {
    use opentelemetry::trace::TracerProvider as _;

    let span_exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!("warning: failed to init OTLP span exporter: {e}");
            return noop();
        }
    };
    let log_exporter = match opentelemetry_otlp::LogExporter::builder()
        .with_http()
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!("warning: failed to init OTLP log exporter: {e}");
            return noop();
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_attribute(opentelemetry::KeyValue::new("service.name", env!("CARGO_PKG_NAME")))
        .with_attribute(opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    let trace_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_simple_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();
    let trace_layer =
        tracing_opentelemetry::layer().with_tracer(trace_provider.tracer(env!("CARGO_PKG_NAME")));

    let log_provider = opentelemetry_sdk::logs::SdkLoggerProvider::builder()
        .with_simple_exporter(log_exporter)
        .with_resource(resource)
        .build();
    let log_layer =
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&log_provider);

    tracing_subscriber::registry()
        .with(default_filter())
        .with(trace_layer)
        .with(log_layer)
        .init();

    TelemetryGuard {
        trace_provider: Some(trace_provider),
        log_provider: Some(log_provider),
    }
}
