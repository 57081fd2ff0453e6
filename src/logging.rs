//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the built-in filter when it is set. With the `otel`
//! feature, spans are also exported over OTLP to
//! `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4317`).

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[cfg(feature = "otel")]
    #[error("Failed to create OTLP exporter: {0}")]
    Exporter(#[from] opentelemetry::trace::TraceError),
}

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "qabase=debug" } else { "qabase=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

#[cfg(not(feature = "otel"))]
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

#[cfg(feature = "otel")]
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("qabase");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()?;

    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

/// Flush pending spans before exit
pub fn shutdown() {
    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();
}

/// Best-effort subscriber for tests; repeated calls are no-ops.
pub fn init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(filter(true))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
