use opentelemetry::{
    KeyValue,
    trace::{Tracer, TracerProvider},
};
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{Sampler, SdkTracerProvider, span_processor_with_async_runtime::BatchSpanProcessor},
};
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
use tracing::{Level, Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    Layer, filter::FilterFn, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};
use wasmgate::TRACE_TARGET_GUEST;

const SERVICE: &str = "wasmgate-server";

/// Installs the global subscriber.
///
/// Logs are formatted to stderr and filtered by `RUST_LOG`. Invocation spans
/// are also exported over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set;
/// `OTEL_EXPORTER_OTLP_PROTOCOL=grpc` selects gRPC, anything else HTTP.
pub fn init_tracing() -> anyhow::Result<ProviderGuard> {
    let envfilter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env()?;
    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::Layer::default().with_filter(envfilter));

    let provider = otlp_provider()?;
    match &provider {
        Some(provider) => registry.with(span_layer(provider.tracer(SERVICE))).init(),
        None => registry.init(),
    }
    Ok(ProviderGuard(provider))
}

fn otlp_provider() -> anyhow::Result<Option<SdkTracerProvider>> {
    if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_none() {
        return Ok(None);
    }

    let exporter = match std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
        Ok("grpc") => SpanExporter::builder()
            .with_tonic()
            .with_protocol(Protocol::Grpc)
            .build()?,
        _ => SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .build()?,
    };

    Ok(Some(
        SdkTracerProvider::builder()
            .with_span_processor(BatchSpanProcessor::builder(exporter, runtime::Tokio).build())
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(
                Resource::builder()
                    .with_attribute(KeyValue::new(SERVICE_NAME, SERVICE))
                    .build(),
            )
            .build(),
    ))
}

/// Exports only invocation spans and guest events.
fn span_layer<S, T>(tracer: T) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    T: Tracer + 'static,
    T::Span: Send + Sync,
{
    tracing_opentelemetry::OpenTelemetryLayer::new(tracer)
        .with_location(false)
        .with_threads(false)
        .with_filter(FilterFn::new(|metadata| {
            *metadata.level() <= LevelFilter::INFO && metadata.target() == TRACE_TARGET_GUEST
        }))
}

/// Flushes pending spans on drop.
pub struct ProviderGuard(Option<SdkTracerProvider>);

impl Drop for ProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            let _ = provider.shutdown();
        }
    }
}
