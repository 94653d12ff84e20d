use std::net::SocketAddr;

use axum::{extract::Request, http::StatusCode, routing::get, Router};
use opentelemetry::{
    trace::{TraceContextExt, TracerProvider},
    KeyValue,
};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider, Resource};
use tower_request_span::trace::{request_context, Config, HttpLayer};
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    const PKG_NAME: &str = env!("CARGO_PKG_NAME");

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;
    let provider = SdkTracerProvider::builder()
        .with_resource(Resource::builder().with_service_name(PKG_NAME).build())
        .with_batch_exporter(exporter)
        .build();

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(Level::TRACE))
        .with(tracing_subscriber::fmt::layer().with_level(true))
        .init();

    // Query strings may carry tokens, keep them out of the span.
    let config = Config::default()
        .url_tag(|uri| uri.path().to_owned())
        .component_name("axum")?;

    let app = Router::new()
        .route("/api/v1/entities", get(entities))
        .route("/health", get(|| async { "OK" }))
        .route("/boom", get(boom))
        .layer(HttpLayer::with_config(provider.tracer(PKG_NAME), config));

    let listener = tokio::net::TcpListener::bind("[::1]:3000").await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    provider.shutdown()?;
    Ok(())
}

async fn entities(request: Request) -> &'static str {
    if let Some(cx) = request_context(&request) {
        cx.span()
            .set_attribute(KeyValue::new("entities.count", 0_i64));
    }
    "[]"
}

async fn boom() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}
