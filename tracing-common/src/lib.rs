use std::{collections::HashMap, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

const DEFAULT_FILTER: &str = "warn,server=trace,pantry=debug,db=debug,tower_http=debug";

/// Parses `key=value,key=value` as used by `OTEL_EXPORTER_OTLP_HEADERS`.
fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

pub fn setup_tracing() -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into());

    let env_filter = EnvFilter::builder()
        .parse(&rust_log)
        .wrap_err_with(|| format!("Couldn't create env filter from {rust_log}"))?;

    let opentelemetry_layer = if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
            .map(|raw| parse_headers(&raw))
            .unwrap_or_default();

        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .http()
                    .with_endpoint(endpoint)
                    .with_timeout(Duration::from_secs(3))
                    .with_headers(headers),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .wrap_err("Couldn't install the OTLP exporter")?;

        println!("OTLP layer configured");

        Some(OpenTelemetryLayer::new(tracer))
    } else {
        println!("Skipping OTLP layer");

        None
    };

    let heirarchical = HierarchicalLayer::default()
        .with_writer(std::io::stdout)
        .with_indent_lines(true)
        .with_indent_amount(2)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_verbose_exit(true)
        .with_verbose_entry(true)
        .with_targets(true);

    Registry::default()
        .with(heirarchical)
        .with(opentelemetry_layer)
        .with(env_filter)
        .try_init()
        .wrap_err("Couldn't install the tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        EnvFilter::builder().parse(DEFAULT_FILTER).unwrap();
    }

    #[test]
    fn headers_are_split_on_commas_and_equals() {
        let headers = parse_headers("x-team=abc, x-dataset = pantry,broken");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-team"], "abc");
        assert_eq!(headers["x-dataset"], "pantry");
    }
}
