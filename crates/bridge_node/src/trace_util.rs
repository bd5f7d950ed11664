use tracing::metadata::LevelFilter;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

// Crates we always keep at INFO regardless of operator-supplied directives.
const QUIET_LIBS: &[&str] = &["alloy_provider", "alloy_rpc_client", "alloy_transport_http", "hyper", "hyper_util", "reqwest"];

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

pub type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Initializes the global subscriber with a reloadable filter so SIGHUP can
/// swap the directives at runtime.
pub fn configure_tracing(filter: &str) -> ReloadHandle {
    let fmt_layer = fmt::layer()
        .with_target(false) // No module name.
        // Instead, file name and line number.
        .with_file(true)
        .with_line_number(true);

    let (filtered_layer, reload_handle) = reload::Layer::new(build_filter(filter));
    tracing_subscriber::registry().with(filtered_layer).with(fmt_layer).init();
    tracing::info!("Tracing has been successfully initialized.");

    reload_handle
}

pub fn reload_filter(handle: &ReloadHandle, filter: &str) {
    let new_filter = build_filter(filter);
    if handle.reload(new_filter).is_err() {
        warn!("Failed to reload the log filter; keeping the previous directives.");
    }
}

fn build_filter(filter: &str) -> EnvFilter {
    let base = EnvFilter::builder()
        .with_default_directive(DEFAULT_LEVEL.into())
        .parse(filter)
        .unwrap_or_else(|_| {
            eprintln!("Invalid log filter {filter:?}, falling back to {DEFAULT_LEVEL}.");
            EnvFilter::default().add_directive(DEFAULT_LEVEL.into())
        });
    QUIET_LIBS.iter().fold(base, |layer, lib| {
        layer.add_directive(format!("{lib}=info").parse().expect("directive is valid"))
    })
}
