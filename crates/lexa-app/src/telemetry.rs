use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Verbosity comes from `RUST_LOG`, defaulting to `info`. `json` switches the
/// output to one JSON object per line for log shipping.
pub fn init_tracing(json: bool) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| eyre::eyre!("failed to install tracing subscriber: {e}"))
}

/// Install `color-eyre` panic and error report hooks, then tracing.
pub fn init(json: bool) -> eyre::Result<()> {
    color_eyre::install()?;
    init_tracing(json)
}
