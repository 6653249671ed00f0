use anyhow::Context as _;

/// Default filter when `RUST_LOG` is unset. Dependency crates stay at `warn`.
const DEFAULT_FILTER: &str = "warn,skedcal=info";

/// Installs the stderr subscriber so stdout stays free for command output.
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
