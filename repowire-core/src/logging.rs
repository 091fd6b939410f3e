use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,repowire=debug";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info,repowire=debug` when `RUST_LOG` is unset or invalid.
/// Calling this more than once is harmless: later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Install a `fmt` subscriber with an explicit filter directive
/// (e.g. `"repowire_data=trace"`), ignoring `RUST_LOG`.
pub fn init_tracing_with(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid tracing directives `{directives}`: {err}; using `{DEFAULT_FILTER}`");
        EnvFilter::new(DEFAULT_FILTER)
    });
    install(filter);
}

fn install(filter: EnvFilter) {
    // A global subscriber may already be set (tests, host application).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
