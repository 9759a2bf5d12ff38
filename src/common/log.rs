use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stagedock=info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
