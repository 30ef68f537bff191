//! Construcción del manejador de logging que el enrutador lleva consigo.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Variable de entorno que sustituye al nivel configurado.
pub const LOG_ENV: &str = "METASCOPE_LOG";

pub fn build_dispatch(default_level: &str) -> Dispatch {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_is_usable_without_global_default() {
        let dispatch = build_dispatch("warn");
        let enabled = tracing::dispatcher::with_default(&dispatch, || {
            tracing::enabled!(tracing::Level::ERROR)
        });
        assert!(enabled);
    }
}
