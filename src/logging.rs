// Logging setup.
// Installs a tracing subscriber that writes to stderr, leaving stdout to the renderer.

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or unparsable.
fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// `RUST_LOG` wins; `verbose` only raises the fallback.
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

/// Install the global subscriber.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "info");
    }
}
