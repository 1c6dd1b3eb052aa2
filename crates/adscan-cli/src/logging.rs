//! Tracing setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
#[must_use]
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,adscan_ldap=debug,adscan_cli=debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Log lines go to stderr so they never mix
/// with report output.
pub fn init_logging(verbose: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(verbose).into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(default_directive(false), "warn");
        assert!(default_directive(true).contains("adscan_ldap=debug"));
    }
}
