//! Log filter set-up for the binary.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn,sunlight3d=info";

/// Builds the filter from `RUST_LOG`-style directives. The user's
/// directives are taken as given; the default applies only without them.
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global `fmt` subscriber filtered by `RUST_LOG`.
pub fn init() {
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter_from(directives.as_deref()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_without_rust_log() {
        let filter = filter_from(None).to_string();
        assert!(filter.contains("sunlight3d=info"), "{filter}");
        assert!(filter.contains("warn"), "{filter}");
        assert_eq!(filter_from(Some("  ")).to_string(), filter);
    }

    #[test]
    fn test_rust_log_levels_are_kept() {
        let filter = filter_from(Some("sunlight3d=debug,trace")).to_string();
        assert!(filter.contains("sunlight3d=debug"), "{filter}");
        assert!(!filter.contains("sunlight3d=info"), "{filter}");
    }
}
