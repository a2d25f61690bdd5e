//! Command: print version information.

/// Version string baked in by `build.rs`, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("REPOVERLAY_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the repoverlay version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("repoverlay {}", version());
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_not_empty() {
        assert!(!super::version().is_empty());
    }
}
