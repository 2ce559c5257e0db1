//! Version and build.

/// Return the program name, which can be overridden at build time with `PROGRAM_NAME`.
pub const fn name() -> &'static str {
    match option_env!("PROGRAM_NAME") {
        Some(s) => s,
        None => "geostamp",
    }
}

/// Return the program version.
pub const fn version() -> Option<&'static str> {
    option_env!("CARGO_PKG_VERSION")
}
