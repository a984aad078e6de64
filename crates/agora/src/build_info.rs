//! Build metadata.

/// Crate version, as reported by `agora --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
