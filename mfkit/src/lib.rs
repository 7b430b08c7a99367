//! `mfkit` is the distributable bundle of [`mfkit_core`]: hosts link this
//! crate (or its generated bindings) and get the whole child runtime.

pub use mfkit_core::*;

/// Version of the bundled runtime.
#[must_use]
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
