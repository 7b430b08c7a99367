//! `mfkit-core` keeps a micro-frontend child application in sync with its
//! shell through a shared, browser-resident key-value store, and bootstraps
//! the child's session from a credential handed over in the URL.
//!
//! The browser itself is abstracted behind the [`platform`] traits; hosts
//! implement them (or use [`platform::memory`] in tests) and hand them to a
//! [`ChildApp`].

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod error;
pub use error::*;

mod scope;
pub use scope::*;

mod app;
pub use app::ChildApp;

pub mod auth;

pub mod config;
pub use config::{Environment, GatePolicy, SyncConfig};

pub mod frame;

pub mod gate;

/// Bridge from the `log` facade to a host-provided logger.
pub mod logger;

pub mod platform;

pub mod routes;

pub mod store;

uniffi::setup_scaffolding!("mfkit_core");
