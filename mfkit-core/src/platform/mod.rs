//! Platform abstraction traits for the synchronization layer.
//!
//! The layer never touches browser APIs directly. Everything it needs from
//! the page is expressed as a trait the host implements:
//!
//! - [`SharedStore`]: the shell's shared key-value store (`mf-shared/store`)
//! - [`SessionStorage`]: tab-scoped `sessionStorage`
//! - [`BrowserLocation`]: `window.location` and `history.replaceState`
//! - [`ParentFrame`]: `window.parent.postMessage`
//!
//! How the store module gets loaded (federated import, global, etc.) is the
//! host's concern; it hands ready components over through a
//! [`PlatformProvider`].

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::{PlatformError, PlatformResult};
pub use memory::MemoryPlatform;
pub use traits::{
    BrowserLocation, ParentFrame, PlatformProvider, SessionStorage, SharedStore,
    StoreListener, StoreSubscription,
};
pub use types::{StorageMedium, StoreInitOptions, StoreStrategy};
