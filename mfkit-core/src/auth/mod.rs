//! Authentication bootstrap: URL credential handshake, session records,
//! identity hydration and permission checks.

mod credential;
mod handshake;
mod identity;
mod permissions;
mod session;

pub use credential::{strip_credential, Credential, TOKEN_PARAM};
pub use handshake::{CredentialOutcome, Handshake, HandshakeOutcome, Verification};
pub use identity::{IdentityRecord, IdentityTable};
pub use permissions::Permissions;
pub use session::{login_url, SessionAuth, AUTH_TOKEN_KEY, PERMISSIONS_DATA_KEY, USER_DATA_KEY};
