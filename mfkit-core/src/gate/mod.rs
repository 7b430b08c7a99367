//! Authorization gate.
//!
//! The shared store may not have caught up with the handshake (or the shell)
//! when a protected view first renders, so the gate polls a few channels for
//! a credential before sending the user to the login page.
//!
//! The decision logic is the pure [`transition`] function; the
//! [`AuthorizationGate`] only supplies timers and probes.

mod driver;
mod machine;
mod probe;

pub use driver::{AuthorizationGate, GateHandle, GateReport};
pub use machine::{transition, GateEffect, GateEvent, GateState};
pub use probe::{CredentialProbe, ProbeResult, TokenChannel, TokenProbe};
