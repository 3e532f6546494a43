//! HTTP surface of the skill request gate.
//!
//! Wires the validator into an axum router: configuration loading, the
//! `VerifiedRequest` extractor that runs every check before a handler sees
//! the payload, health probes, and server lifecycle.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod envelope;
pub mod extract;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::{Config, SkillApp};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use extract::{GateRejection, VerifiedRequest};
pub use server::{create_router, start_server, RequestId};
pub use state::GateState;
