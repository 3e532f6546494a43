//! HTTP request handlers.
//!
//! - `health` - liveness and health probes
//! - `skill` - skill endpoints behind the `VerifiedRequest` extractor
//!
//! Skill handlers only ever receive requests that passed the gate; refusals
//! are produced by the extractor with a generic body and a logged reason.

pub mod health;
pub mod skill;

pub use health::{health_check, liveness_check};
pub use skill::handle_skill_request;
