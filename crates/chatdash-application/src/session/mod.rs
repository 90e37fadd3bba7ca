//! Chat session: one user/system round-trip at a time.

mod controller;
mod responder;

pub use controller::{ChatSession, SendOutcome, SessionState};
pub use responder::{Reply, ReplyAttachment, Responder, SimulatedResponder};
