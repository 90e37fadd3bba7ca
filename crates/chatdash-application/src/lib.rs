//! Application layer for chatdash.
//!
//! Wires the durable history, the attachment registry and the simulated
//! responder into a [`ChatSession`].

pub mod history;
pub mod session;

pub use history::HistoryStore;
pub use session::{
    ChatSession, Reply, ReplyAttachment, Responder, SendOutcome, SessionState, SimulatedResponder,
};
