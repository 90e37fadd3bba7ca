//! Chat history persistence.
//!
//! - `store`: the ordered message sequence, restore and clear (`HistoryStore`)
//! - `writer`: the background task that applies snapshots to storage

mod store;
mod writer;

pub use store::HistoryStore;
