//! Core data structures.

mod paper;

pub use paper::{find_by_id, PaperRecord};
