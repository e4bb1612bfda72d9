mod state;
mod store;

pub use state::{ItemOutcome, ProcessingState};
pub use store::{FileStateStore, StateStore};
