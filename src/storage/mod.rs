//! Store implementations: in-memory and JSON file backed

pub mod memory;
pub mod persistent;
pub mod worker;

pub use memory::MemoryStore;
pub use persistent::{JsonFileStore, load_document, read_document};
pub use worker::{SaveStats, SaveWorker};
