pub mod value;
pub mod errors;
pub mod table;
pub mod document;
pub mod store;

pub use value::Value;
pub use table::Table;
pub use document::{Document, Record, now_iso};
pub use store::Store;
pub use errors::{Result, StoreError};
