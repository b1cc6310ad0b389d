use std::any::Any;

use crate::core::document::Document;
use crate::core::errors::Result;

/// Trait defining the core operations of a document store
pub trait Store: Send {
    /// The current in-memory document
    fn document(&self) -> &Document;

    /// Mutable access to the in-memory document
    fn document_mut(&mut self) -> &mut Document;

    /// Schedule persistence of the current document
    fn save(&mut self) -> Result<()>;

    /// Write any pending state now and report the outcome
    fn flush(&mut self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
