//! Streaming access to large entity sets

pub mod iterator;
pub mod scanner;

pub use iterator::{EntitySetIterator, IteratorState};
