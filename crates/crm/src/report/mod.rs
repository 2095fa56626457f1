//! Run artifacts
//!
//! [`ResultSink`] is where the sync engine sends its outcome log. The file
//! implementation writes the JSON audit and the annotated CSV; the in-memory
//! one backs the tests.

mod file;
mod memory;
mod traits;

pub use file::{CSV_PREFIX, FileSink, JSON_PREFIX, RowStatus};
pub use memory::InMemorySink;
pub use traits::ResultSink;
