//! Stream-facing utilities used by the source and sink stages:
//! - Bounded line reading
//! - Buffered verbatim output
//! - I/O buffer sizing

pub mod buffers;
pub mod output;
pub mod parsing;

pub use output::LineWriter;
pub use parsing::LineReader;
