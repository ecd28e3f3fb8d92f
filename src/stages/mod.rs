//! Stage bodies, one per thread.
//!
//! Each stage owns its [`RingSeat`](crate::handoff::RingSeat) and acts
//! only while holding a [`Permit`](crate::handoff::Permit). Returning
//! early with an error drops the seat, which cancels the other two.

pub mod relay;
pub mod sink;
pub mod source;

pub use relay::{run_relay, RelayReport};
pub use sink::{run_sink, SinkReport};
pub use source::{run_source, SourceReport};
