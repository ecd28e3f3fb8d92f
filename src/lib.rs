//! headerless: strip a sentinel-delimited header from text streams.
//!
//! Lines flow through three concurrently running stages that take turns
//! strictly in order:
//!
//! - **Source** reads Lines from the input and pushes them into a
//!   single-slot frame transport
//! - **Relay** drains the transport into a one-line shared buffer
//! - **Sink** drops everything up to and including the sentinel line
//!   (`end_header` by default) and writes the rest verbatim
//!
//! A ring of three hand-off permissions lets exactly one stage act at a
//! time, so output order always equals input order. End of input is
//! carried round the ring once more to shut every stage down.
//!
//! # Example
//!
//! ```rust,no_run
//! use headerless::commands::StripCommand;
//! use std::path::Path;
//!
//! let stats = StripCommand::new()
//!     .run(Some(Path::new("data.txt")), Some(Path::new("body.txt")))
//!     .unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod commands;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod handoff;
pub mod header;
pub mod line;
pub mod pipeline;
pub mod stages;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::{MatchMode, OverflowPolicy, PipelineConfig};
pub use endpoint::{Input, Output};
pub use error::{PipelineError, Result, TransportError};
pub use handoff::{HandoffRing, Permission, Stage};
pub use line::Line;
pub use pipeline::{Pipeline, PipelineStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::StripCommand;
    pub use crate::config::{MatchMode, OverflowPolicy, PipelineConfig};
    pub use crate::endpoint::{Input, Output};
    pub use crate::error::{PipelineError, Result};
    pub use crate::pipeline::{Pipeline, PipelineStats};
}
