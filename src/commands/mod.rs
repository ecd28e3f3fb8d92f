//! Command implementations for headerless.

pub mod strip;

pub use strip::StripCommand;
