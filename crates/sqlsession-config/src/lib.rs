//! Configuration document parser for SQLSession Rust.
//!
//! Turns a JSON configuration document into a resolved
//! [`Configuration`](sqlsession_core::Configuration):
//!
//! 1. Document `properties` are merged with caller overrides (overrides win).
//! 2. `${name}` placeholders in settings, environment declarations and mapper
//!    locations are resolved against the merged variables.
//! 3. `settings` are validated by name and converted to typed values.
//! 4. One environment is selected, either the one requested by the caller or
//!    the document's `default`.
//!
//! Every phase records what it is doing in the thread's
//! [`ErrorContext`](sqlsession_core::ErrorContext), so a failure can say where
//! it happened.

mod document;
pub mod parser;

pub use parser::ConfigParser;
