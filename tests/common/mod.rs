//! Common test utilities and helpers
//!
//! Shared test infrastructure: the in-process application client and
//! request payload fixtures.

pub mod test_app;

pub use fixtures::*;
pub use test_app::*;
