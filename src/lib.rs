//! Bookstore application library
//!
//! The books module and the bootstrap that wires it to a store and the HTTP server.

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use modules::*;
