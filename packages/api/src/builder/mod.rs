//! Session builder API modules
//!
//! Provides the fluent API for assembling TLS session contexts with
//! type-checked trust configuration.

pub mod core;
pub mod identity;
pub mod trust;

pub use self::core::*;
