//! Cryptographic primitives shared by session contexts
//!
//! - Randomness source selection for handshakes

pub mod random;

pub use random::platform_random;
pub(crate) use random::session_provider;
