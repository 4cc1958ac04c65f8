//! Core traits defined in `chaos-core` and implemented by other crates.

pub mod cache;
pub mod token;

pub use cache::CacheProvider;
pub use token::{TokenVerifier, VerifiedIdentity};
