//! # chaos-cache
//!
//! Cache provider implementations backing the presence store. Supports two
//! modes:
//!
//! - **memory**: in-process cache using [moka](https://crates.io/crates/moka),
//!   suitable for a single-process deployment and for tests
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis)
//!   crate, shared by every gateway process
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
