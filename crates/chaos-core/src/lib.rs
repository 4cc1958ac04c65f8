//! # chaos-core
//!
//! Core crate for the C.H.A.O.S. realtime gateway. Contains the cache and
//! token-verification traits, configuration schemas, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other C.H.A.O.S. crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
