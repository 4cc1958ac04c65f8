//! # chaos-auth
//!
//! Bearer token handling for the realtime gateway.
//!
//! - `jwt`: claims, token creation (for the issuing REST layer and tests),
//!   validation, and blocklist management

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
