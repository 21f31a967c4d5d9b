//! Request extractors.
//!
//! - [`owner::Owner`] -- The session owner named by the `x-owner` header.

pub mod owner;
