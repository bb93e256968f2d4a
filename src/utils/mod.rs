//! Shared helpers for markup handling and hashing.

pub mod hash;
pub mod html;
