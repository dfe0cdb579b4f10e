//! Utility modules

pub mod buffer;
pub mod resource;
pub mod time;
pub mod verification;
