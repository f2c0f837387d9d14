//! API Handlers

pub mod grants;
pub mod health;

pub use health::*;
