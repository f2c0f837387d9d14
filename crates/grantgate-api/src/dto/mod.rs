//! Request and response bodies

pub mod grant;

pub use grant::*;
