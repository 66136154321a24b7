//! Wire format of the user's stored settings.
//!
//! Decoding is lenient and migrates every legacy shape the dashboard has ever
//! written. Encoding always produces the current shape.

pub mod condition;
pub mod error;
pub mod lenient;
pub mod options;
pub mod strategy;

pub use condition::*;
pub use error::*;
pub use options::*;
pub use strategy::*;
